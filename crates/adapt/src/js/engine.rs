use super::error::JsError;
use boa_engine::context::Context;
use boa_engine::property::PropertyKey;
use boa_engine::JsValue as BoaJsValue;
use boa_engine::{js_string, JsResult, NativeFunction, Source};
use serde_json::Value as Json;

/// Signature of a Rust function exposed to scripts as a global.
pub type HostFn = fn(&BoaJsValue, &[BoaJsValue], &mut Context) -> JsResult<BoaJsValue>;

/// Engine abstraction.
///
/// Values cross the boundary as `serde_json::Value`; functions and other
/// engine objects never leave the engine.
pub trait JsEngine {
    /// Evaluate arbitrary JS code and return its JSON-compatible result.
    ///
    /// The completion value must convert to JSON: a script that ran but
    /// ends on a function or a cyclic object still yields
    /// `JsError::Conversion`. End such scripts with `undefined;` or use
    /// [`JsEngine::load_module`].
    fn eval(&mut self, code: &str) -> Result<Json, JsError>;

    /// Evaluate a script into the global scope. `name` is used in errors.
    fn load_module(&mut self, name: &str, source: &str) -> Result<(), JsError>;

    /// Call a JS function by a dotted path (e.g. "module.exports.render").
    ///
    /// `this` is the object holding the function, or the global object for
    /// top-level functions.
    fn call_function(&mut self, func_path: &str, args: &[Json]) -> Result<Json, JsError>;

    /// Whether the dotted path resolves to a callable value.
    fn is_callable(&mut self, path: &str) -> bool;

    /// Drain the promise job queue.
    ///
    /// Fails when a job hits an engine limit.
    fn run_jobs(&mut self) -> Result<(), JsError>;
}

/// Concrete Boa-backed engine.
///
/// One `Context` per engine. Contexts are not `Send`, so an engine stays on
/// the thread that created it.
pub struct BoaEngine {
    context: Context,
}

impl Default for BoaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl BoaEngine {
    pub fn new() -> Self {
        Self {
            context: Context::default(),
        }
    }

    /// Engine whose loops throw once they exceed `limit` iterations.
    pub fn with_loop_limit(limit: u64) -> Self {
        let mut engine = Self::new();
        engine
            .context
            .runtime_limits_mut()
            .set_loop_iteration_limit(limit);
        engine
    }

    /// Expose a Rust function as a global callable.
    pub fn register_host_fn(
        &mut self,
        name: &str,
        length: usize,
        func: HostFn,
    ) -> Result<(), JsError> {
        self.context
            .register_global_builtin_callable(
                js_string!(name),
                length,
                NativeFunction::from_fn_ptr(func),
            )
            .map_err(|e| JsError::Host(format!("{name}: {e}")))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // serde_json <-> Boa conversions
    // ─────────────────────────────────────────────────────────────────────────

    fn to_boajs_value(&mut self, value: &Json) -> Result<BoaJsValue, JsError> {
        BoaJsValue::from_json(value, &mut self.context)
            .map_err(|e| JsError::Conversion(e.to_string()))
    }

    fn from_boajs_value(&mut self, value: &BoaJsValue) -> Result<Json, JsError> {
        let json = value
            .to_json(&mut self.context)
            .map_err(|e| JsError::Conversion(e.to_string()))?;
        Ok(json.unwrap_or(Json::Null))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function resolution
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve a dotted path against the global object.
    ///
    /// Returns the value and the object it was read from.
    fn resolve_path(&mut self, path: &str) -> Result<(BoaJsValue, BoaJsValue), JsError> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return Err(JsError::Call("empty function path".into()));
        }

        let global = BoaJsValue::new(self.context.global_object().clone());
        let mut holder = global.clone();
        let mut current = global;

        for part in trimmed.split('.') {
            let obj = current
                .as_object()
                .ok_or_else(|| {
                    JsError::Call(format!("{trimmed}: intermediate value is not object"))
                })?
                .clone();

            let key = PropertyKey::from(js_string!(part));
            holder = current.clone();
            current = obj
                .get(key, &mut self.context)
                .map_err(|e| JsError::Call(e.to_string()))?;
        }

        Ok((current, holder))
    }
}

impl JsEngine for BoaEngine {
    fn eval(&mut self, code: &str) -> Result<Json, JsError> {
        match self.context.eval(Source::from_bytes(code)) {
            Ok(v) => self.from_boajs_value(&v),
            Err(e) => Err(JsError::Eval(e.to_string())),
        }
    }

    fn load_module(&mut self, name: &str, source: &str) -> Result<(), JsError> {
        self.context
            .eval(Source::from_bytes(source))
            .map_err(|e| JsError::Eval(format!("{name}: {e}")))?;
        Ok(())
    }

    fn call_function(&mut self, func_path: &str, args: &[Json]) -> Result<Json, JsError> {
        let (func_val, this) = self.resolve_path(func_path)?;
        let func_obj = func_val
            .as_object()
            .ok_or_else(|| JsError::Call(format!("{func_path}: function value is not object")))?
            .clone();

        let mut js_args = Vec::with_capacity(args.len());
        for a in args {
            js_args.push(self.to_boajs_value(a)?);
        }

        match func_obj.call(&this, &js_args, &mut self.context) {
            Ok(v) => self.from_boajs_value(&v),
            Err(e) => Err(JsError::Call(e.to_string())),
        }
    }

    fn is_callable(&mut self, path: &str) -> bool {
        matches!(self.resolve_path(path), Ok((value, _)) if value.is_callable())
    }

    fn run_jobs(&mut self) -> Result<(), JsError> {
        self.context
            .run_jobs()
            .map_err(|e| JsError::Call(format!("job queue: {e}")))
    }
}
