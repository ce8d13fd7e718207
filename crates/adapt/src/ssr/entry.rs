// crates/adapt/src/ssr/entry.rs

use crate::js::JsEngine;

/// Export names tried, in order. The flag marks entry points that expect the
/// application's bootstrap value as their first argument.
const RENDER_EXPORTS: [(&str, bool); 4] = [
    ("renderApplication", true),
    ("renderModule", true),
    ("render", false),
    ("default", false),
];

/// Objects whose `render` method is used when no function is exported.
const MODULE_OBJECTS: [&str; 2] = ["module.exports.default", "module.exports.app"];

/// How the server bundle exposes its render function.
///
/// Detected once after the bundle is first evaluated; every render calls
/// through the same shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryShape {
    /// `module.exports = function (ctx) { ... }`
    Callable,

    /// A named function reachable from the global object.
    RenderFunction { path: String, with_bootstrap: bool },

    /// An object with a `render(ctx)` method.
    ModuleObject { path: String },
}

/// Where to call and what `this` to bind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub callee: String,
    pub this: Option<String>,
    pub with_bootstrap: bool,
}

impl EntryShape {
    /// Inspect an engine that has the bundle loaded.
    pub fn detect<E: JsEngine>(engine: &mut E) -> Option<Self> {
        if engine.is_callable("module.exports") {
            return Some(EntryShape::Callable);
        }

        for (name, with_bootstrap) in RENDER_EXPORTS {
            let path = format!("module.exports.{name}");
            if engine.is_callable(&path) {
                return Some(EntryShape::RenderFunction { path, with_bootstrap });
            }
        }

        for (name, with_bootstrap) in RENDER_EXPORTS {
            if engine.is_callable(name) {
                return Some(EntryShape::RenderFunction {
                    path: name.to_string(),
                    with_bootstrap,
                });
            }
        }

        MODULE_OBJECTS
            .iter()
            .find(|obj| engine.is_callable(&format!("{obj}.render")))
            .map(|obj| EntryShape::ModuleObject {
                path: obj.to_string(),
            })
    }

    pub fn invocation(&self) -> Invocation {
        match self {
            EntryShape::Callable => Invocation {
                callee: "module.exports".into(),
                this: None,
                with_bootstrap: false,
            },
            EntryShape::RenderFunction {
                path,
                with_bootstrap,
            } => Invocation {
                callee: path.clone(),
                this: path.rsplit_once('.').map(|(holder, _)| holder.to_string()),
                with_bootstrap: *with_bootstrap,
            },
            EntryShape::ModuleObject { path } => Invocation {
                callee: format!("{path}.render"),
                this: Some(path.clone()),
                with_bootstrap: false,
            },
        }
    }
}

impl std::fmt::Display for EntryShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntryShape::Callable => f.write_str("module.exports()"),
            EntryShape::RenderFunction { path, .. } => write!(f, "{path}()"),
            EntryShape::ModuleObject { path } => write!(f, "{path}.render()"),
        }
    }
}
