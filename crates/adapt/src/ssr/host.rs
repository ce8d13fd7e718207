// crates/adapt/src/ssr/host.rs
//
// Rust functions exposed to the application while it renders.

use crate::js::{BoaEngine, JsError};
use boa_engine::context::Context;
use boa_engine::{JsResult, JsString, JsValue as BoaJsValue};
use domain::{normalize, Language, SlugRegistry};
use std::cell::RefCell;
use std::sync::Arc;

thread_local! {
    /// Slug tables visible to scripts running on this thread.
    static SLUGS: RefCell<Arc<SlugRegistry>> = RefCell::new(Arc::new(SlugRegistry::new()));
}

/// Make `registry` the one the `__slug*` functions read on this thread.
pub fn use_slugs(registry: Arc<SlugRegistry>) {
    SLUGS.with(|slot| *slot.borrow_mut() = registry);
}

pub fn register(engine: &mut BoaEngine) -> Result<(), JsError> {
    engine.register_host_fn("__hostLog", 2, host_log)?;
    engine.register_host_fn("__slugNormalize", 1, slug_normalize)?;
    engine.register_host_fn("__slugCanonicalize", 2, slug_canonicalize)?;
    engine.register_host_fn("__slugDisplay", 3, slug_display)?;
    engine.register_host_fn("__slugHref", 3, slug_href)?;
    Ok(())
}

fn arg(args: &[BoaJsValue], index: usize, ctx: &mut Context) -> JsResult<String> {
    Ok(args
        .get(index)
        .cloned()
        .unwrap_or_default()
        .to_string(ctx)?
        .to_std_string_escaped())
}

fn string(s: &str) -> BoaJsValue {
    BoaJsValue::from(JsString::from(s))
}

fn host_log(_this: &BoaJsValue, args: &[BoaJsValue], ctx: &mut Context) -> JsResult<BoaJsValue> {
    let level = arg(args, 0, ctx)?;
    let message = arg(args, 1, ctx)?;
    match level.as_str() {
        "error" => tracing::error!(target: "ssr::console", "{message}"),
        "warn" => tracing::warn!(target: "ssr::console", "{message}"),
        "debug" => tracing::debug!(target: "ssr::console", "{message}"),
        _ => tracing::info!(target: "ssr::console", "{message}"),
    }
    Ok(BoaJsValue::undefined())
}

fn slug_normalize(
    _this: &BoaJsValue,
    args: &[BoaJsValue],
    ctx: &mut Context,
) -> JsResult<BoaJsValue> {
    let raw = arg(args, 0, ctx)?;
    Ok(string(&normalize(&raw)))
}

fn slug_canonicalize(
    _this: &BoaJsValue,
    args: &[BoaJsValue],
    ctx: &mut Context,
) -> JsResult<BoaJsValue> {
    let category = arg(args, 0, ctx)?;
    let raw = arg(args, 1, ctx)?;
    let canonical = SLUGS.with(|slot| match slot.borrow().get(&category) {
        Some(table) => table.canonicalize(&raw),
        None => normalize(&raw),
    });
    Ok(string(&canonical))
}

fn slug_display(
    _this: &BoaJsValue,
    args: &[BoaJsValue],
    ctx: &mut Context,
) -> JsResult<BoaJsValue> {
    let category = arg(args, 0, ctx)?;
    let canonical = arg(args, 1, ctx)?;
    let language = Language::from_code(&arg(args, 2, ctx)?).unwrap_or(Language::PRIMARY);
    let display = SLUGS.with(|slot| match slot.borrow().get(&category) {
        Some(table) => table.to_display_slug(&canonical, language),
        None => canonical.clone(),
    });
    Ok(string(&display))
}

/// `null` for unknown categories: there is no base path to build on.
fn slug_href(_this: &BoaJsValue, args: &[BoaJsValue], ctx: &mut Context) -> JsResult<BoaJsValue> {
    let category = arg(args, 0, ctx)?;
    let language = Language::from_code(&arg(args, 1, ctx)?).unwrap_or(Language::PRIMARY);
    let raw = arg(args, 2, ctx)?;
    let href = SLUGS.with(|slot| {
        slot.borrow()
            .get(&category)
            .map(|table| table.href(language, &raw))
    });
    Ok(href.map_or_else(BoaJsValue::null, |h| string(&h)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::JsEngine;
    use domain::SlugTable;
    use serde_json::json;

    fn registry() -> Arc<SlugRegistry> {
        let table = SlugTable::builder("methods-asset")
            .base(Language::Fr, "/methodes")
            .base(Language::En, "/en/methods")
            .alias("credit-ball", "expertise-credit-bail")
            .display(Language::En, "expertise-credit-bail", "leasehold-financing")
            .build()
            .unwrap();
        let mut registry = SlugRegistry::new();
        registry.insert(table).unwrap();
        Arc::new(registry)
    }

    #[test]
    fn slug_functions_read_the_thread_registry() {
        use_slugs(registry());
        let mut engine = BoaEngine::new();
        register(&mut engine).unwrap();

        let v = engine
            .eval(
                r#"({
                    norm: __slugNormalize("  Crédit  Bail "),
                    canon: __slugCanonicalize("methods-asset", "Credit-Ball"),
                    fromDisplay: __slugCanonicalize("methods-asset", "leasehold-financing"),
                    display: __slugDisplay("methods-asset", "expertise-credit-bail", "en"),
                    href: __slugHref("methods-asset", "en", "credit-ball"),
                    frHref: __slugHref("methods-asset", "fr", "leasehold-financing"),
                    unknown: __slugHref("nope", "fr", "x")
                })"#,
            )
            .unwrap();

        assert_eq!(
            v,
            json!({
                "norm": "crédit-bail",
                "canon": "expertise-credit-bail",
                "fromDisplay": "expertise-credit-bail",
                "display": "leasehold-financing",
                "href": "/en/methods/leasehold-financing",
                "frHref": "/methodes/expertise-credit-bail",
                "unknown": null
            })
        );
    }

    #[test]
    fn unknown_category_canonicalizes_by_normalizing() {
        use_slugs(Arc::new(SlugRegistry::new()));
        let mut engine = BoaEngine::new();
        register(&mut engine).unwrap();

        assert_eq!(
            engine.eval("__slugCanonicalize('x', 'Hello World')").unwrap(),
            json!("hello-world")
        );
        assert_eq!(
            engine.eval("__slugDisplay('x', 'abc', 'en')").unwrap(),
            json!("abc")
        );
    }

    #[test]
    fn host_log_accepts_any_level() {
        let mut engine = BoaEngine::new();
        register(&mut engine).unwrap();
        engine
            .eval("__hostLog('warn', 'careful'); __hostLog('whatever', 1);")
            .expect("logging never throws");
    }
}
