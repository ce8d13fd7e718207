// crates/adapt/src/dom/env.rs

use super::template::{HtmlTemplate, MountPoint};
use crate::js::{JsEngine, JsError};
use serde::Serialize;
use url::Url;

/// Source of the browser shims and the render driver.
pub const BROWSER_ENV_SRC: &str = include_str!("browser_env.js");

pub const USER_AGENT: &str = concat!("vitrine-ssr/", env!("CARGO_PKG_VERSION"));

/// `window.location` as seen by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub href: String,
    pub origin: String,
    pub protocol: String,
    pub host: String,
    pub hostname: String,
    pub port: String,
    pub pathname: String,
    pub search: String,
    pub hash: String,
}

impl Location {
    /// `url` is a path plus optional query, resolved against `origin`.
    pub fn resolve(origin: &Url, url: &str) -> Self {
        let full = origin.join(url).unwrap_or_else(|_| origin.clone());
        let hostname = full.host_str().unwrap_or_default().to_string();
        let port = full.port().map(|p| p.to_string()).unwrap_or_default();
        let host = if port.is_empty() {
            hostname.clone()
        } else {
            format!("{hostname}:{port}")
        };

        Self {
            href: full.to_string(),
            origin: full.origin().ascii_serialization(),
            protocol: format!("{}:", full.scheme()),
            host,
            hostname,
            port,
            pathname: full.path().to_string(),
            search: full.query().map(|q| format!("?{q}")).unwrap_or_default(),
            hash: String::new(),
        }
    }
}

/// Per-request configuration handed to `__installBrowserEnv`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvConfig {
    pub title: String,
    pub lang: String,
    pub mount_points: Vec<MountPoint>,
    pub location: Location,
    pub user_agent: String,
}

impl EnvConfig {
    pub fn new(template: &HtmlTemplate, lang: &str, location: Location) -> Self {
        Self {
            title: template.title().to_string(),
            lang: lang.to_string(),
            mount_points: template.mount_points().to_vec(),
            location,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

/// Evaluate the shims and build the browser globals for one request.
#[tracing::instrument(skip_all, fields(path = %config.location.pathname))]
pub fn install_browser_env<E: JsEngine>(engine: &mut E, config: &EnvConfig) -> Result<(), JsError> {
    engine.load_module("browser_env.js", BROWSER_ENV_SRC)?;
    let config =
        serde_json::to_value(config).map_err(|e| JsError::Conversion(e.to_string()))?;
    engine.call_function("__installBrowserEnv", &[config])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::js::BoaEngine;
    use crate::ssr::host;
    use serde_json::json;

    fn origin() -> Url {
        Url::parse("https://www.example.fr").unwrap()
    }

    fn engine_with_env(url: &str) -> BoaEngine {
        let template = HtmlTemplate::parse(
            r#"<html lang="fr"><head><title>Accueil</title></head><body><div id="root"></div></body></html>"#,
        )
        .unwrap();
        let mut engine = BoaEngine::new();
        host::register(&mut engine).unwrap();
        let config = EnvConfig::new(&template, "en", Location::resolve(&origin(), url));
        install_browser_env(&mut engine, &config).expect("install");
        engine
    }

    #[test]
    fn location_splits_url_parts() {
        let loc = Location::resolve(&origin(), "/en/methods/leasehold-financing?tab=2");
        assert_eq!(loc.href, "https://www.example.fr/en/methods/leasehold-financing?tab=2");
        assert_eq!(loc.origin, "https://www.example.fr");
        assert_eq!(loc.protocol, "https:");
        assert_eq!(loc.host, "www.example.fr");
        assert_eq!(loc.port, "");
        assert_eq!(loc.pathname, "/en/methods/leasehold-financing");
        assert_eq!(loc.search, "?tab=2");
    }

    #[test]
    fn location_keeps_explicit_port() {
        let base = Url::parse("http://localhost:4000").unwrap();
        let loc = Location::resolve(&base, "/");
        assert_eq!(loc.host, "localhost:4000");
        assert_eq!(loc.hostname, "localhost");
        assert_eq!(loc.port, "4000");
    }

    #[test]
    fn document_and_window_reflect_request() {
        let mut engine = engine_with_env("/en/contact?x=1");
        let v = engine
            .eval(
                r#"({
                    title: document.title,
                    lang: document.documentElement.getAttribute("lang"),
                    root: document.getElementById("root") !== null,
                    path: window.location.pathname,
                    search: location.search,
                    ua: navigator.userAgent,
                    win: window === globalThis
                })"#,
            )
            .unwrap();

        assert_eq!(v["title"], "Accueil");
        assert_eq!(v["lang"], "en");
        assert_eq!(v["root"], true);
        assert_eq!(v["path"], "/en/contact");
        assert_eq!(v["search"], "?x=1");
        assert_eq!(v["ua"], USER_AGENT);
        assert_eq!(v["win"], true);
    }

    #[test]
    fn meta_and_link_tags_are_found_by_attribute() {
        let mut engine = engine_with_env("/");
        let v = engine
            .eval(
                r#"
                var meta = document.createElement("meta");
                meta.setAttribute("name", "description");
                meta.setAttribute("content", "Cabinet");
                document.head.appendChild(meta);
                var link = document.createElement("link");
                link.setAttribute("rel", "canonical");
                link.classList.add("seo");
                document.head.appendChild(link);
                ({
                    quoted: document.querySelector('meta[name="description"]') === meta,
                    bare: document.querySelector("meta[name=description]") === meta,
                    presence: document.querySelectorAll("head [content]").length,
                    content: document.head.querySelector("meta[name='description']").getAttribute("content"),
                    missing: document.querySelector('meta[property="og:title"]'),
                    list: document.querySelectorAll("meta[name=description], link[rel=canonical]").length,
                    byClass: document.getElementsByClassName("seo")[0] === link,
                    matches: link.matches("link.seo[rel=canonical]"),
                    closest: meta.closest("head") === document.head
                })
                "#,
            )
            .unwrap();

        assert_eq!(v["quoted"], true);
        assert_eq!(v["bare"], true);
        // Descendant combinators are not supported.
        assert_eq!(v["presence"], 0);
        assert_eq!(v["content"], "Cabinet");
        assert_eq!(v["missing"], serde_json::Value::Null);
        assert_eq!(v["list"], 2);
        assert_eq!(v["byClass"], true);
        assert_eq!(v["matches"], true);
        assert_eq!(v["closest"], true);
    }

    #[test]
    fn style_set_property_accepts_null() {
        let mut engine = engine_with_env("/");
        let v = engine
            .eval(
                r#"
                var el = document.createElement("div");
                el.style.setProperty("color", "red");
                var before = el.style.getPropertyValue("color");
                el.style.setProperty("color", null);
                el.style.backgroundColor = "blue";
                var bg = el.style.getPropertyValue("background-color");
                el.style.backgroundColor = undefined;
                ({ before: before, after: el.style.getPropertyValue("color"), bg: bg, cleared: el.style.backgroundColor })
                "#,
            )
            .unwrap();

        assert_eq!(v, json!({ "before": "red", "after": "", "bg": "blue", "cleared": "" }));
    }

    #[test]
    fn storage_is_a_working_in_memory_store() {
        let mut engine = engine_with_env("/");
        let v = engine
            .eval(
                r#"
                localStorage.setItem("k", 1);
                sessionStorage.setItem("s", "v");
                ({ k: localStorage.getItem("k"), missing: localStorage.getItem("nope"), len: localStorage.length, split: localStorage.getItem("s") })
                "#,
            )
            .unwrap();

        assert_eq!(v, json!({ "k": "1", "missing": null, "len": 1, "split": null }));
    }

    #[test]
    fn browser_apis_exist_and_are_inert() {
        let mut engine = engine_with_env("/");
        let v = engine
            .eval(
                r#"
                var io = new IntersectionObserver(function () {}, { threshold: 0.5 });
                io.observe(document.body);
                history.pushState({}, "", "/x");
                ({
                    media: matchMedia("(min-width: 800px)").matches,
                    computed: getComputedStyle(document.body).getPropertyValue("display"),
                    records: io.takeRecords().length,
                    path: location.pathname
                })
                "#,
            )
            .unwrap();

        assert_eq!(v, json!({ "media": false, "computed": "", "records": 0, "path": "/" }));
    }

    #[test]
    fn image_onload_fires_on_drain_and_onerror_never_does() {
        let mut engine = engine_with_env("/");
        engine
            .eval(
                r#"
                globalThis.events = [];
                var img = new Image();
                img.onload = function () { events.push("load"); };
                img.onerror = function () { events.push("error"); };
                img.src = "/missing.png";
                "#,
            )
            .unwrap();

        assert_eq!(engine.eval("events.length").unwrap(), json!(0));
        engine.call_function("__ssr.poll", &[]).unwrap();
        assert_eq!(engine.eval("events").unwrap(), json!(["load"]));
    }

    #[test]
    fn timers_run_in_order_and_can_be_cleared() {
        let mut engine = engine_with_env("/");
        engine
            .eval(
                r#"
                globalThis.seen = [];
                setTimeout(function (x) { seen.push(x); }, 50, "a");
                var id = setTimeout(function () { seen.push("cleared"); });
                requestAnimationFrame(function () { seen.push("raf"); });
                clearTimeout(id);
                "#,
            )
            .unwrap();

        let poll = engine.call_function("__ssr.poll", &[]).unwrap();
        assert_eq!(poll["pending"], json!(2));
        assert_eq!(engine.eval("seen").unwrap(), json!(["a", "raf"]));

        let poll = engine.call_function("__ssr.poll", &[]).unwrap();
        assert_eq!(poll["pending"], json!(0));
    }

    #[test]
    fn existing_history_methods_are_kept() {
        let template = HtmlTemplate::parse("<html></html>").unwrap();
        let mut engine = BoaEngine::new();
        host::register(&mut engine).unwrap();
        engine
            .load_module(
                "app-history",
                "globalThis.history = { pushState: function () { return 'own'; } };",
            )
            .unwrap();
        let config = EnvConfig::new(&template, "fr", Location::resolve(&origin(), "/"));
        install_browser_env(&mut engine, &config).unwrap();

        assert_eq!(engine.eval("history.pushState()").unwrap(), json!("own"));
        assert_eq!(engine.eval("typeof history.replaceState").unwrap(), json!("function"));
    }

    #[test]
    fn module_exports_object_is_fresh() {
        let mut engine = engine_with_env("/");
        let v = engine
            .eval("module.exports === exports && Object.keys(module.exports).length === 0")
            .unwrap();
        assert_eq!(v, json!(true));
    }
}
