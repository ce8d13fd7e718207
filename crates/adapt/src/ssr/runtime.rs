// crates/adapt/src/ssr/runtime.rs

use super::context::{RenderJob, RenderOutput, RenderRequest};
use super::entry::EntryShape;
use super::error::SsrError;
use super::host;
use crate::dom::{install_browser_env, EnvConfig, HtmlTemplate, Location};
use crate::js::{BoaEngine, JsEngine};
use domain::SlugRegistry;
use http::StatusCode;
use serde_json::{json, Value as Json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

#[derive(Debug, Clone)]
pub struct RenderLimits {
    /// Passed to the engine's loop-iteration limit.
    pub loop_iteration_limit: u64,
    /// Deferred-callback drain rounds before a render counts as stalled.
    pub max_ticks: u32,
}

impl Default for RenderLimits {
    fn default() -> Self {
        Self {
            loop_iteration_limit: 50_000_000,
            max_ticks: 10_000,
        }
    }
}

/// Shared, read-only inputs of every render.
///
/// Nothing mutable lives here: each render builds its own engine, evaluates
/// the shims and the bundle into it, and drops it afterwards.
pub struct RenderRuntime {
    bundle_name: String,
    bundle: Arc<str>,
    template: Arc<HtmlTemplate>,
    template_path: String,
    site_origin: Url,
    slugs: Arc<SlugRegistry>,
    entry: EntryShape,
    limits: RenderLimits,
}

/// Files the runtime is built from.
#[derive(Debug, Clone)]
pub struct RuntimeSources {
    pub bundle: PathBuf,
    pub template: PathBuf,
    pub site_origin: String,
}

impl RenderRuntime {
    /// Read bundle and template from disk, then detect the entry point.
    #[tracing::instrument(skip_all, fields(bundle = %sources.bundle.display()))]
    pub fn load(
        sources: &RuntimeSources,
        slugs: Arc<SlugRegistry>,
        limits: RenderLimits,
    ) -> Result<Self, SsrError> {
        let bundle = read_bundle(&sources.bundle)?;
        let template = HtmlTemplate::load(&sources.template)?;
        Self::new(
            sources.bundle.display().to_string(),
            bundle,
            template,
            sources.template.display().to_string(),
            &sources.site_origin,
            slugs,
            limits,
        )
    }

    pub fn new(
        bundle_name: String,
        bundle: String,
        template: HtmlTemplate,
        template_path: String,
        site_origin: &str,
        slugs: Arc<SlugRegistry>,
        limits: RenderLimits,
    ) -> Result<Self, SsrError> {
        let site_origin =
            Url::parse(site_origin).map_err(|_| SsrError::Origin(site_origin.to_string()))?;

        let mut runtime = Self {
            bundle_name,
            bundle: Arc::from(bundle),
            template: Arc::new(template),
            template_path,
            site_origin,
            slugs,
            entry: EntryShape::Callable,
            limits,
        };

        let mut probe = runtime.prepare(&RenderRequest::new("/", None))?;
        runtime.entry = EntryShape::detect(&mut probe).ok_or(SsrError::NoEntryPoint)?;
        tracing::info!(entry = %runtime.entry, "server bundle loaded");

        Ok(runtime)
    }

    pub fn entry(&self) -> &EntryShape {
        &self.entry
    }

    pub fn slugs(&self) -> &Arc<SlugRegistry> {
        &self.slugs
    }

    /// Fresh engine with the browser environment and the bundle evaluated.
    fn prepare(&self, request: &RenderRequest) -> Result<BoaEngine, SsrError> {
        host::use_slugs(Arc::clone(&self.slugs));

        let mut engine = BoaEngine::with_loop_limit(self.limits.loop_iteration_limit);
        host::register(&mut engine)?;

        let location = Location::resolve(&self.site_origin, &request.url());
        let config = EnvConfig::new(&self.template, request.language.code(), location);
        install_browser_env(&mut engine, &config)?;

        engine.load_module(&self.bundle_name, &self.bundle)?;
        Ok(engine)
    }

    /// Render one page in an isolated engine.
    pub fn render(&self, job: &RenderJob) -> Result<RenderOutput, SsrError> {
        self.run(job, None)
    }

    /// Like [`RenderRuntime::render`], giving up with `Timeout` once `budget`
    /// has elapsed. The budget is checked between event-loop rounds; a
    /// single synchronous call is bounded only by the loop limit.
    pub fn render_within(
        &self,
        job: &RenderJob,
        budget: Duration,
    ) -> Result<RenderOutput, SsrError> {
        self.run(job, Some((Instant::now() + budget, budget)))
    }

    #[tracing::instrument(skip_all, fields(url = %job.request.url()))]
    fn run(
        &self,
        job: &RenderJob,
        deadline: Option<(Instant, Duration)>,
    ) -> Result<RenderOutput, SsrError> {
        let mut engine = self.prepare(&job.request)?;

        let ctx = job.to_js(
            self.template.source(),
            &self.template_path,
            self.site_origin.as_str().trim_end_matches('/'),
        );
        let call = self.entry.invocation();
        engine.call_function(
            "__ssr.start",
            &[
                ctx,
                json!(call.callee),
                json!(call.this),
                json!(call.with_bootstrap),
            ],
        )?;

        // Two consecutive rounds with nothing queued means nothing can
        // settle the render any more.
        let mut idle_rounds = 0;
        for _ in 0..self.limits.max_ticks {
            if let Some((at, budget)) = deadline {
                if Instant::now() >= at {
                    return Err(SsrError::Timeout(budget));
                }
            }
            engine.run_jobs()?;
            let poll = engine.call_function("__ssr.poll", &[])?;
            if poll["settled"] == Json::Bool(true) {
                return finish(&mut engine);
            }
            if poll["pending"].as_u64().unwrap_or(0) == 0 {
                idle_rounds += 1;
                if idle_rounds >= 2 {
                    return Err(SsrError::Stalled);
                }
            } else {
                idle_rounds = 0;
            }
        }

        Err(SsrError::Stalled)
    }
}

fn read_bundle(path: &Path) -> Result<String, SsrError> {
    std::fs::read_to_string(path).map_err(|source| SsrError::Bundle {
        path: path.display().to_string(),
        source,
    })
}

fn finish(engine: &mut BoaEngine) -> Result<RenderOutput, SsrError> {
    let outcome = engine.call_function("__ssr.outcome", &[])?;

    if outcome["ok"] != Json::Bool(true) {
        let reason = outcome["error"].as_str().unwrap_or("unknown error");
        return Err(SsrError::Rejected(reason.to_string()));
    }

    let html = match outcome["html"].as_str() {
        Some(html) => html.to_string(),
        None => {
            let kind = outcome["kind"].as_str().unwrap_or("undefined");
            return Err(SsrError::NotAString(kind.to_string()));
        }
    };

    let status = outcome["status"]
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);

    let headers = outcome["headers"]
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                .collect()
        })
        .unwrap_or_default();

    Ok(RenderOutput {
        html,
        status,
        headers,
    })
}
