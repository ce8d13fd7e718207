// crates/edge/src/router.rs

use crate::page::render_page;
use crate::proxy::proxy;
use crate::state::AppState;
use axum::{
    handler::Handler,
    routing::{any, get},
    Router,
};
use std::path::PathBuf;
use tower_http::{services::ServeDir, trace::TraceLayer};

async fn health() -> &'static str {
    "ok"
}

/// Build the application router.
///
/// Precedence: health checks, then the CMS API prefix, then files of the
/// browser build, then server-rendered pages.
#[tracing::instrument(skip_all)]
pub fn build_app_router(state: AppState, assets_dir: Option<PathBuf>) -> Router {
    let prefix = state
        .settings
        .upstream
        .proxy_prefix
        .trim_end_matches('/')
        .to_string();

    let mut router = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/healthz/{*rest}", get(health));

    if !prefix.is_empty() {
        router = router
            .route(&prefix, any(proxy))
            .route(&format!("{prefix}/{{*rest}}"), any(proxy));
    }

    let router = match assets_dir {
        Some(dir) => {
            let pages = render_page.with_state(state.clone());
            let assets = ServeDir::new(dir)
                .append_index_html_on_directories(false)
                .call_fallback_on_method_not_allowed(true)
                .fallback(pages);
            router.fallback_service(assets)
        }
        None => router.fallback(render_page),
    };

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
