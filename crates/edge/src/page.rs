// crates/edge/src/page.rs

use crate::content::ContentStore;
use crate::state::AppState;
use adapt::ssr::{PageRoute, RenderJob, RenderOutput, RenderRequest};
use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use domain::{ContentRecord, Language};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value as Json;
use tracing::{debug, error, warn};

/// Characters escaped in `Location`; non-ASCII is always escaped.
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// What to do with a page request.
#[derive(Debug)]
pub enum Resolution {
    /// Permanent redirect to the ideal URL of the same content.
    Redirect(String),
    Render(RenderJob),
}

/// Map a request path onto a render job, or onto its canonical URL.
#[tracing::instrument(skip(state))]
pub async fn resolve(state: &AppState, path: &str, query: Option<&str>) -> Resolution {
    let request = RenderRequest::new(path, query.map(str::to_string));

    let Some(route) = state.slugs.match_path(path) else {
        return Resolution::Render(RenderJob::page(request));
    };
    let Some(table) = state.slugs.get(&route.category) else {
        return Resolution::Render(RenderJob::page(request));
    };

    let requested = percent_decode_str(&route.raw_slug)
        .decode_utf8_lossy()
        .into_owned();
    let canonical = table.canonicalize(&requested);

    if table.is_canonical_redirect_needed(&requested, &canonical, route.language) {
        let target = table.href(route.language, &canonical);
        debug!(%requested, %canonical, %target, "redirecting to display slug");
        return Resolution::Redirect(match query {
            Some(q) if !q.is_empty() => format!("{target}?{q}"),
            _ => target,
        });
    }

    let content = match state.post_type(&route.category) {
        Some(post_type) => {
            fetch_content(state.store.as_ref(), post_type, &canonical, route.language).await
        }
        None => None,
    };

    Resolution::Render(RenderJob {
        request,
        not_found: content.is_none(),
        route: Some(PageRoute {
            category: route.category.clone(),
            alternates: table.alternates(&canonical),
            canonical_id: canonical,
        }),
        content,
    })
}

/// The record whose slug is `canonical` (or the first one returned), with
/// its featured image URL attached.
async fn fetch_content(
    store: &dyn ContentStore,
    post_type: &str,
    canonical: &str,
    language: Language,
) -> Option<ContentRecord> {
    let mut records = store.find_by_slug(post_type, canonical, language).await;
    if records.is_empty() {
        return None;
    }

    let index = records
        .iter()
        .position(|r| r.has_slug(canonical))
        .unwrap_or(0);
    let mut record = records.swap_remove(index);

    if let Some(id) = record.featured_media() {
        let url = store.media_url(id).await;
        if !url.is_empty() {
            record.insert("featured_media_url", Json::String(url));
        }
    }

    Some(record)
}

#[tracing::instrument(skip_all, fields(path = %uri.path()))]
pub async fn render_page(State(state): State<AppState>, uri: Uri) -> Response {
    match resolve(&state, uri.path(), uri.query()).await {
        Resolution::Redirect(location) => redirect(&location),
        Resolution::Render(job) => match state.renderer.render(job).await {
            Ok(output) => html_response(output),
            Err(e) => {
                error!(error = %e, "render failed");
                ssr_failure()
            }
        },
    }
}

fn redirect(location: &str) -> Response {
    let encoded = utf8_percent_encode(location, LOCATION).to_string();
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, encoded)]).into_response()
}

fn html_response(output: RenderOutput) -> Response {
    let mut response = (output.status, Html(output.html)).into_response();
    for (name, value) in output.headers {
        match (
            HeaderName::try_from(name.as_str()),
            HeaderValue::try_from(value.as_str()),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => warn!(header = %name, "dropping invalid header set by the application"),
        }
    }
    response
}

pub fn ssr_failure() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "SSR error").into_response()
}
