// crates/edge/src/proxy.rs

use crate::error::EdgeError;
use crate::state::AppState;
use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

/// Request bodies above this size are refused.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Response headers relayed from the CMS (pagination of list endpoints).
const RELAYED_HEADERS: [&str; 2] = ["x-wp-total", "x-wp-totalpages"];

/// Request headers never forwarded upstream.
///
/// `accept-encoding` stays behind because the body is parsed here before it
/// is relayed; the client negotiates its own encoding with this server.
const HOP_HEADERS: [&str; 5] = [
    "host",
    "connection",
    "content-length",
    "transfer-encoding",
    "accept-encoding",
];

/// Forwards the CMS API prefix to the upstream origin.
#[derive(Clone)]
pub struct Upstream {
    client: Client,
    origin: String,
}

impl Upstream {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, EdgeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    /// Forward `req` and return the upstream's JSON body verbatim.
    ///
    /// Any transport failure, non-2xx status or non-JSON body is an error.
    pub async fn forward(&self, req: Request<Body>) -> Result<Response, EdgeError> {
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| req.uri().path())
            .to_string();
        let url = format!("{}{}", self.origin, path_and_query);

        let method = reqwest::Method::from_bytes(req.method().as_str().as_bytes())
            .map_err(|e| EdgeError::Upstream(format!("unsupported method: {e}")))?;

        let mut builder = self.client.request(method, &url);
        for (key, value) in req.headers() {
            if !HOP_HEADERS.contains(&key.as_str()) {
                builder = builder.header(key.as_str(), value.as_bytes());
            }
        }

        let body = to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| EdgeError::Upstream(format!("unreadable request body: {e}")))?;
        if !body.is_empty() {
            builder = builder.body(body);
        }

        let upstream = builder.send().await?;
        let status = upstream.status();
        if !status.is_success() {
            return Err(EdgeError::Upstream(format!("{url} answered {status}")));
        }

        let relayed: Vec<(String, Vec<u8>)> = RELAYED_HEADERS
            .iter()
            .filter_map(|name| {
                upstream
                    .headers()
                    .get(*name)
                    .map(|v| (name.to_string(), v.as_bytes().to_vec()))
            })
            .collect();

        let bytes: Bytes = upstream.bytes().await?;
        serde_json::from_slice::<serde_json::Value>(&bytes)
            .map_err(|e| EdgeError::Upstream(format!("{url} returned malformed JSON: {e}")))?;

        debug!(%url, %status, len = bytes.len(), "proxied");

        let mut response = Response::builder()
            .status(StatusCode::from_u16(status.as_u16()).unwrap_or(StatusCode::OK))
            .header(header::CONTENT_TYPE, "application/json");
        for (name, value) in relayed {
            if let Ok(value) = HeaderValue::from_bytes(&value) {
                response = response.header(name, value);
            }
        }
        response
            .body(Body::from(bytes))
            .map_err(|e| EdgeError::Upstream(e.to_string()))
    }
}

/// Generic envelope returned whenever the upstream cannot be relayed.
pub fn upstream_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        axum::Json(json!({ "error": "Content API request failed" })),
    )
        .into_response()
}

#[tracing::instrument(skip_all, fields(path = %req.uri().path()))]
pub async fn proxy(State(state): State<AppState>, req: Request<Body>) -> Response {
    match state.upstream.forward(req).await {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "proxy request failed");
            upstream_failure()
        }
    }
}
