// crates/edge/src/content.rs

use crate::error::EdgeError;
use async_trait::async_trait;
use domain::{ContentRecord, Language};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as Json;
use std::time::Duration;
use tracing::{debug, warn};

/// Keyed lookups against the headless CMS.
///
/// Lookups never fail from the caller's point of view: errors are logged and
/// come back as "nothing found", so a CMS outage degrades pages instead of
/// breaking them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Items of `post_type` whose slug is `slug`, in `language`.
    async fn find_by_slug(&self, post_type: &str, slug: &str, language: Language)
        -> Vec<ContentRecord>;

    /// Public URL of a media item; empty when unknown.
    async fn media_url(&self, id: u64) -> String;
}

/// WordPress REST API (`/wp-json/wp/v2`).
pub struct WordPressStore {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Media {
    #[serde(default)]
    source_url: String,
}

impl WordPressStore {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, EdgeError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, origin))
    }

    pub fn with_client(client: Client, origin: &str) -> Self {
        Self {
            client,
            base_url: format!("{}/wp-json/wp/v2", origin.trim_end_matches('/')),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Json, EdgeError> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(EdgeError::Upstream(format!("{url} answered {status}")));
        }
        Ok(response.json::<Json>().await?)
    }
}

#[async_trait]
impl ContentStore for WordPressStore {
    #[tracing::instrument(skip(self))]
    async fn find_by_slug(
        &self,
        post_type: &str,
        slug: &str,
        language: Language,
    ) -> Vec<ContentRecord> {
        let url = self.url(&format!("/{post_type}"));
        let query = [("slug", slug), ("lang", language.code())];

        match self.get_json(&url, &query).await {
            Ok(Json::Array(items)) => {
                debug!(count = items.len(), "content fetched");
                items.into_iter().map(ContentRecord::from).collect()
            }
            Ok(other) => {
                warn!(kind = %json_kind(&other), "content list is not an array");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "content fetch failed");
                Vec::new()
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn media_url(&self, id: u64) -> String {
        let url = self.url(&format!("/media/{id}"));
        match self.get_json(&url, &[]).await {
            Ok(json) => serde_json::from_value::<Media>(json)
                .map(|m| m.source_url)
                .unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "media fetch failed");
                String::new()
            }
        }
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}
