use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One item returned by the headless CMS (post, page, asset description).
///
/// The payload is kept as-is; only the few fields the host needs are read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentRecord(Json);

impl ContentRecord {
    pub fn new(value: Json) -> Self {
        Self(value)
    }

    pub fn slug(&self) -> Option<&str> {
        self.0.get("slug").and_then(Json::as_str)
    }

    /// `title.rendered` (WordPress shape) or a plain `title` string.
    pub fn title(&self) -> Option<&str> {
        match self.0.get("title") {
            Some(Json::String(s)) => Some(s.as_str()),
            Some(obj) => obj.get("rendered").and_then(Json::as_str),
            None => None,
        }
    }

    pub fn featured_media(&self) -> Option<u64> {
        self.0
            .get("featured_media")
            .and_then(Json::as_u64)
            .filter(|id| *id > 0)
    }

    pub fn has_slug(&self, canonical: &str) -> bool {
        self.slug() == Some(canonical)
    }

    /// Attach a resolved field (e.g. the featured image URL).
    pub fn insert(&mut self, key: &str, value: Json) {
        if let Json::Object(map) = &mut self.0 {
            map.insert(key.to_string(), value);
        }
    }

    pub fn as_json(&self) -> &Json {
        &self.0
    }

    pub fn into_json(self) -> Json {
        self.0
    }
}

impl From<Json> for ContentRecord {
    fn from(value: Json) -> Self {
        Self(value)
    }
}
