// crates/edge/src/state.rs

use crate::content::ContentStore;
use crate::proxy::Upstream;
use adapt::RenderClient;
use domain::{setting::Settings, SlugRegistry};
use std::sync::Arc;

/// Shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub slugs: Arc<SlugRegistry>,
    pub renderer: RenderClient,
    pub store: Arc<dyn ContentStore>,
    pub upstream: Upstream,
}

impl AppState {
    pub fn new(
        settings: Arc<Settings>,
        slugs: Arc<SlugRegistry>,
        renderer: RenderClient,
        store: Arc<dyn ContentStore>,
        upstream: Upstream,
    ) -> Self {
        Self {
            settings,
            slugs,
            renderer,
            store,
            upstream,
        }
    }

    /// CMS post type of a content category.
    pub fn post_type(&self, category: &str) -> Option<&str> {
        self.settings
            .category(category)
            .map(|c| c.post_type.as_str())
    }
}
