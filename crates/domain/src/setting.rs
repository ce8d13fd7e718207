use crate::lang::Language;
use crate::slug::{SlugError, SlugRegistry, SlugTable};
use serde::Deserialize;
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    path::PathBuf,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown language code {code:?} in category {category}")]
    UnknownLanguage { category: String, code: String },

    #[error("slug table error: {0}")]
    Slug(#[from] SlugError),
}

fn default_ip() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    4000
}

fn default_proxy_prefix() -> String {
    "/wp-json".to_string()
}

fn default_upstream_timeout_ms() -> u64 {
    8_000
}

fn default_render_timeout_ms() -> u64 {
    10_000
}

fn default_loop_iteration_limit() -> u64 {
    50_000_000
}

fn default_max_ticks() -> u32 {
    10_000
}

fn default_render_workers() -> usize {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// IP address the HTTP listener binds to
    #[serde(default = "default_ip")]
    pub ip: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            ip: default_ip(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteSettings {
    /// Public origin used for canonical URLs, e.g. `https://www.example.fr`
    pub origin: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSettings {
    /// Origin of the headless CMS, e.g. `https://cms.example.fr`
    pub origin: String,

    /// Request paths under this prefix are proxied to `origin` unchanged.
    #[serde(default = "default_proxy_prefix")]
    pub proxy_prefix: String,

    #[serde(default = "default_upstream_timeout_ms")]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SsrSettings {
    /// Server bundle of the client application (relative to the site dir).
    pub bundle: PathBuf,

    /// HTML shell of the built client application.
    pub template: PathBuf,

    /// Built browser assets served as static files.
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,

    #[serde(default = "default_render_timeout_ms")]
    pub render_timeout_ms: u64,

    /// Upper bound on JS loop iterations per render.
    #[serde(default = "default_loop_iteration_limit")]
    pub loop_iteration_limit: u64,

    /// Upper bound on deferred-callback drain rounds per render.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,

    /// Render threads; a worker stuck past the timeout is replaced.
    #[serde(default = "default_render_workers")]
    pub render_workers: usize,
}

/// One content category with its own slug tables.
#[derive(Debug, Clone, Deserialize)]
pub struct CategorySettings {
    pub name: String,

    /// CMS post type queried for this category (e.g. `posts`, `methods`).
    pub post_type: String,

    /// language code → listing base path
    #[serde(default)]
    pub base: HashMap<String, String>,

    /// legacy slug → canonical id
    #[serde(default)]
    pub aliases: HashMap<String, String>,

    /// language code → canonical id → display slug
    #[serde(default)]
    pub display: HashMap<String, HashMap<String, String>>,
}

impl CategorySettings {
    pub fn to_table(&self) -> Result<SlugTable, SettingsError> {
        let lang = |code: &str| {
            Language::from_code(code).ok_or_else(|| SettingsError::UnknownLanguage {
                category: self.name.clone(),
                code: code.to_string(),
            })
        };

        let mut builder = SlugTable::builder(&self.name);
        for (code, path) in &self.base {
            builder = builder.base(lang(code)?, path);
        }
        for (from, to) in &self.aliases {
            builder = builder.alias(from, to);
        }
        for (code, by_id) in &self.display {
            let language = lang(code)?;
            for (canonical, shown) in by_id {
                builder = builder.display(language, canonical, shown);
            }
        }
        Ok(builder.build()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub site: SiteSettings,
    pub upstream: UpstreamSettings,
    pub ssr: SsrSettings,
    #[serde(default)]
    pub categories: Vec<CategorySettings>,
}

impl Settings {
    #[tracing::instrument(skip_all)]
    pub fn slug_registry(&self) -> Result<SlugRegistry, SettingsError> {
        let mut registry = SlugRegistry::new();
        for category in &self.categories {
            registry.insert(category.to_table()?)?;
            tracing::debug!(
                category = %category.name,
                aliases = category.aliases.len(),
                "slug table built"
            );
        }
        Ok(registry)
    }

    pub fn category(&self, name: &str) -> Option<&CategorySettings> {
        self.categories.iter().find(|c| c.name == name)
    }
}
