// crates/adapt/src/dom/template.rs

use lol_html::{element, html_content::Element, text, HtmlRewriter, Settings};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse template: {0}")]
    Parse(String),
}

/// Element carrying an `id` in the application's HTML shell.
///
/// Mount points (`<app-root id="root">`, `<div id="app">`) are looked up by
/// client code with `getElementById`, so they are rebuilt in the shim document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountPoint {
    pub tag: String,
    pub id: String,
}

/// The HTML shell of the built client application.
///
/// Read once at startup. Only the pieces the browser environment exposes
/// are extracted; the full source is kept for the application to use.
#[derive(Debug, Clone)]
pub struct HtmlTemplate {
    source: String,
    title: String,
    lang: Option<String>,
    mount_points: Vec<MountPoint>,
}

impl HtmlTemplate {
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(source)
    }

    pub fn parse(source: impl Into<String>) -> Result<Self, TemplateError> {
        let source = source.into();

        let mut title = String::new();
        let mut lang = None;
        let mut mount_points = Vec::new();

        {
            let settings = Settings {
                element_content_handlers: vec![
                    element!("html", |el: &mut Element| {
                        lang = el.get_attribute("lang");
                        Ok(())
                    }),
                    element!("[id]", |el: &mut Element| {
                        if let Some(id) = el.get_attribute("id") {
                            mount_points.push(MountPoint {
                                tag: el.tag_name(),
                                id,
                            });
                        }
                        Ok(())
                    }),
                    text!("title", |t| {
                        title.push_str(t.as_str());
                        Ok(())
                    }),
                ],
                ..Settings::default()
            };

            let mut rewriter = HtmlRewriter::new(settings, |_: &[u8]| {});
            rewriter
                .write(source.as_bytes())
                .map_err(|e| TemplateError::Parse(e.to_string()))?;
            rewriter
                .end()
                .map_err(|e| TemplateError::Parse(e.to_string()))?;
        }

        let title = html_escape::decode_html_entities(title.trim()).into_owned();

        Ok(Self {
            source,
            title,
            lang,
            mount_points,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn lang(&self) -> Option<&str> {
        self.lang.as_deref()
    }

    pub fn mount_points(&self) -> &[MountPoint] {
        &self.mount_points
    }
}
