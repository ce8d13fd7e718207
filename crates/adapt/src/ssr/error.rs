use crate::dom::TemplateError;
use crate::js::JsError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SsrError {
    #[error("JS engine error: {0}")]
    Js(#[from] JsError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("failed to read server bundle {path}: {source}")]
    Bundle {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid site origin {0:?}")]
    Origin(String),

    #[error("server bundle exposes no render entry point")]
    NoEntryPoint,

    #[error("render returned {0} instead of an HTML string")]
    NotAString(String),

    #[error("render rejected: {0}")]
    Rejected(String),

    #[error("render never settled")]
    Stalled,

    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    #[error("render panicked: {0}")]
    Panicked(String),

    #[error("render workers unavailable: {0}")]
    Channel(String),
}
