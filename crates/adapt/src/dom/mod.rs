//! Browser environment the client application sees while rendering on the server.

pub mod env;
pub mod template;

pub use env::{install_browser_env, EnvConfig, Location, BROWSER_ENV_SRC};
pub use template::{HtmlTemplate, MountPoint, TemplateError};
