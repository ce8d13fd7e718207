//! Runs the client application's server bundle inside an embedded JS engine.
//!
//! - [`js`]: engine abstraction and the Boa implementation.
//! - [`dom`]: the browser environment scripts see (document, window, storage...).
//! - [`ssr`]: entry-point detection, per-request render runtime, render worker pool.

pub mod dom;
pub mod js;
pub mod ssr;

pub use ssr::{RenderClient, RenderJob, RenderOutput, RenderRequest, RenderRuntime, SsrError};
