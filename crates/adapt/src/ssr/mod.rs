//! Server-side rendering of the client application bundle.

pub mod actor;
pub mod context;
pub mod entry;
pub mod error;
pub mod host;
pub mod runtime;

pub use actor::RenderClient;
pub use context::{PageRoute, RenderJob, RenderOutput, RenderRequest};
pub use entry::{EntryShape, Invocation};
pub use error::SsrError;
pub use runtime::{RenderLimits, RenderRuntime, RuntimeSources};
