pub mod engine;
pub mod error;

pub use engine::{BoaEngine, HostFn, JsEngine};
pub use error::JsError;
