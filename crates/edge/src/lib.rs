pub mod cli;
pub mod content;
pub mod page;
pub mod proxy;
pub mod router;
pub mod state;

mod error;

pub use error::EdgeError;
pub use router::build_app_router;
pub use state::AppState;
