pub mod content;
pub mod lang;
pub mod setting;
pub mod slug;

pub use content::ContentRecord;
pub use lang::Language;
pub use slug::{normalize, RouteMatch, SlugError, SlugRegistry, SlugTable, SlugTableBuilder};
