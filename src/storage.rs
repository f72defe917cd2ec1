/// Markdown projection of sections.
pub mod markdown;
mod store;

pub use markdown::{MarkdownFile, Projection};
pub use store::{BACKUP_FILE, MemoryBank, STATE_FILE, StoreError};
