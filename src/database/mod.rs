// Per-document vector storage plus the JSON catalog and chat-history logs

pub mod catalog;
pub mod index;
pub mod store;

pub use catalog::{ChatHistory, ChatLogEntry, DocumentCatalog, JsonLog};
pub use index::FlatIndex;
pub use store::{DocumentMetadata, DocumentStore, FileType, SearchOutcome};
