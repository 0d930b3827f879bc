pub mod core;
pub mod language;
pub mod segmenter;

pub use self::core::{IndexError, Indexer, SyncResult};
