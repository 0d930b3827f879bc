//! Text primitives: Arabic normalization, tokenization and fuzzy matching.
pub mod fuzzy;
pub mod keywords;
pub mod normalize;

pub use fuzzy::similarity;
pub use keywords::{content_tokens, extract_keywords, query_tokens};
pub use normalize::normalize;
