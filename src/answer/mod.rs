pub mod composer;
pub mod file;
pub mod memory;

pub use composer::{Answer, AnswerOrigin, Composer, compose};
pub use file::{FileContext, parse_embedded_file};
