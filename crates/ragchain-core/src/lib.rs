//! Ragchain Core — shared error type and document model.

pub mod document;
pub mod error;

pub use document::Document;
pub use error::{Error, Result};
