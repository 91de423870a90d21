//! Output formatting
//!
//! - `text`: console report for each iteration
//! - `json`: machine-readable session document

pub mod json;
pub mod text;
