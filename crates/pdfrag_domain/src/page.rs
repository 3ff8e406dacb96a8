use derive_setters::Setters;
use serde::{Deserialize, Serialize};

/// A single physical page of extracted document text.
///
/// Produced by a [`crate::PageLoader`]; page numbers are 0-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[setters(into)]
pub struct RawPage {
    pub source_path: String,
    pub page_number: usize,
    pub text: String,
}

impl RawPage {
    pub fn new(source_path: impl Into<String>, page_number: usize, text: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            page_number,
            text: text.into(),
        }
    }
}
