//! Item extraction strategies
//!
//! Each strategy turns a parsed source document into raw item records.
//! Malformed items are logged and dropped; only a document that does not
//! have the declared shape fails the whole call.

mod css_extractor;
mod json_extractor;

pub use css_extractor::*;
pub use json_extractor::*;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::document::Document;
use crate::error::Result;
use crate::rules::ItemSource;
use crate::timezone::TimeContext;

/// One source-native item before normalization
#[derive(Debug, Clone, PartialEq)]
pub struct RawItemRecord {
    pub id: String,
    pub uri: String,
    pub title: String,
    pub content: Option<String>,
    pub timestamp: Option<DateTime<Tz>>,
    pub author: Option<String>,
    pub categories: Vec<String>,
    /// Image or enclosure URLs as found in the document
    pub enclosures: Vec<String>,
}

/// Per-pass context handed to extractors
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    /// URL the document was fetched from
    pub url: &'a str,
    pub time: &'a TimeContext,
}

pub trait ItemExtractor: Send + Sync {
    /// Extract all well-formed items in document order.
    fn extract_items(&self, document: &Document, ctx: &ExtractContext<'_>) -> Result<Vec<RawItemRecord>>;
}

/// Build the extractor declared by a rule set's item source.
pub fn extractor_for(source: &ItemSource) -> Result<Box<dyn ItemExtractor>> {
    Ok(match source {
        ItemSource::Json(rules) => Box::new(JsonExtractor::new(rules.clone())),
        ItemSource::Html(rules) => Box::new(CssExtractor::new(rules)?),
    })
}

/// Collapse runs of whitespace into single spaces and trim.
pub(crate) fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
