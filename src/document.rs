//! Parsed source documents

use scraper::Html;
use serde_json::Value;

use crate::error::{BridgeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Json,
    Html,
}

#[derive(Debug)]
pub enum Document {
    Json(Value),
    Html(Html),
}

impl Document {
    /// Parse a fetched body as the declared kind.
    ///
    /// `url` is only used for error reporting.
    pub fn parse(kind: DocumentKind, url: &str, body: &str) -> Result<Self> {
        match kind {
            DocumentKind::Json => serde_json::from_str(body)
                .map(Document::Json)
                .map_err(|e| BridgeError::invalid_document(url, e)),
            DocumentKind::Html => Ok(Document::Html(Html::parse_document(body))),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        match self {
            Document::Json(_) => DocumentKind::Json,
            Document::Html(_) => DocumentKind::Html,
        }
    }
}

/// Navigate a JSON value using dot notation with optional indices.
///
/// `images.aspect16x9.src` and `_mediaArray[0]._mediaStreamArray` are both
/// valid. An empty path returns the value itself.
pub fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }

    let mut current = value;
    for segment in path.split('.') {
        // Handle array index notation: field[0]
        if let Some(bracket_pos) = segment.find('[') {
            let field = &segment[..bracket_pos];
            if !field.is_empty() {
                current = current.get(field)?;
            }
            let index_end = segment.find(']')?;
            let index: usize = segment[bracket_pos + 1..index_end].parse().ok()?;
            current = current.get(index)?;
        } else {
            current = current.get(segment)?;
        }
    }

    Some(current)
}

/// Read a scalar at `path` as text. Null, objects and arrays yield `None`.
pub fn json_text(value: &Value, path: &str) -> Option<String> {
    match json_path(value, path)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
