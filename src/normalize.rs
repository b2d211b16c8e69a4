//! Canonical feed item assembly

use chrono::DateTime;
use chrono_tz::Tz;
use serde::Serialize;

use crate::error::{BridgeError, Result};
use crate::extractors::RawItemRecord;
use crate::media::MediaStreamCandidate;

/// Normalized output record handed to feed serializers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalFeedItem {
    pub uri: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Image first, media stream second
    pub enclosures: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Tz>>,
    pub uid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
}

/// Which parts of an item a rule set treats as mandatory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizePolicy {
    pub stream_required: bool,
    pub image_required: bool,
}

/// Build the canonical item from a raw record, the selected stream and the
/// cleaned image URL.
pub fn normalize(
    raw: RawItemRecord,
    stream: Option<&MediaStreamCandidate>,
    image: Option<String>,
    policy: NormalizePolicy,
) -> Result<CanonicalFeedItem> {
    if policy.stream_required && stream.is_none() {
        return Err(BridgeError::IncompleteSourceData(format!(
            "no media stream for {}",
            raw.id
        )));
    }
    if policy.image_required && image.is_none() {
        return Err(BridgeError::IncompleteSourceData(format!("no image for {}", raw.id)));
    }

    let content = raw
        .content
        .or_else(|| image.as_deref().map(|src| format!(r#"<img src="{}" />"#, escape_attr(src))));

    let enclosures = image
        .into_iter()
        .chain(stream.map(|s| s.url.clone()))
        .collect();

    Ok(CanonicalFeedItem {
        uri: raw.uri,
        title: raw.title,
        content,
        enclosures,
        timestamp: raw.timestamp,
        uid: raw.id,
        author: raw.author,
        categories: raw.categories,
    })
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
