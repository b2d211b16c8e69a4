//! Media stream candidates and quality selection

use serde_json::Value;
use tracing::debug;

use crate::document::json_text;
use crate::error::{BridgeError, Result};

/// Quality label of a stream rendition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// Adaptive rendition chosen by the player
    Auto,
    Rank(i64),
}

impl Quality {
    pub fn parse(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.eq_ignore_ascii_case("auto") {
            return Some(Quality::Auto);
        }
        label.parse().ok().map(Quality::Rank)
    }

    /// Whether this quality should replace `best`.
    ///
    /// `Auto` never replaces anything. A numeric rank replaces `Auto` and
    /// any strictly lower rank.
    fn beats(self, best: Quality) -> bool {
        match (self, best) {
            (Quality::Auto, _) => false,
            (Quality::Rank(_), Quality::Auto) => true,
            (Quality::Rank(c), Quality::Rank(b)) => c > b,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStreamCandidate {
    pub quality: Quality,
    pub url: String,
}

impl MediaStreamCandidate {
    pub fn new(quality: Quality, url: impl Into<String>) -> Self {
        Self {
            quality,
            url: url.into(),
        }
    }
}

/// Pick the best stream. The first candidate wins unless a later one beats it.
pub fn select_best(candidates: &[MediaStreamCandidate]) -> Result<&MediaStreamCandidate> {
    let mut selected: Option<&MediaStreamCandidate> = None;

    for candidate in candidates {
        match selected {
            Some(best) if !candidate.quality.beats(best.quality) => {}
            _ => selected = Some(candidate),
        }
    }

    selected.ok_or(BridgeError::NoCandidates)
}

/// Read stream candidates from a JSON list of stream objects.
///
/// Entries without a URL or with an unrecognised quality label are skipped.
pub fn candidates_from_json(list: &Value, quality_field: &str, url_field: &str) -> Vec<MediaStreamCandidate> {
    let Some(entries) = list.as_array() else {
        return vec![];
    };

    entries
        .iter()
        .filter_map(|entry| {
            let Some(url) = json_text(entry, url_field).filter(|u| !u.is_empty()) else {
                debug!(field = url_field, "skipping stream candidate without url");
                return None;
            };
            let label = json_text(entry, quality_field).unwrap_or_default();
            match Quality::parse(&label) {
                Some(quality) => Some(MediaStreamCandidate { quality, url }),
                None => {
                    debug!(%url, quality = %label, "skipping stream candidate with unknown quality");
                    None
                }
            }
        })
        .collect()
}
