//! Site adapters for syndication feeds
//!
//! Turns a show's JSON API payloads or a news site's HTML pages into
//! canonical feed items:
//! - URL templates and resource identifiers
//! - Structured-field (JSON) and path-query (HTML) item extraction
//! - Media stream quality selection
//! - Image proxy unwrapping
//! - Timestamps interpreted in the site's local zone

pub mod document;
pub mod error;
pub mod extractors;
pub mod fetch;
pub mod media;
pub mod normalize;
pub mod pipeline;
pub mod rules;
pub mod template;
pub mod timezone;
pub mod url_clean;

pub use error::{BridgeError, Result};
pub use extractors::{ItemExtractor, RawItemRecord};
pub use fetch::{DocumentFetcher, FetchConfig, HttpFetcher};
pub use media::{select_best, MediaStreamCandidate, Quality};
pub use normalize::CanonicalFeedItem;
pub use pipeline::Bridge;
pub use rules::{BridgeInfo, ExtractionRuleSet, ItemSource};
pub use timezone::TimeContext;
pub use url_clean::unwrap_proxy_url;
