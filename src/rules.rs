//! Declarative adapter configuration
//!
//! One `ExtractionRuleSet` describes one source site: where to fetch, how the
//! item list is shaped and which fields to read. Rule sets are immutable once
//! a `Bridge` is built from them.

use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};
use crate::url_clean::NEXT_IMAGE_PROXY;

/// Placeholder for the resource identifier in endpoint and link templates
pub const ID_TOKEN: &str = "{id}";
/// Placeholder for the requested number of items
pub const PAGE_SIZE_TOKEN: &str = "{pageSize}";

/// Adapter metadata consumed by hosts (feed header, cache layer)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeInfo {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub maintainer: String,
    /// Example input shown to users
    #[serde(default)]
    pub default_input: Option<String>,
    /// Hint for an external cache; not used by the pipeline
    #[serde(default)]
    pub cache_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRuleSet {
    pub info: BridgeInfo,
    /// Primary document URL template (`{id}`, `{pageSize}`)
    pub endpoint: String,
    #[serde(default)]
    pub page_size: Option<u32>,
    /// IANA zone used for zone-less timestamps
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Regex unwrapping proxied image URLs; first capture group is the target
    #[serde(default)]
    pub image_proxy: Option<String>,
    pub source: ItemSource,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_true() -> bool {
    true
}

/// Shape of the primary document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemSource {
    Json(JsonRules),
    Html(HtmlRules),
}

/// Structured-field rules for JSON APIs. All fields are dot paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRules {
    /// Path to the list of items
    pub items: String,
    pub id: String,
    pub title: String,
    /// Item link template; `{id}` is bound to the item id
    pub link: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub image_width: Option<ImageWidth>,
    #[serde(default = "default_true")]
    pub image_required: bool,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Path to a list of category labels
    #[serde(default)]
    pub categories: Option<String>,
    /// Per-item media metadata requiring a secondary fetch
    #[serde(default)]
    pub media: Option<MediaRules>,
}

/// Width requested from image URLs that carry a width placeholder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageWidth {
    pub placeholder: String,
    pub value: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRules {
    /// Media metadata URL template; `{id}` is bound to the item id
    pub endpoint: String,
    /// Path to the list of stream objects inside the media document
    pub streams: String,
    pub quality_field: String,
    pub url_field: String,
    /// Items without any stream are dropped when set
    #[serde(default = "default_true")]
    pub required: bool,
}

/// Path-query rules for HTML pages.
///
/// Queries are CSS selectors relative to the item node, with an optional
/// accessor suffix: `::text` (default), `::html` or `::attr(name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlRules {
    /// Selector for item containers, evaluated on the whole page
    pub item: String,
    pub title: String,
    pub uri: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub enclosure: Option<String>,
    #[serde(default)]
    pub author: Option<AuthorRule>,
    #[serde(default)]
    pub categories: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Author read from a "byline, Name" element.
///
/// The first two text nodes of the matched element are whitespace-normalised
/// and joined by a space; the value is whatever follows the first `after`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRule {
    pub selector: String,
    #[serde(default = "default_author_delimiter")]
    pub after: String,
}

fn default_author_delimiter() -> String {
    " ".to_string()
}

impl ExtractionRuleSet {
    /// Load a rule set from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Whether the endpoint needs a caller-supplied identifier
    pub fn takes_input(&self) -> bool {
        self.endpoint.contains(ID_TOKEN)
    }

    /// ARD Mediathek: episodes of a show via the page-gateway API.
    pub fn ard_mediathek() -> Self {
        Self {
            info: BridgeInfo {
                name: "ARD-Mediathek Bridge".to_string(),
                uri: "https://www.ardmediathek.de".to_string(),
                description: "Feed of any series in the ARD-Mediathek, specified by its path"
                    .to_string(),
                maintainer: "yue-dongchen".to_string(),
                default_input: Some(
                    "https://www.ardmediathek.de/sendung/45-min/Y3JpZDovL25kci5kZS8xMzkx/"
                        .to_string(),
                ),
                cache_timeout_secs: None,
            },
            endpoint:
                "https://api.ardmediathek.de/page-gateway/widgets/ard/asset/{id}/?pageSize={pageSize}"
                    .to_string(),
            // 29 is the highest value known to work
            page_size: Some(3),
            timezone: "Europe/Berlin".to_string(),
            image_proxy: None,
            source: ItemSource::Json(JsonRules {
                items: "teasers".to_string(),
                id: "id".to_string(),
                title: "longTitle".to_string(),
                link: "https://www.ardmediathek.de/video/{id}".to_string(),
                content: None,
                image: Some("images.aspect16x9.src".to_string()),
                image_width: Some(ImageWidth {
                    placeholder: "{width}".to_string(),
                    value: 432,
                }),
                image_required: true,
                timestamp: Some("broadcastedOn".to_string()),
                author: Some("publicationService.name".to_string()),
                categories: None,
                media: Some(MediaRules {
                    endpoint: "https://api.ardmediathek.de/page-gateway/mediacollection/{id}?devicetype=pc&embedded=true"
                        .to_string(),
                    streams: "_mediaArray[0]._mediaStreamArray".to_string(),
                    quality_field: "_quality".to_string(),
                    url_field: "_stream".to_string(),
                    required: true,
                }),
            }),
        }
    }

    /// Nius: news stories scraped from the HTML front page.
    pub fn nius() -> Self {
        Self {
            info: BridgeInfo {
                name: "Nius".to_string(),
                uri: "https://www.nius.de/news".to_string(),
                description: "Die Stimme der Mehrheit".to_string(),
                maintainer: "Niehztog".to_string(),
                default_input: None,
                cache_timeout_secs: Some(3600),
            },
            endpoint: "https://www.nius.de/news".to_string(),
            page_size: None,
            timezone: "Europe/Berlin".to_string(),
            image_proxy: Some(NEXT_IMAGE_PROXY.to_string()),
            source: ItemSource::Html(HtmlRules {
                item: r#"div[class*="compact-story"], div[class*="regular-story"]"#.to_string(),
                title: "h2.title::text".to_string(),
                uri: "a::attr(href)".to_string(),
                content: Some("h2.title::text".to_string()),
                enclosure: Some("img::attr(src)".to_string()),
                author: Some(AuthorRule {
                    selector: "span.author".to_string(),
                    after: default_author_delimiter(),
                }),
                categories: Some("div.subtitle::owntext".to_string()),
                timestamp: None,
            }),
        }
    }
}
