//! Collection pass: fetch, extract, select streams, normalize
//!
//! Items are processed strictly one after another because each may need a
//! secondary fetch before it can be normalized. Failures of a single item
//! are logged and the item is dropped; failing to obtain the primary
//! document fails the pass.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::document::{json_path, Document, DocumentKind};
use crate::error::{BridgeError, Result};
use crate::extractors::{extractor_for, ExtractContext, ItemExtractor, RawItemRecord};
use crate::fetch::{DocumentFetcher, FetchConfig, HttpFetcher};
use crate::media::{candidates_from_json, select_best, MediaStreamCandidate};
use crate::normalize::{normalize, CanonicalFeedItem, NormalizePolicy};
use crate::rules::{BridgeInfo, ExtractionRuleSet, ItemSource, MediaRules, ID_TOKEN, PAGE_SIZE_TOKEN};
use crate::template::{contains_token, resolve, resource_id};
use crate::timezone::TimeContext;
use crate::url_clean::ProxyPattern;

/// A configured adapter ready to run collection passes
pub struct Bridge<F = HttpFetcher> {
    rules: ExtractionRuleSet,
    fetcher: F,
    time: TimeContext,
    kind: DocumentKind,
    extractor: Box<dyn ItemExtractor>,
    media: Option<MediaRules>,
    image_proxy: Option<ProxyPattern>,
    policy: NormalizePolicy,
}

impl Bridge<HttpFetcher> {
    pub fn with_http(rules: ExtractionRuleSet, config: &FetchConfig) -> Result<Self> {
        Self::new(rules, HttpFetcher::new(config))
    }
}

impl<F: DocumentFetcher> Bridge<F> {
    /// Validate and compile a rule set. Invalid zones, selectors or proxy
    /// patterns fail here rather than during a pass.
    pub fn new(rules: ExtractionRuleSet, fetcher: F) -> Result<Self> {
        let time = TimeContext::from_name(&rules.timezone)?;
        let extractor = extractor_for(&rules.source)?;
        let image_proxy = rules.image_proxy.as_deref().map(ProxyPattern::new).transpose()?;

        let (kind, media, policy) = match &rules.source {
            ItemSource::Json(json) => (
                DocumentKind::Json,
                json.media.clone(),
                NormalizePolicy {
                    stream_required: json.media.as_ref().is_some_and(|m| m.required),
                    image_required: json.image_required,
                },
            ),
            ItemSource::Html(_) => (DocumentKind::Html, None, NormalizePolicy::default()),
        };

        Ok(Self {
            rules,
            fetcher,
            time,
            kind,
            extractor,
            media,
            image_proxy,
            policy,
        })
    }

    pub fn info(&self) -> &BridgeInfo {
        &self.rules.info
    }

    pub fn rules(&self) -> &ExtractionRuleSet {
        &self.rules
    }

    pub fn time_context(&self) -> &TimeContext {
        &self.time
    }

    /// Build the primary document URL for a caller input.
    ///
    /// Rule sets without an `{id}` endpoint ignore the input.
    pub fn resolve_endpoint(&self, input: &str) -> Result<String> {
        let page_size = self.rules.page_size.map(|n| n.to_string());
        let mut bindings: Vec<(&str, &str)> = Vec::with_capacity(2);

        if self.rules.takes_input() {
            let id = resource_id(input)?;
            if id.contains(|c: char| c == '{' || c == '}') {
                return Err(BridgeError::Input(format!("identifier may not contain braces: {id}")));
            }
            bindings.push((ID_TOKEN, id));
        }
        if let Some(size) = page_size.as_deref() {
            bindings.push((PAGE_SIZE_TOKEN, size));
        }

        let url = resolve(&self.rules.endpoint, &bindings);
        if contains_token(&url, ID_TOKEN) || contains_token(&url, PAGE_SIZE_TOKEN) {
            return Err(BridgeError::Config(format!("unresolved placeholder in {url}")));
        }
        Ok(url)
    }

    /// Run one collection pass.
    pub fn collect(&self, input: &str) -> Result<Vec<CanonicalFeedItem>> {
        let url = self.resolve_endpoint(input)?;
        let body = self.fetcher.fetch(&url)?;
        let document = Document::parse(self.kind, &url, &body)?;

        let ctx = ExtractContext {
            url: &url,
            time: &self.time,
        };
        let records = self.extractor.extract_items(&document, &ctx)?;
        let found = records.len();

        let mut items = Vec::with_capacity(found);
        for record in records {
            let id = record.id.clone();
            match self.complete_item(record) {
                Ok(item) => items.push(item),
                Err(e) if e.is_item_level() => warn!(bridge = %self.rules.info.name, item = %id, error = %e, "dropping item"),
                Err(e) => return Err(e),
            }
        }

        info!(
            bridge = %self.rules.info.name,
            %url,
            found,
            emitted = items.len(),
            "collected items"
        );
        Ok(items)
    }

    fn complete_item(&self, record: RawItemRecord) -> Result<CanonicalFeedItem> {
        // Skip the media fetch for items that would be dropped anyway
        if self.policy.image_required && record.enclosures.is_empty() {
            return Err(BridgeError::IncompleteSourceData(format!("no image for {}", record.id)));
        }

        let candidates = match &self.media {
            Some(media) => self.fetch_candidates(media, &record.id)?,
            None => vec![],
        };
        let stream = match select_best(&candidates) {
            Ok(best) => Some(best),
            Err(_) if self.media.is_none() => None,
            Err(e) if self.policy.stream_required => return Err(e),
            Err(_) => None,
        };

        let image = record.enclosures.first().map(|src| self.clean_image(src));
        normalize(record, stream, image, self.policy)
    }

    fn fetch_candidates(&self, media: &MediaRules, id: &str) -> Result<Vec<MediaStreamCandidate>> {
        let url = resolve(&media.endpoint, &[(ID_TOKEN, id)]);
        debug!(%url, item = id, "fetching media metadata");

        let body = self.fetcher.fetch(&url)?;
        let value: Value =
            serde_json::from_str(&body).map_err(|e| BridgeError::invalid_document(&url, e))?;

        Ok(json_path(&value, &media.streams)
            .map(|list| candidates_from_json(list, &media.quality_field, &media.url_field))
            .unwrap_or_default())
    }

    fn clean_image(&self, src: &str) -> String {
        match &self.image_proxy {
            Some(pattern) => pattern.unwrap_url(src),
            None => src.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// In-memory fetcher keyed by URL, recording every request
    #[derive(Default)]
    struct FakeFetcher {
        documents: HashMap<String, String>,
        requests: RefCell<Vec<String>>,
    }

    impl FakeFetcher {
        fn with(mut self, url: &str, body: &str) -> Self {
            self.documents.insert(url.to_string(), body.to_string());
            self
        }
    }

    impl DocumentFetcher for FakeFetcher {
        fn fetch(&self, url: &str) -> Result<String> {
            self.requests.borrow_mut().push(url.to_string());
            self.documents
                .get(url)
                .cloned()
                .ok_or_else(|| BridgeError::fetch(url, "HTTP 404 Not Found"))
        }
    }

    const SHOW: &str = "https://www.ardmediathek.de/sendung/45-min/Y3JpZDovL25kci5kZS8xMzkx/";
    const ASSET_URL: &str =
        "https://api.ardmediathek.de/page-gateway/widgets/ard/asset/Y3JpZDovL25kci5kZS8xMzkx/?pageSize=3";

    fn media_url(id: &str) -> String {
        format!("https://api.ardmediathek.de/page-gateway/mediacollection/{id}?devicetype=pc&embedded=true")
    }

    const TEASERS: &str = r#"{
        "teasers": [
            {
                "id": "ep1",
                "longTitle": "45 Min - Die Bahn",
                "images": {"aspect16x9": {"src": "https://api.ardmediathek.de/image-service/images/urn:ard:image:1?w={width}"}},
                "broadcastedOn": "2024-01-15T19:15:00Z",
                "publicationService": {"name": "NDR"}
            },
            {
                "id": "ep2",
                "images": {"aspect16x9": {"src": "https://img/2?w={width}"}},
                "publicationService": {"name": "NDR"}
            }
        ]
    }"#;

    const STREAMS: &str = r#"{
        "_mediaArray": [{
            "_mediaStreamArray": [
                {"_quality": "auto", "_stream": "https://cdn/master.m3u8"},
                {"_quality": 1, "_stream": "https://cdn/ep1_1.mp4"},
                {"_quality": 3, "_stream": "https://cdn/ep1_3.mp4"},
                {"_quality": 2, "_stream": "https://cdn/ep1_2.mp4"}
            ]
        }]
    }"#;

    fn ard_bridge(fetcher: FakeFetcher) -> Bridge<FakeFetcher> {
        Bridge::new(ExtractionRuleSet::ard_mediathek(), fetcher).unwrap()
    }

    #[test]
    fn test_drops_item_without_title() {
        init_tracing();
        let fetcher = FakeFetcher::default()
            .with(ASSET_URL, TEASERS)
            .with(&media_url("ep1"), STREAMS)
            .with(&media_url("ep2"), STREAMS);
        let bridge = ard_bridge(fetcher);

        let items = bridge.collect(SHOW).unwrap();
        assert_eq!(items.len(), 1);

        let item = &items[0];
        assert_eq!(item.uid, "ep1");
        assert_eq!(item.uri, "https://www.ardmediathek.de/video/ep1");
        assert_eq!(item.title, "45 Min - Die Bahn");
        assert_eq!(
            item.enclosures,
            vec![
                "https://api.ardmediathek.de/image-service/images/urn:ard:image:1?w=432",
                "https://cdn/ep1_3.mp4",
            ]
        );
        assert_eq!(
            item.content.as_deref(),
            Some(r#"<img src="https://api.ardmediathek.de/image-service/images/urn:ard:image:1?w=432" />"#)
        );
        assert_eq!(item.author.as_deref(), Some("NDR"));
        assert_eq!(item.timestamp.unwrap().to_rfc3339(), "2024-01-15T20:15:00+01:00");

        // the malformed teaser never triggers a media fetch
        assert_eq!(
            *bridge.fetcher.requests.borrow(),
            vec![ASSET_URL.to_string(), media_url("ep1")]
        );
    }

    #[test]
    fn test_drops_item_with_empty_stream_list() {
        let teasers = r#"{"teasers": [
            {"id": "a", "longTitle": "A", "images": {"aspect16x9": {"src": "https://img/a"}}},
            {"id": "b", "longTitle": "B", "images": {"aspect16x9": {"src": "https://img/b"}}}
        ]}"#;
        let fetcher = FakeFetcher::default()
            .with(ASSET_URL, teasers)
            .with(&media_url("a"), r#"{"_mediaArray": [{"_mediaStreamArray": []}]}"#)
            .with(&media_url("b"), STREAMS);

        let items = ard_bridge(fetcher).collect("Y3JpZDovL25kci5kZS8xMzkx").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].uid, "b");
    }

    #[test]
    fn test_secondary_fetch_failure_drops_item() {
        init_tracing();
        let teasers = r#"{"teasers": [
            {"id": "gone", "longTitle": "Gone", "images": {"aspect16x9": {"src": "https://img/g"}}},
            {"id": "bad", "longTitle": "Bad", "images": {"aspect16x9": {"src": "https://img/x"}}},
            {"id": "ok", "longTitle": "Ok", "images": {"aspect16x9": {"src": "https://img/o"}}}
        ]}"#;
        let fetcher = FakeFetcher::default()
            .with(ASSET_URL, teasers)
            .with(&media_url("bad"), "<html>")
            .with(&media_url("ok"), STREAMS);

        let items = ard_bridge(fetcher).collect(SHOW).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].uid, "ok");
    }

    #[test]
    fn test_missing_image_drops_item() {
        let teasers = r#"{"teasers": [{"id": "a", "longTitle": "A"}]}"#;
        let fetcher = FakeFetcher::default()
            .with(ASSET_URL, teasers)
            .with(&media_url("a"), STREAMS);

        let bridge = ard_bridge(fetcher);
        assert!(bridge.collect(SHOW).unwrap().is_empty());
        assert_eq!(*bridge.fetcher.requests.borrow(), vec![ASSET_URL.to_string()]);
    }

    #[test]
    fn test_primary_fetch_failure_is_fatal() {
        let result = ard_bridge(FakeFetcher::default()).collect(SHOW);
        assert!(matches!(result, Err(BridgeError::Fetch { .. })));
    }

    #[test]
    fn test_invalid_primary_document_is_fatal() {
        let fetcher = FakeFetcher::default().with(ASSET_URL, "not json");
        let result = ard_bridge(fetcher).collect(SHOW);
        assert!(matches!(result, Err(BridgeError::InvalidDocument { .. })));
    }

    #[test]
    fn test_empty_input_fails_before_fetching() {
        let bridge = ard_bridge(FakeFetcher::default());
        assert!(matches!(bridge.collect(""), Err(BridgeError::Input(_))));
        assert!(matches!(bridge.collect("//"), Err(BridgeError::Input(_))));
        assert!(bridge.fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn test_resolve_endpoint() {
        let bridge = ard_bridge(FakeFetcher::default());
        assert_eq!(bridge.resolve_endpoint(SHOW).unwrap(), ASSET_URL);
        assert_eq!(bridge.resolve_endpoint("Y3JpZDovL25kci5kZS8xMzkx").unwrap(), ASSET_URL);
    }

    #[test]
    fn test_placeholder_in_input_is_input_error() {
        let bridge = ard_bridge(FakeFetcher::default());
        assert!(matches!(bridge.resolve_endpoint("show/abc{pageSize}"), Err(BridgeError::Input(_))));
        assert!(matches!(bridge.collect("{id}"), Err(BridgeError::Input(_))));
        assert!(bridge.fetcher.requests.borrow().is_empty());
    }

    #[test]
    fn test_unbound_page_size_is_config_error() {
        let mut rules = ExtractionRuleSet::ard_mediathek();
        rules.page_size = None;
        let bridge = Bridge::new(rules, FakeFetcher::default()).unwrap();
        assert!(matches!(bridge.resolve_endpoint("x"), Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_time_context_survives_failed_pass() {
        let fetcher = FakeFetcher::default()
            .with(&media_url("ep1"), STREAMS);
        let bridge = ard_bridge(fetcher);
        let before = *bridge.time_context();

        assert!(bridge.collect(SHOW).is_err());
        assert_eq!(*bridge.time_context(), before);
        assert_eq!(bridge.time_context().zone(), chrono_tz::Europe::Berlin);
    }

    #[test]
    fn test_optional_media() {
        let mut rules = ExtractionRuleSet::ard_mediathek();
        if let ItemSource::Json(json) = &mut rules.source {
            json.media.as_mut().unwrap().required = false;
        }
        let teasers = r#"{"teasers": [{"id": "a", "longTitle": "A", "images": {"aspect16x9": {"src": "https://img/a"}}}]}"#;
        let fetcher = FakeFetcher::default()
            .with(ASSET_URL, teasers)
            .with(&media_url("a"), r#"{"_mediaArray": []}"#);

        let items = Bridge::new(rules, fetcher).unwrap().collect(SHOW).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].enclosures, vec!["https://img/a"]);
    }

    const NEWS_PAGE: &str = r#"
    <html><body>
        <div class="regular-story">
            <a href="/politik/eins"><img src="https://www.nius.de/_next/image?url=https://cdn.example/1.jpg?w=3840&q=75" /></a>
            <div class="subtitle">Politik</div>
            <h2 class="title">Erste Meldung</h2>
            <span class="author">von<!-- -->Erika Muster</span>
        </div>
        <div class="compact-story">
            <a href="/wirtschaft/zwei"><img src="https://images.example/plain.jpg" /></a>
            <h2 class="title">Zweite Meldung</h2>
        </div>
        <div class="compact-story"><h2 class="title">Ohne Link</h2></div>
    </body></html>
    "#;

    #[test]
    fn test_html_bridge() {
        init_tracing();
        let fetcher = FakeFetcher::default().with("https://www.nius.de/news", NEWS_PAGE);
        let bridge = Bridge::new(ExtractionRuleSet::nius(), fetcher).unwrap();

        let items = bridge.collect("").unwrap();
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].uri, "https://www.nius.de/politik/eins");
        assert_eq!(items[0].uid, items[0].uri);
        assert_eq!(items[0].enclosures, vec!["https://cdn.example/1.jpg"]);
        assert_eq!(items[0].content.as_deref(), Some("Erste Meldung"));
        assert_eq!(items[0].author.as_deref(), Some("Erika Muster"));
        assert_eq!(items[0].categories, vec!["Politik"]);

        assert_eq!(items[1].enclosures, vec!["https://images.example/plain.jpg"]);
        assert!(items[1].author.is_none());
        assert_eq!(bridge.fetcher.requests.borrow().len(), 1);
    }

    #[test]
    fn test_http_bridge_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Bridge<HttpFetcher>>();
    }

    #[test]
    fn test_invalid_rules_fail_construction() {
        let mut rules = ExtractionRuleSet::nius();
        rules.timezone = "Nowhere/City".to_string();
        assert!(matches!(Bridge::new(rules, FakeFetcher::default()), Err(BridgeError::Config(_))));

        let mut rules = ExtractionRuleSet::nius();
        rules.image_proxy = Some("(".to_string());
        assert!(matches!(Bridge::new(rules, FakeFetcher::default()), Err(BridgeError::Config(_))));

        let mut rules = ExtractionRuleSet::nius();
        if let ItemSource::Html(html) = &mut rules.source {
            html.item = "div[".to_string();
        }
        assert!(matches!(Bridge::new(rules, FakeFetcher::default()), Err(BridgeError::Config(_))));
    }
}
