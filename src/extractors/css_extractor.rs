//! Path-query extraction from HTML pages
//!
//! Uses the scraper crate to select item containers and evaluates per-field
//! CSS selectors relative to each container.

use scraper::{ElementRef, Selector};
use tracing::warn;
use url::Url;

use super::{non_empty, normalize_ws, ExtractContext, ItemExtractor, RawItemRecord};
use crate::document::Document;
use crate::error::{BridgeError, Result};
use crate::rules::{AuthorRule, HtmlRules};
use crate::timezone::TimeContext;
use crate::url_clean::resolve_link;

/// What to read from a matched element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// All descendant text
    Text,
    /// Only the element's direct text nodes
    OwnText,
    /// Inner HTML
    Html,
    Attr(String),
}

/// A CSS selector plus accessor, written as `selector::accessor`
#[derive(Debug, Clone)]
pub struct FieldQuery {
    selector: Selector,
    accessor: Accessor,
}

impl FieldQuery {
    pub fn parse(input: &str) -> Result<Self> {
        let (selector_str, accessor) = split_accessor(input);
        let selector = parse_selector(selector_str)?;
        Ok(Self { selector, accessor })
    }

    pub fn accessor(&self) -> &Accessor {
        &self.accessor
    }

    /// Single value relative to `scope`.
    ///
    /// Text accessors concatenate every match; `Html` reads the first match;
    /// `Attr` reads the first match carrying the attribute.
    pub fn value(&self, scope: ElementRef<'_>) -> Option<String> {
        let mut matches = scope.select(&self.selector);
        match &self.accessor {
            Accessor::Text | Accessor::OwnText => {
                let joined = matches
                    .map(|el| self.read_text(el))
                    .collect::<Vec<_>>()
                    .join(" ");
                non_empty(normalize_ws(&joined))
            }
            Accessor::Html => matches
                .next()
                .and_then(|el| non_empty(el.inner_html().trim().to_string())),
            Accessor::Attr(name) => matches
                .find_map(|el| el.value().attr(name))
                .and_then(|v| non_empty(v.trim().to_string())),
        }
    }

    /// One value per match, empty values skipped.
    pub fn values(&self, scope: ElementRef<'_>) -> Vec<String> {
        scope
            .select(&self.selector)
            .filter_map(|el| match &self.accessor {
                Accessor::Text | Accessor::OwnText => non_empty(normalize_ws(&self.read_text(el))),
                Accessor::Html => non_empty(el.inner_html().trim().to_string()),
                Accessor::Attr(name) => el.value().attr(name).and_then(|v| non_empty(v.trim().to_string())),
            })
            .collect()
    }

    fn read_text(&self, el: ElementRef<'_>) -> String {
        match self.accessor {
            Accessor::OwnText => own_text_nodes(el).collect::<Vec<_>>().join(" "),
            _ => el.text().collect::<String>(),
        }
    }
}

// Parse `selector::text`, `selector::owntext`, `selector::html` or `selector::attr(x)`
fn split_accessor(input: &str) -> (&str, Accessor) {
    let input = input.trim();
    if let Some(pos) = input.rfind("::attr(") {
        let attr_start = pos + 7;
        if let Some(attr_end) = input[attr_start..].find(')') {
            let attr_name = input[attr_start..attr_start + attr_end].trim().to_string();
            return (input[..pos].trim(), Accessor::Attr(attr_name));
        }
    }
    if let Some(selector) = input.strip_suffix("::owntext") {
        return (selector.trim(), Accessor::OwnText);
    }
    if let Some(selector) = input.strip_suffix("::text") {
        return (selector.trim(), Accessor::Text);
    }
    if let Some(selector) = input.strip_suffix("::html") {
        return (selector.trim(), Accessor::Html);
    }
    (input, Accessor::Text)
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| BridgeError::Config(format!("invalid selector `{selector}`: {e:?}")))
}

fn own_text_nodes<'a>(el: ElementRef<'a>) -> impl Iterator<Item = &'a str> + 'a {
    el.children().filter_map(|node| node.value().as_text().map(|t| &**t))
}

/// Author from a "byline, Name" element
#[derive(Debug, Clone)]
struct AuthorQuery {
    selector: Selector,
    after: String,
}

impl AuthorQuery {
    fn new(rule: &AuthorRule) -> Result<Self> {
        Ok(Self {
            selector: parse_selector(&rule.selector)?,
            after: rule.after.clone(),
        })
    }

    fn value(&self, scope: ElementRef<'_>) -> Option<String> {
        let el = scope.select(&self.selector).next()?;
        let mut parts = own_text_nodes(el).map(normalize_ws);
        let first = parts.next().unwrap_or_default();
        let second = parts.next().unwrap_or_default();

        let joined = format!("{first} {second}");
        let (_, name) = joined.split_once(self.after.as_str())?;
        non_empty(name.trim().to_string())
    }
}

pub struct CssExtractor {
    item: Selector,
    title: FieldQuery,
    uri: FieldQuery,
    content: Option<FieldQuery>,
    enclosure: Option<FieldQuery>,
    author: Option<AuthorQuery>,
    categories: Option<FieldQuery>,
    timestamp: Option<FieldQuery>,
}

impl CssExtractor {
    /// Compile all selectors. Any invalid selector is a `Config` error.
    pub fn new(rules: &HtmlRules) -> Result<Self> {
        let optional = |query: &Option<String>| query.as_deref().map(FieldQuery::parse).transpose();

        Ok(Self {
            item: parse_selector(&rules.item)?,
            title: FieldQuery::parse(&rules.title)?,
            uri: FieldQuery::parse(&rules.uri)?,
            content: optional(&rules.content)?,
            enclosure: optional(&rules.enclosure)?,
            author: rules.author.as_ref().map(AuthorQuery::new).transpose()?,
            categories: optional(&rules.categories)?,
            timestamp: optional(&rules.timestamp)?,
        })
    }

    fn extract_one(&self, node: ElementRef<'_>, base: &Url, time: &TimeContext) -> Result<RawItemRecord> {
        let title = self
            .title
            .value(node)
            .ok_or(BridgeError::MissingRequiredField("title"))?;
        let uri = self
            .uri
            .value(node)
            .and_then(|href| resolve_link(base, &href))
            .ok_or(BridgeError::MissingRequiredField("uri"))?;

        let enclosures = self
            .enclosure
            .as_ref()
            .and_then(|q| q.value(node))
            .and_then(|src| resolve_link(base, &src))
            .into_iter()
            .collect();

        Ok(RawItemRecord {
            id: uri.clone(),
            uri,
            title,
            content: self.content.as_ref().and_then(|q| q.value(node)),
            timestamp: self
                .timestamp
                .as_ref()
                .and_then(|q| q.value(node))
                .and_then(|raw| time.parse_timestamp(&raw)),
            author: self.author.as_ref().and_then(|q| q.value(node)),
            categories: self
                .categories
                .as_ref()
                .map(|q| q.values(node))
                .unwrap_or_default(),
            enclosures,
        })
    }
}

impl ItemExtractor for CssExtractor {
    fn extract_items(&self, document: &Document, ctx: &ExtractContext<'_>) -> Result<Vec<RawItemRecord>> {
        let Document::Html(html) = document else {
            return Err(BridgeError::invalid_document(ctx.url, "expected an HTML document"));
        };
        let base = Url::parse(ctx.url).map_err(|e| BridgeError::invalid_document(ctx.url, e))?;

        let mut records = Vec::new();
        for (index, node) in html.select(&self.item).enumerate() {
            match self.extract_one(node, &base, ctx.time) {
                Ok(record) => records.push(record),
                Err(e) => warn!(url = ctx.url, index, error = %e, "dropping item"),
            }
        }

        Ok(records)
    }
}
