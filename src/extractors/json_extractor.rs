//! Structured-field extraction from JSON API payloads
//!
//! Fields are read directly by dot path from each element of the item list.

use serde_json::Value;
use tracing::warn;

use super::{non_empty, normalize_ws, ExtractContext, ItemExtractor, RawItemRecord};
use crate::document::{json_path, json_text, Document};
use crate::error::{BridgeError, Result};
use crate::rules::{JsonRules, ID_TOKEN};
use crate::template::resolve;
use crate::timezone::TimeContext;

pub struct JsonExtractor {
    rules: JsonRules,
}

impl JsonExtractor {
    pub fn new(rules: JsonRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &JsonRules {
        &self.rules
    }

    fn extract_one(&self, item: &Value, time: &TimeContext) -> Result<RawItemRecord> {
        let rules = &self.rules;

        let id = json_text(item, &rules.id)
            .map(|s| s.trim().to_string())
            .and_then(non_empty)
            .ok_or(BridgeError::MissingRequiredField("id"))?;
        let title = json_text(item, &rules.title)
            .map(|s| s.trim().to_string())
            .and_then(non_empty)
            .ok_or(BridgeError::MissingRequiredField("title"))?;
        let uri = resolve(&rules.link, &[(ID_TOKEN, id.as_str())]);

        let image = rules
            .image
            .as_deref()
            .and_then(|path| json_text(item, path))
            .and_then(non_empty)
            .map(|src| match &rules.image_width {
                Some(width) => {
                    let value = width.value.to_string();
                    resolve(&src, &[(width.placeholder.as_str(), value.as_str())])
                }
                None => src,
            });

        let timestamp = rules
            .timestamp
            .as_deref()
            .and_then(|path| json_text(item, path))
            .and_then(|raw| time.parse_timestamp(&raw));

        let categories = rules
            .categories
            .as_deref()
            .and_then(|path| json_path(item, path))
            .and_then(Value::as_array)
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(Value::as_str)
                    .map(normalize_ws)
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(RawItemRecord {
            id,
            uri,
            title,
            content: self.optional_text(item, rules.content.as_deref()),
            timestamp,
            author: self.optional_text(item, rules.author.as_deref()).map(|s| normalize_ws(&s)),
            categories,
            enclosures: image.into_iter().collect(),
        })
    }

    fn optional_text(&self, item: &Value, path: Option<&str>) -> Option<String> {
        path.and_then(|p| json_text(item, p)).and_then(non_empty)
    }
}

impl ItemExtractor for JsonExtractor {
    fn extract_items(&self, document: &Document, ctx: &ExtractContext<'_>) -> Result<Vec<RawItemRecord>> {
        let Document::Json(value) = document else {
            return Err(BridgeError::invalid_document(ctx.url, "expected a JSON document"));
        };

        let items = json_path(value, &self.rules.items)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                BridgeError::invalid_document(ctx.url, format!("no item list at `{}`", self.rules.items))
            })?;

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            match self.extract_one(item, ctx.time) {
                Ok(record) => records.push(record),
                Err(e) => warn!(url = ctx.url, index, error = %e, "dropping item"),
            }
        }

        Ok(records)
    }
}
