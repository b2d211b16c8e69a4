//! Image proxy unwrapping and link resolution

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

use crate::error::{BridgeError, Result};

/// Redirector form used by Next.js image optimisation: `.../_next/image?url=<target>?...`
pub const NEXT_IMAGE_PROXY: &str = r"^https?://[^/]+/_next/image\?url=(.*)\?";

/// A compiled redirector pattern. The first capture group is the target.
#[derive(Debug, Clone)]
pub struct ProxyPattern {
    regex: Regex,
}

impl ProxyPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| BridgeError::Config(format!("invalid proxy pattern {pattern}: {e}")))?;
        if regex.captures_len() < 2 {
            return Err(BridgeError::Config(format!(
                "proxy pattern {pattern} has no capture group"
            )));
        }
        Ok(Self { regex })
    }

    /// Return the wrapped target, or `raw` unchanged when the pattern does not match.
    pub fn unwrap_url(&self, raw: &str) -> String {
        self.regex
            .captures(raw)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| raw.to_string())
    }
}

fn next_image_proxy() -> &'static ProxyPattern {
    static PATTERN: OnceLock<ProxyPattern> = OnceLock::new();
    PATTERN.get_or_init(|| {
        ProxyPattern::new(NEXT_IMAGE_PROXY).expect("next image proxy regex must compile")
    })
}

/// Unwrap the default `/_next/image?url=` redirector.
pub fn unwrap_proxy_url(raw: &str) -> String {
    next_image_proxy().unwrap_url(raw)
}

/// Resolve an href found on a page against the page URL.
///
/// Returns `None` for empty, `javascript:`, `mailto:`, `tel:` and anchor
/// links, and for anything that does not resolve to http(s).
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with('#')
    {
        return None;
    }

    let absolute = base.join(href).ok()?;
    if absolute.scheme() == "http" || absolute.scheme() == "https" {
        Some(absolute.to_string())
    } else {
        None
    }
}
