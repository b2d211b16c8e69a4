//! URL templates with `{token}` placeholders

use crate::error::{BridgeError, Result};

/// Replace every occurrence of each bound token.
///
/// Tokens are matched literally (including braces). Tokens without a binding
/// are left in place, and values are inserted without any encoding.
pub fn resolve(template: &str, bindings: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    // Single left-to-right scan so a substituted value is never rescanned
    'scan: while !rest.is_empty() {
        for (token, value) in bindings {
            if !token.is_empty() && rest.starts_with(token) {
                out.push_str(value);
                rest = &rest[token.len()..];
                continue 'scan;
            }
        }
        let ch = rest.chars().next().unwrap_or_default();
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}

pub fn contains_token(template: &str, token: &str) -> bool {
    !token.is_empty() && template.contains(token)
}

/// Derive the resource identifier from a page URL or a bare id.
///
/// Takes the last non-empty `/`-separated segment, so
/// `https://host/show/45-min/Y3Jp/` and `Y3Jp` both yield `Y3Jp`.
pub fn resource_id(input: &str) -> Result<&str> {
    input
        .trim()
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .ok_or_else(|| BridgeError::Input("path may not be empty".to_string()))
}
