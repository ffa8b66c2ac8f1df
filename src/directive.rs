//! Directive locator
//!
//! Finds `<<prefix body>>remainder` at the start of a text blob. Body capture and
//! remainder extraction come from the same compiled match, so they can never
//! disagree on whether a directive is present.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Enclosure;
use crate::error::{HintError, Result};

/// Prefix grammar; length >= 2 is checked separately
static PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap());

/// Characters allowed between the prefix and the closing enclosure.
/// `\s` covers Unicode line and paragraph separators.
const BODY_CHARS: &str = r#"[-\s".,=>:()@\[\]{}/_a-zA-Z0-9]"#;

/// Compiled directive patterns, keyed by pattern source
static DIRECTIVE_CACHE: Lazy<DashMap<String, Regex>> = Lazy::new(DashMap::new);

/// A located directive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Directive<'a> {
    /// Text between prefix and closing enclosure, trimmed
    pub body: &'a str,
    /// Text after the closing enclosure, trimmed
    pub remainder: &'a str,
}

/// Validate a directive prefix
///
/// An empty prefix is accepted and means "no prefix token".
pub fn validate_prefix(near: &str, prefix: &str) -> Result<()> {
    if prefix.is_empty() {
        return Ok(());
    }
    if prefix.len() < 2 || !PREFIX_RE.is_match(prefix) {
        return Err(HintError::InvalidPrefix {
            prefix: prefix.to_string(),
            near: near.to_string(),
        });
    }
    Ok(())
}

fn directive_regex(prefix: &str, enclosure: &Enclosure) -> Regex {
    let source = format!(
        r"^{}{}({}*){}([\s\S]*)$",
        regex::escape(&enclosure.start),
        regex::escape(prefix),
        BODY_CHARS,
        regex::escape(&enclosure.end),
    );

    if let Some(cached) = DIRECTIVE_CACHE.get(&source) {
        return cached.clone();
    }

    // Every component is escaped or constant, so compilation cannot fail
    let compiled = Regex::new(&source).unwrap();
    DIRECTIVE_CACHE.insert(source, compiled.clone());
    compiled
}

/// Locate the directive at the start of `near`
///
/// Returns `Ok(None)` when no directive is present. Fails only on an invalid prefix,
/// before any scanning happens.
pub fn locate<'a>(near: &'a str, prefix: &str, enclosure: &Enclosure) -> Result<Option<Directive<'a>>> {
    validate_prefix(near, prefix)?;

    let Some(caps) = directive_regex(prefix, enclosure).captures(near) else {
        tracing::debug!(near, prefix, "no hints found");
        return Ok(None);
    };

    let body = caps.get(1).map_or("", |m| m.as_str()).trim();
    let remainder = caps.get(2).map_or("", |m| m.as_str()).trim();
    Ok(Some(Directive { body, remainder }))
}

/// Strip the directive and return the text after it
///
/// When no directive is present the input is returned unchanged.
pub fn consume(near: &str, prefix: &str, enclosure: &Enclosure) -> Result<String> {
    Ok(match locate(near, prefix, enclosure)? {
        Some(directive) => directive.remainder.to_string(),
        None => near.to_string(),
    })
}
