//! Minimal property-path parser for module exports
//!
//! Supports:
//! - a.b.c (dot notation)
//! - a[0].b (array index)
//! - a["key with.dots"] / a['key'] (quoted member)
//! - $.a.b (optional $ root)
//!
//! Does NOT support:
//! - Filters: $.a[?(@.x==1)]
//! - Wildcards: $.a[*]
//! - Slices: $.a[0:5]

use serde_json::Value;

use crate::error::HintError;

/// A parsed path segment
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Object member access: .field or ["field"]
    Field(String),
    /// Array index access: [0]
    Index(usize),
}

fn invalid(path: &str) -> HintError {
    HintError::InvalidPropertyPath {
        path: path.to_string(),
    }
}

/// Parse a property path into segments
///
/// Examples:
/// - "jsonStr" → [Field("jsonStr")]
/// - "items[0].name" → [Field("items"), Index(0), Field("name")]
/// - "cfg[\"a.b\"]" → [Field("cfg"), Field("a.b")]
pub fn parse(path: &str) -> Result<Vec<Segment>, HintError> {
    let rest = match path {
        "$" | "" => return Ok(vec![]),
        p => p.strip_prefix("$.").unwrap_or(p),
    };

    let mut segments = Vec::new();
    let mut chars = rest.chars();
    let mut field = String::new();
    let mut expect_field = true;

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if expect_field && field.is_empty() {
                    return Err(invalid(path));
                }
                if !field.is_empty() {
                    segments.push(index_or_field(std::mem::take(&mut field)));
                }
                expect_field = true;
            }
            '[' => {
                if !field.is_empty() {
                    segments.push(Segment::Field(std::mem::take(&mut field)));
                }
                let mut inner = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(c);
                }
                if !closed {
                    return Err(invalid(path));
                }
                segments.push(bracket_segment(&inner).ok_or_else(|| invalid(path))?);
                expect_field = false;
            }
            c => {
                field.push(c);
                expect_field = false;
            }
        }
    }

    if !field.is_empty() {
        segments.push(index_or_field(field));
    } else if expect_field {
        return Err(invalid(path));
    }

    Ok(segments)
}

fn bracket_segment(inner: &str) -> Option<Segment> {
    let inner = inner.trim();
    for quote in ['"', '\''] {
        if let Some(key) = inner.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return Some(Segment::Field(key.to_string()));
        }
    }
    inner.parse::<usize>().ok().map(Segment::Index)
}

fn index_or_field(field: String) -> Segment {
    // Numeric segment treated as array index (e.g., "items.0")
    match field.parse::<usize>() {
        Ok(index) => Segment::Index(index),
        Err(_) => Segment::Field(field),
    }
}

/// Apply path segments to a JSON value
pub fn apply(value: &Value, segments: &[Segment]) -> Option<Value> {
    let mut current = value;

    for segment in segments {
        current = match segment {
            Segment::Field(name) => current.get(name)?,
            Segment::Index(idx) => current.get(*idx)?,
        };
    }

    Some(current.clone())
}

/// Parse and apply a property path in one step
pub fn resolve(value: &Value, path: &str) -> Result<Option<Value>, HintError> {
    let segments = parse(path)?;
    Ok(apply(value, &segments))
}
