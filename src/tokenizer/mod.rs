//! Entry Tokenizer - directive body to typed entries
//!
//! The body is scanned by an ordered list of [`HintMatcher`]s. Each matcher takes
//! every match it finds in the working copy, then its spans are spliced out before
//! the next, more permissive matcher runs:
//!
//! ```text
//! body ─► JsonLiteral ─► JsonResource ─► Quoted ─► Bare ─► ModuleExport ─► Unary
//!         key={..}/[..]  key=@(require:  key="…"   key=a/b  key=@(import:   key
//!                         x.json)                           m:prop|m=>fn)
//! ```
//!
//! Tokenizing is pure: deferred references come back as [`Entry::DeferredModuleRef`]
//! and are registered with a resolver by [`crate::hints::HintMap::load`].

mod matchers;

pub use matchers::{
    default_matchers, BareMatcher, JsonLiteralMatcher, JsonResourceMatcher, ModuleExportMatcher,
    QuotedMatcher, UnaryMatcher,
};

use std::ops::Range;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::hints::HintValue;
use crate::resolver::ModuleReference;

/// A single key/value pair extracted from a directive body
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    /// `key = {...}` or `key = [...]`
    Literal { key: String, value: Value },
    /// `key = "some text"`
    QuotedString { key: String, value: String },
    /// `key = some/path`
    BareString { key: String, value: String },
    /// `key` with no `=`, stored as key -> key
    UnaryFlag { key: String },
    /// `key = @(require:...)` / `key = @(import:...)`, resolved later
    DeferredModuleRef {
        key: String,
        reference: ModuleReference,
    },
}

impl Entry {
    pub fn key(&self) -> &str {
        match self {
            Entry::Literal { key, .. }
            | Entry::QuotedString { key, .. }
            | Entry::BareString { key, .. }
            | Entry::UnaryFlag { key }
            | Entry::DeferredModuleRef { key, .. } => key,
        }
    }

    /// Split into the key and the value stored in a hint map
    pub fn into_pair(self) -> (String, HintValue) {
        match self {
            Entry::Literal { key, value } => (key, HintValue::Json(value)),
            Entry::QuotedString { key, value } | Entry::BareString { key, value } => {
                (key, HintValue::Text(value))
            }
            Entry::UnaryFlag { key } => {
                let value = HintValue::Text(key.clone());
                (key, value)
            }
            Entry::DeferredModuleRef { key, reference } => (key, HintValue::Pending(reference)),
        }
    }
}

/// One pattern class of the tokenizer
pub trait HintMatcher: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Pattern whose matches this class claims
    fn pattern(&self) -> &Regex;

    /// Build the entry for one match
    fn entry(&self, caps: &Captures<'_>) -> Result<Entry>;

    /// Collect every match in `text` with its byte span
    fn scan(&self, text: &str) -> Result<(Vec<Entry>, Vec<Range<usize>>)> {
        let mut entries = Vec::new();
        let mut spans = Vec::new();
        for caps in self.pattern().captures_iter(text) {
            entries.push(self.entry(&caps)?);
            if let Some(m) = caps.get(0) {
                spans.push(m.range());
            }
        }
        Ok((entries, spans))
    }
}

/// Remove ascending, non-overlapping byte spans from `text`
pub fn splice_out(text: &str, spans: &[Range<usize>]) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;
    for span in spans {
        result.push_str(&text[last_end..span.start]);
        last_end = span.end;
    }
    result.push_str(&text[last_end..]);
    result
}

/// Tokenize a directive body with the default matcher order
pub fn tokenize(body: &str) -> Result<Vec<Entry>> {
    tokenize_with(body, &default_matchers())
}

/// Tokenize a directive body with an explicit matcher order
///
/// Fails on the first structural error; no partial entry list is returned.
#[instrument(skip_all, fields(body_len = body.len()))]
pub fn tokenize_with(body: &str, matchers: &[&dyn HintMatcher]) -> Result<Vec<Entry>> {
    let mut working = body.trim().to_string();
    let mut entries = Vec::new();

    for matcher in matchers {
        if working.trim().is_empty() {
            break;
        }
        let (found, spans) = matcher.scan(&working)?;
        if found.is_empty() {
            continue;
        }
        debug!(matcher = matcher.name(), count = found.len(), "consumed hint entries");
        entries.extend(found);
        working = splice_out(&working, &spans);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{ImportStyle, ModuleExport};
    use serde_json::json;

    fn keys(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(Entry::key).collect()
    }

    #[test]
    fn splice_out_removes_spans() {
        assert_eq!(splice_out("aa bb cc", &[0..2, 6..8]), " bb ");
        assert_eq!(splice_out("abc", &[]), "abc");
    }

    #[test]
    fn empty_body_has_no_entries() {
        assert!(tokenize("").unwrap().is_empty());
        assert!(tokenize("  \n\t ").unwrap().is_empty());
    }

    #[test]
    fn unary_tokens() {
        let entries = tokenize("header footer").unwrap();
        assert_eq!(
            entries,
            vec![
                Entry::UnaryFlag { key: "header".into() },
                Entry::UnaryFlag { key: "footer".into() },
            ]
        );
    }

    #[test]
    fn pairs_with_and_without_spaces() {
        assert_eq!(tokenize("key=value").unwrap(), tokenize("key = value").unwrap());
        assert_eq!(
            tokenize("key=value").unwrap(),
            vec![Entry::BareString { key: "key".into(), value: "value".into() }]
        );
    }

    #[test]
    fn quoted_value_keeps_internal_spaces() {
        let entries = tokenize(r#"key2="  some value 2 ""#).unwrap();
        assert_eq!(
            entries,
            vec![Entry::QuotedString { key: "key2".into(), value: "some value 2".into() }]
        );
    }

    #[test]
    fn json_runs_before_everything() {
        let entries = tokenize(r#"key=value key2="value" empty-json-array=[] key3="value""#).unwrap();
        assert_eq!(entries[0], Entry::Literal { key: "empty-json-array".into(), value: json!([]) });
        assert_eq!(entries.len(), 4);
    }

    #[test]
    fn json_spanning_lines() {
        let body = "simple-json-object =\n    {\n      \"foo\": \"bar\"\n    } \n    key=value";
        let entries = tokenize(body).unwrap();
        assert_eq!(keys(&entries), vec!["simple-json-object", "key"]);
        assert_eq!(
            entries[0],
            Entry::Literal { key: "simple-json-object".into(), value: json!({"foo": "bar"}) }
        );
    }

    #[test]
    fn json_paths_are_not_retokenized() {
        let body = r#"complex-json-array = [{"foo": {"bar": [1, 2, true]}}, {"some": "../folder"}] key=value"#;
        let entries = tokenize(body).unwrap();
        assert_eq!(keys(&entries), vec!["complex-json-array", "key"]);
    }

    #[test]
    fn malformed_json_fails_whole_call() {
        let err = tokenize("good=value bad={").unwrap_err();
        assert_eq!(err.code(), "HINT-010");
    }

    #[test]
    fn deferred_references_become_entries() {
        let body = "aa = @(require:./out/test.json) bb = @(import:@acme/test=>getJSON) cc=@(require:lib:jsonStr)";
        let entries = tokenize(body).unwrap();
        assert_eq!(keys(&entries), vec!["aa", "bb", "cc"]);
        match &entries[1] {
            Entry::DeferredModuleRef { reference, .. } => {
                assert_eq!(reference.style, ImportStyle::Import);
                assert_eq!(reference.module_name, "@acme/test");
                assert_eq!(reference.export, Some(ModuleExport::Function("getJSON".into())));
            }
            other => panic!("Expected DeferredModuleRef, got {other:?}"),
        }
    }

    #[test]
    fn bare_path_value() {
        let entries = tokenize("path=./../../some-_Path").unwrap();
        assert_eq!(
            entries,
            vec![Entry::BareString { key: "path".into(), value: "./../../some-_Path".into() }]
        );
    }

    #[test]
    fn single_char_tokens_are_ignored() {
        assert_eq!(keys(&tokenize("a bb c").unwrap()), vec!["bb"]);
    }

    #[test]
    fn custom_matcher_order_changes_result() {
        // Unary alone splits a quoted value into flags
        let unary = UnaryMatcher;
        let entries = tokenize_with(r#"key="some value""#, &[&unary]).unwrap();
        assert_eq!(keys(&entries), vec!["key", "some", "value"]);
    }

    #[test]
    fn entry_into_pair() {
        let (k, v) = Entry::UnaryFlag { key: "header".into() }.into_pair();
        assert_eq!(k, "header");
        assert_eq!(v, HintValue::Text("header".into()));
    }
}
