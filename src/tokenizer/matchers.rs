//! The six pattern classes, most specific first
//!
//! Keys follow `[a-z0-9]+(-[a-z0-9]+)*` with at least two characters. Every pair
//! pattern allows whitespace (including newlines) around `=`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{Entry, HintMatcher};
use crate::error::{HintError, Result};
use crate::resolver::{ImportStyle, ModuleReference};

/// Hint key, anchored on an ASCII word boundary
const KEY: &str = r"(?-u:\b)([a-z0-9]+(?:-[a-z0-9]+)+|[a-z0-9]{2,})";

fn pair_regex(value: &str) -> Regex {
    Regex::new(&format!(r"{KEY}\s*=\s*{value}")).unwrap()
}

/// Opening bracket through the last closing bracket or brace. A lone opening
/// bracket still matches, so it fails as malformed JSON instead of falling
/// through to the unary class.
static JSON_LITERAL_RE: Lazy<Regex> =
    Lazy::new(|| pair_regex(r"([\[{](?:[\s\S]*[}\]])?)"));

static JSON_RESOURCE_RE: Lazy<Regex> =
    Lazy::new(|| pair_regex(r"@\((require|import):([-a-zA-Z0-9 ./\\_]+\.json)\)"));

static QUOTED_RE: Lazy<Regex> = Lazy::new(|| pair_regex(r#""((?:[^"\\]|\\.)*)""#));

static BARE_RE: Lazy<Regex> = Lazy::new(|| pair_regex(r"([./\-_A-Za-z0-9]+)"));

static MODULE_EXPORT_RE: Lazy<Regex> = Lazy::new(|| {
    pair_regex(r#"@\((require|import):([-a-zA-Z0-9 @./\\_]+)(:|=>)([a-zA-Z0-9_.\[\]"']+)\)"#)
});

static UNARY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(KEY).unwrap());

fn import_style(caps: &Captures<'_>, group: usize) -> ImportStyle {
    match &caps[group] {
        "import" => ImportStyle::Import,
        _ => ImportStyle::Require,
    }
}

/// All six classes in precedence order
pub fn default_matchers() -> [&'static dyn HintMatcher; 6] {
    [
        &JsonLiteralMatcher,
        &JsonResourceMatcher,
        &QuotedMatcher,
        &BareMatcher,
        &ModuleExportMatcher,
        &UnaryMatcher,
    ]
}

/// `key = {...}` / `key = [...]`
pub struct JsonLiteralMatcher;

impl HintMatcher for JsonLiteralMatcher {
    fn name(&self) -> &'static str {
        "json-literal"
    }

    fn pattern(&self) -> &Regex {
        &JSON_LITERAL_RE
    }

    fn entry(&self, caps: &Captures<'_>) -> Result<Entry> {
        let key = &caps[1];
        let raw = caps[2].trim();
        let value = serde_json::from_str(raw).map_err(|e| HintError::MalformedJsonHint {
            key: key.to_string(),
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Entry::Literal {
            key: key.to_string(),
            value,
        })
    }
}

/// `key = @(require:./relative/file.json)`
pub struct JsonResourceMatcher;

impl HintMatcher for JsonResourceMatcher {
    fn name(&self) -> &'static str {
        "json-resource"
    }

    fn pattern(&self) -> &Regex {
        &JSON_RESOURCE_RE
    }

    fn entry(&self, caps: &Captures<'_>) -> Result<Entry> {
        Ok(Entry::DeferredModuleRef {
            key: caps[1].to_string(),
            reference: ModuleReference::json_resource(import_style(caps, 2), caps[3].trim()),
        })
    }
}

/// `key = "text with spaces"`
pub struct QuotedMatcher;

impl HintMatcher for QuotedMatcher {
    fn name(&self) -> &'static str {
        "quoted"
    }

    fn pattern(&self) -> &Regex {
        &QUOTED_RE
    }

    fn entry(&self, caps: &Captures<'_>) -> Result<Entry> {
        Ok(Entry::QuotedString {
            key: caps[1].to_string(),
            value: caps[2].trim().replace("\\\"", "\""),
        })
    }
}

/// `key = ./some/path-or_identifier`
pub struct BareMatcher;

impl HintMatcher for BareMatcher {
    fn name(&self) -> &'static str {
        "bare"
    }

    fn pattern(&self) -> &Regex {
        &BARE_RE
    }

    fn entry(&self, caps: &Captures<'_>) -> Result<Entry> {
        Ok(Entry::BareString {
            key: caps[1].to_string(),
            value: caps[2].to_string(),
        })
    }
}

/// `key = @(import:module:property)` / `key = @(require:module=>function)`
pub struct ModuleExportMatcher;

impl HintMatcher for ModuleExportMatcher {
    fn name(&self) -> &'static str {
        "module-export"
    }

    fn pattern(&self) -> &Regex {
        &MODULE_EXPORT_RE
    }

    fn entry(&self, caps: &Captures<'_>) -> Result<Entry> {
        let style = import_style(caps, 2);
        let module = caps[3].trim();
        let target = caps[5].trim();
        let reference = if &caps[4] == "=>" {
            ModuleReference::function(style, module, target)
        } else {
            ModuleReference::property(style, module, target)
        };
        Ok(Entry::DeferredModuleRef {
            key: caps[1].to_string(),
            reference,
        })
    }
}

/// Any remaining bare key
pub struct UnaryMatcher;

impl HintMatcher for UnaryMatcher {
    fn name(&self) -> &'static str {
        "unary"
    }

    fn pattern(&self) -> &Regex {
        &UNARY_RE
    }

    fn entry(&self, caps: &Captures<'_>) -> Result<Entry> {
        Ok(Entry::UnaryFlag {
            key: caps[1].to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ModuleExport;
    use serde_json::json;

    fn only(matcher: &dyn HintMatcher, text: &str) -> Vec<Entry> {
        matcher.scan(text).unwrap().0
    }

    #[test]
    fn json_literal_takes_outermost_close() {
        let entries = only(&JsonLiteralMatcher, r#"cfg = {"a": {"b": [1, 2]}} tail"#);
        assert_eq!(
            entries,
            vec![Entry::Literal { key: "cfg".into(), value: json!({"a": {"b": [1, 2]}}) }]
        );
    }

    #[test]
    fn json_literal_followed_by_plain_text() {
        let (entries, spans) = JsonLiteralMatcher.scan(r#"aa={"b": 1} tail"#).unwrap();
        assert_eq!(entries, vec![Entry::Literal { key: "aa".into(), value: json!({"b": 1}) }]);
        assert_eq!(spans, vec![0..11]);

        let entries = only(&JsonLiteralMatcher, "list = [1, 2] key=value");
        assert_eq!(entries, vec![Entry::Literal { key: "list".into(), value: json!([1, 2]) }]);
    }

    #[test]
    fn json_literal_back_to_back_values_are_one_capture() {
        let err = JsonLiteralMatcher.scan("aa=[1] bb=[2]").unwrap_err();
        assert!(matches!(err, HintError::MalformedJsonHint { key, .. } if key == "aa"));
    }

    #[test]
    fn json_literal_unclosed_is_malformed() {
        let err = JsonLiteralMatcher.scan("bad={").unwrap_err();
        assert!(matches!(err, HintError::MalformedJsonHint { raw, .. } if raw == "{"));
    }

    #[test]
    fn json_literal_ignores_plain_pairs() {
        assert!(only(&JsonLiteralMatcher, "key=value other").is_empty());
    }

    #[test]
    fn json_resource_reference() {
        let entries = only(&JsonResourceMatcher, "json = @(require:./out/test/test.json)");
        assert_eq!(
            entries,
            vec![Entry::DeferredModuleRef {
                key: "json".into(),
                reference: ModuleReference::json_resource(ImportStyle::Require, "./out/test/test.json"),
            }]
        );
    }

    #[test]
    fn json_resource_requires_json_extension() {
        assert!(only(&JsonResourceMatcher, "json = @(require:./out/test.yaml)").is_empty());
    }

    #[test]
    fn quoted_span_includes_quotes() {
        let (entries, spans) = QuotedMatcher.scan(r#"x key = "a b" y"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(spans, vec![2..13]);
    }

    #[test]
    fn quoted_unescapes_inner_quotes() {
        let entries = only(&QuotedMatcher, r#"say="he said \"hi\"""#);
        assert_eq!(
            entries,
            vec![Entry::QuotedString { key: "say".into(), value: r#"he said "hi""#.into() }]
        );
    }

    #[test]
    fn bare_stops_at_whitespace() {
        let entries = only(&BareMatcher, "key=value key-type=value2");
        assert_eq!(
            entries,
            vec![
                Entry::BareString { key: "key".into(), value: "value".into() },
                Entry::BareString { key: "key-type".into(), value: "value2".into() },
            ]
        );
    }

    #[test]
    fn bare_does_not_claim_module_references() {
        assert!(only(&BareMatcher, "json = @(import:@acme/test=>getJSON)").is_empty());
    }

    #[test]
    fn module_property_reference() {
        let entries = only(&ModuleExportMatcher, "json = @(import:@acme/test:jsonStr)");
        match &entries[..] {
            [Entry::DeferredModuleRef { key, reference }] => {
                assert_eq!(key, "json");
                assert_eq!(reference.style, ImportStyle::Import);
                assert_eq!(reference.module_name, "@acme/test");
                assert_eq!(reference.export, Some(ModuleExport::Property("jsonStr".into())));
            }
            other => panic!("Expected one DeferredModuleRef, got {other:?}"),
        }
    }

    #[test]
    fn module_function_reference() {
        let entries = only(&ModuleExportMatcher, "json=@(require:lib/util=>build)");
        match &entries[..] {
            [Entry::DeferredModuleRef { reference, .. }] => {
                assert_eq!(reference.style, ImportStyle::Require);
                assert_eq!(reference.export, Some(ModuleExport::Function("build".into())));
            }
            other => panic!("Expected one DeferredModuleRef, got {other:?}"),
        }
    }

    #[test]
    fn unary_requires_two_chars_and_word_boundary() {
        let keys: Vec<String> = only(&UnaryMatcher, "a header Upper some-flag")
            .into_iter()
            .map(|e| e.key().to_string())
            .collect();
        assert_eq!(keys, vec!["header", "some-flag"]);
    }
}
