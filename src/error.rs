//! Hint error types with error codes
//!
//! Error code ranges:
//! - HINT-000-009: Directive errors (prefix, body)
//! - HINT-010-019: Tokenizer errors
//! - HINT-020-029: Resolution state errors
//! - HINT-030-039: Deferred load errors
//! - HINT-040-049: Config/IO errors
//!
//! Structural errors (prefix, JSON) are raised synchronously. Load errors are
//! collected per entry and surfaced once, in aggregate, through [`HintError::ModuleLoad`].

use thiserror::Error;

use crate::hints::ResolutionState;

pub type Result<T> = std::result::Result<T, HintError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// One failed deferred load, keyed by the hint that requested it
#[derive(Debug)]
pub struct LoadFailure {
    /// Hint key whose value could not be loaded
    pub key: String,
    /// Underlying cause
    pub error: HintError,
}

fn format_load_failures(failures: &[LoadFailure]) -> String {
    if failures.is_empty() {
        return "no failures".to_string();
    }
    failures
        .iter()
        .map(|f| format!("{}: {}", f.key, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum HintError {
    // ═══════════════════════════════════════════
    // DIRECTIVE ERRORS (000-009)
    // ═══════════════════════════════════════════
    #[error("[HINT-001] Invalid prefix '{prefix}' near '{near}': use lower case letters, digits or '-', not at the start or end, at least 2 characters")]
    InvalidPrefix { prefix: String, near: String },

    #[error("[HINT-002] Undefined hint body")]
    UndefinedHintBody,

    // ═══════════════════════════════════════════
    // TOKENIZER ERRORS (010-019)
    // ═══════════════════════════════════════════
    #[error("[HINT-010] Cannot parse JSON hint '{key}' from '{raw}': {reason}")]
    MalformedJsonHint {
        key: String,
        raw: String,
        reason: String,
    },

    // ═══════════════════════════════════════════
    // RESOLUTION STATE ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[HINT-020] Uninitialized hints accessed while {state}; wait for the pending hints to settle")]
    UninitializedAccess { state: ResolutionState },

    // ═══════════════════════════════════════════
    // DEFERRED LOAD ERRORS (030-039)
    // ═══════════════════════════════════════════
    #[error("[HINT-030] Errors resolving modules ({} failed): {}", .failures.len(), format_load_failures(.failures))]
    ModuleLoad { failures: Vec<LoadFailure> },

    #[error("[HINT-031] JSON resource not found: {path}")]
    ResourceNotFound { path: String },

    #[error("[HINT-032] Invalid JSON resource '{path}': {reason}")]
    InvalidResource { path: String, reason: String },

    #[error("[HINT-033] Module '{module}' is not registered")]
    ModuleNotFound { module: String },

    #[error("[HINT-034] Module '{module}' has no export '{export}'")]
    ExportNotFound { module: String, export: String },

    #[error("[HINT-035] Function '{function}' of module '{module}' failed: {reason}")]
    FunctionFailed {
        module: String,
        function: String,
        reason: String,
    },

    #[error("[HINT-036] Invalid property path '{path}' (use a.b, a[0] or a[\"key\"])")]
    InvalidPropertyPath { path: String },

    // ═══════════════════════════════════════════
    // CONFIG / IO ERRORS (040-049)
    // ═══════════════════════════════════════════
    #[error("[HINT-040] Configuration error: {reason}")]
    Config { reason: String },

    #[error("[HINT-041] IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("[HINT-042] YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HintError {
    /// Get the error code (e.g., "HINT-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPrefix { .. } => "HINT-001",
            Self::UndefinedHintBody => "HINT-002",
            Self::MalformedJsonHint { .. } => "HINT-010",
            Self::UninitializedAccess { .. } => "HINT-020",
            Self::ModuleLoad { .. } => "HINT-030",
            Self::ResourceNotFound { .. } => "HINT-031",
            Self::InvalidResource { .. } => "HINT-032",
            Self::ModuleNotFound { .. } => "HINT-033",
            Self::ExportNotFound { .. } => "HINT-034",
            Self::FunctionFailed { .. } => "HINT-035",
            Self::InvalidPropertyPath { .. } => "HINT-036",
            Self::Config { .. } => "HINT-040",
            Self::Io(_) => "HINT-041",
            Self::Yaml(_) => "HINT-042",
        }
    }

    /// Structural errors abort a parse; load errors only flag the settled map
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Self::ModuleLoad { .. }
                | Self::ResourceNotFound { .. }
                | Self::InvalidResource { .. }
                | Self::ModuleNotFound { .. }
                | Self::ExportNotFound { .. }
                | Self::FunctionFailed { .. }
                | Self::InvalidPropertyPath { .. }
        )
    }
}

impl FixSuggestion for HintError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::InvalidPrefix { .. } => Some("Use a prefix like 're' or 'some-prefix'"),
            Self::UndefinedHintBody => None,
            Self::MalformedJsonHint { .. } => {
                Some("Check the JSON value; only one JSON value per directive is reliably captured")
            }
            Self::UninitializedAccess { .. } => {
                Some("Await the pending hints before reading them")
            }
            Self::ModuleLoad { .. } => Some("Check each failing reference listed above"),
            Self::ResourceNotFound { .. } => Some("Paths are relative to the configured base_dir"),
            Self::InvalidResource { .. } => Some("Ensure the file contains valid JSON (try jq)"),
            Self::ModuleNotFound { .. } => {
                Some("Declare the module under 'modules:' in the config file")
            }
            Self::ExportNotFound { .. } => Some("Check the property path or function name"),
            Self::FunctionFailed { .. } => None,
            Self::InvalidPropertyPath { .. } => Some("Use a property path like jsonStr or items[0].name"),
            Self::Config { .. } | Self::Yaml(_) => Some("Check the YAML config syntax"),
            Self::Io(_) => Some("Check file path and permissions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_appear_in_messages() {
        let err = HintError::InvalidPrefix {
            prefix: "-x".to_string(),
            near: "<<-x>>".to_string(),
        };
        assert_eq!(err.code(), "HINT-001");
        assert!(err.to_string().contains("[HINT-001]"));
    }

    #[test]
    fn module_load_lists_failures() {
        let err = HintError::ModuleLoad {
            failures: vec![
                LoadFailure {
                    key: "json".to_string(),
                    error: HintError::ResourceNotFound {
                        path: "missing.json".to_string(),
                    },
                },
                LoadFailure {
                    key: "cfg".to_string(),
                    error: HintError::ModuleNotFound {
                        module: "nope".to_string(),
                    },
                },
            ],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 failed"));
        assert!(msg.contains("json: [HINT-031]"));
        assert!(msg.contains("cfg: [HINT-033]"));
        assert!(err.is_load_error());
    }

    #[test]
    fn structural_errors_are_not_load_errors() {
        let err = HintError::MalformedJsonHint {
            key: "bad".to_string(),
            raw: "{".to_string(),
            reason: "EOF".to_string(),
        };
        assert!(!err.is_load_error());
        assert!(err.fix_suggestion().is_some());
    }
}
