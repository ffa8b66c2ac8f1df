//! Hintline - `<<prefix key=value>>` hint directives
//!
//! ```text
//! text ─► directive::locate ─► body ─► tokenizer ─► HintMap ─► resolver ─► initialized map
//!                           └─► remaining text
//! ```

pub mod config;
pub mod directive;
pub mod error;
pub mod hints;
pub mod jsonpath;
pub mod parse;
pub mod resolver;
pub mod tokenizer;

pub use config::{Enclosure, HintsConfig};
pub use error::{FixSuggestion, HintError, LoadFailure, Result};
pub use hints::{merge_into, HintMap, HintValue, HintsOutcome, PendingHints, ResolutionState};
pub use parse::{consume_hints, parse_and_resolve_hints, parse_hints, peek_and_resolve_hints, peek_hints};
pub use resolver::{ImportStyle, ModuleExport, ModuleLoader, ModuleReference, ModuleRegistry, ModuleResolver};
pub use tokenizer::{tokenize, Entry, HintMatcher};
