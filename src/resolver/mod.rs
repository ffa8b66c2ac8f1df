//! # Deferred Loader Bridge
//!
//! Hint entries such as `json = @(require:./data.json)` or
//! `cfg = @(import:@acme/settings:jsonStr)` cannot be resolved while tokenizing.
//! They are registered with a [`ModuleResolver`], which later runs every load
//! through a [`ModuleLoader`] and reports back through closures.
//!
//! ```text
//! HintMap::load ──register_load(ref, on_complete, token)──► ModuleResolver
//!               ──register_barrier(token, on_all_complete)─►     │
//!                                                                ▼
//!                                             resolve(): join_all(loader.load)
//!                                                                │
//!                          on_complete(value | error) per load ◄─┤
//!                          on_all_complete(ok) once per token  ◄─┘
//! ```
//!
//! Every registration made by one hint map shares that map's dedup token, so the
//! barrier for the map fires exactly once however many loads were pending.

mod loader;
mod registry;

pub use loader::ModuleLoader;
pub use registry::{Module, ModuleFunction, ModuleRegistry};

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use uuid::Uuid;

use crate::error::HintError;

/// Identifier grouping all registrations made by one hint map
pub type DedupToken = Uuid;

/// Called once per load with the loaded value or the failure message
pub type CompletionFn = Box<dyn FnOnce(std::result::Result<Value, String>) + Send>;

/// Called once per dedup token after all of its loads finished
pub type BarrierFn = Box<dyn FnOnce(bool) + Send>;

// ============================================================================
// MODULE REFERENCES
// ============================================================================

/// `require` or `import` as written in the directive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportStyle {
    Require,
    Import,
}

impl ImportStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStyle::Require => "require",
            ImportStyle::Import => "import",
        }
    }
}

/// What to extract from a module once loaded
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ModuleExport {
    /// `module:property` - read a (possibly nested) property
    Property(String),
    /// `module=>function` - invoke a function and use its result
    Function(String),
}

/// Descriptor of one deferred load
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleReference {
    pub style: ImportStyle,
    /// Module name, or the relative path of a JSON resource
    pub module_name: String,
    /// `None` for JSON resources
    pub export: Option<ModuleExport>,
}

impl ModuleReference {
    pub fn json_resource(style: ImportStyle, path: impl Into<String>) -> Self {
        Self {
            style,
            module_name: path.into(),
            export: None,
        }
    }

    pub fn property(style: ImportStyle, module: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            style,
            module_name: module.into(),
            export: Some(ModuleExport::Property(property.into())),
        }
    }

    pub fn function(style: ImportStyle, module: impl Into<String>, function: impl Into<String>) -> Self {
        Self {
            style,
            module_name: module.into(),
            export: Some(ModuleExport::Function(function.into())),
        }
    }

    pub fn is_json_resource(&self) -> bool {
        self.export.is_none()
    }
}

impl fmt::Display for ModuleReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@({}:{}", self.style.as_str(), self.module_name)?;
        match &self.export {
            None => {}
            Some(ModuleExport::Property(p)) => write!(f, ":{p}")?,
            Some(ModuleExport::Function(func)) => write!(f, "=>{func}")?,
        }
        write!(f, ")")
    }
}

// ============================================================================
// RESOLVER
// ============================================================================

/// Result of one registered load after [`ModuleResolver::resolve`]
#[derive(Debug)]
pub struct LoadOutcome {
    /// Hint key the load was registered for
    pub key: String,
    pub token: DedupToken,
    pub reference: ModuleReference,
    pub error: Option<HintError>,
}

impl LoadOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// True if any outcome carries an error
pub fn outcomes_have_errors(outcomes: &[LoadOutcome]) -> bool {
    outcomes.iter().any(|o| !o.is_success())
}

struct PendingLoad {
    key: String,
    token: DedupToken,
    reference: ModuleReference,
    on_complete: CompletionFn,
}

/// Collects deferred loads and completion barriers, then runs them together
pub struct ModuleResolver {
    loader: Arc<dyn ModuleLoader>,
    loads: Vec<PendingLoad>,
    barriers: Vec<(DedupToken, BarrierFn)>,
}

impl ModuleResolver {
    pub fn new(loader: Arc<dyn ModuleLoader>) -> Self {
        Self {
            loader,
            loads: Vec::new(),
            barriers: Vec::new(),
        }
    }

    /// Schedule a load; `on_complete` runs exactly once during [`Self::resolve`]
    pub fn register_load(
        &mut self,
        key: impl Into<String>,
        reference: ModuleReference,
        token: DedupToken,
        on_complete: CompletionFn,
    ) {
        self.loads.push(PendingLoad {
            key: key.into(),
            token,
            reference,
            on_complete,
        });
    }

    /// Register the completion barrier for `token`
    ///
    /// Only the first barrier per token is kept.
    pub fn register_barrier(&mut self, token: DedupToken, on_all_complete: BarrierFn) {
        if self.barriers.iter().any(|(t, _)| *t == token) {
            return;
        }
        self.barriers.push((token, on_all_complete));
    }

    pub fn has_pending_work(&self) -> bool {
        !self.loads.is_empty()
    }

    pub fn has_pending_for(&self, token: DedupToken) -> bool {
        self.loads.iter().any(|l| l.token == token)
    }

    /// Number of loads still registered for `token`
    pub fn pending_count(&self, token: DedupToken) -> usize {
        self.loads.iter().filter(|l| l.token == token).count()
    }

    /// Drop every pending load and barrier without running them
    pub fn clear(&mut self) {
        self.loads.clear();
        self.barriers.clear();
    }

    /// Run all pending loads concurrently, then fire the barriers
    ///
    /// Failed loads never stop the others; each barrier learns whether all loads
    /// sharing its token succeeded.
    pub async fn resolve(&mut self) -> Vec<LoadOutcome> {
        let loads = std::mem::take(&mut self.loads);
        let barriers = std::mem::take(&mut self.barriers);
        let loader = Arc::clone(&self.loader);

        let pending: Vec<_> = loads.iter().map(|l| loader.load(&l.reference)).collect();
        let results = join_all(pending).await;

        let mut succeeded: HashMap<DedupToken, bool> = HashMap::new();
        let mut outcomes = Vec::with_capacity(loads.len());

        for (load, result) in loads.into_iter().zip(results) {
            let PendingLoad {
                key,
                token,
                reference,
                on_complete,
            } = load;

            let error = match result {
                Ok(value) => {
                    on_complete(Ok(value));
                    None
                }
                Err(e) => {
                    on_complete(Err(e.to_string()));
                    Some(e)
                }
            };

            let ok = succeeded.entry(token).or_insert(true);
            *ok &= error.is_none();

            outcomes.push(LoadOutcome {
                key,
                token,
                reference,
                error,
            });
        }

        for (token, on_all_complete) in barriers {
            let all_succeeded = succeeded.get(&token).copied().unwrap_or(true);
            tracing::debug!(%token, all_succeeded, "completion barrier");
            on_all_complete(all_succeeded);
        }

        outcomes
    }
}

impl fmt::Debug for ModuleResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleResolver")
            .field("loads", &self.loads.len())
            .field("barriers", &self.barriers.len())
            .finish()
    }
}
