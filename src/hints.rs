//! # Hint Maps
//!
//! A [`HintMap`] owns the key/value pairs of one directive body and tracks its
//! resolution state:
//!
//! ```text
//! new(body) ──load()──► Loaded { pending: N } ──barrier──► Initialized
//!  Unloaded              │ N == 0: barrier runs inline ───────▲
//! ```
//!
//! Deferred entries hold a [`HintValue::Pending`] placeholder until the resolver
//! reports back. Every accessor checks readiness first, so a partially resolved
//! map can never be read.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::directive::validate_prefix;
use crate::error::{HintError, LoadFailure, Result};
use crate::resolver::{DedupToken, ModuleLoader, ModuleReference, ModuleResolver};
use crate::tokenizer::tokenize;

/// Key under which the directive prefix is stored once initialized
pub const PREFIX_KEY: &str = "prefix";

// ============================================================================
// VALUES & STATE
// ============================================================================

/// Value stored under a hint key
#[derive(Debug, Clone, PartialEq)]
pub enum HintValue {
    /// Quoted, bare or unary value
    Text(String),
    /// JSON literal or loaded module value
    Json(Value),
    /// Deferred reference awaiting its load
    Pending(ModuleReference),
}

impl HintValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HintValue::Text(s) => Some(s),
            HintValue::Json(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            HintValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, HintValue::Pending(_))
    }

    /// JSON view; placeholders render as their reference syntax
    pub fn to_json(&self) -> Value {
        match self {
            HintValue::Text(s) => Value::String(s.clone()),
            HintValue::Json(v) => v.clone(),
            HintValue::Pending(reference) => Value::String(reference.to_string()),
        }
    }
}

impl From<&str> for HintValue {
    fn from(s: &str) -> Self {
        HintValue::Text(s.to_string())
    }
}

impl From<String> for HintValue {
    fn from(s: String) -> Self {
        HintValue::Text(s)
    }
}

impl From<Value> for HintValue {
    fn from(v: Value) -> Self {
        HintValue::Json(v)
    }
}

/// Where a map is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unloaded,
    Loaded { pending: usize },
    Initialized,
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionState::Unloaded => write!(f, "unloaded"),
            ResolutionState::Loaded { pending } => write!(f, "loaded ({pending} pending)"),
            ResolutionState::Initialized => write!(f, "initialized"),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<String, HintValue>,
    loaded: bool,
    initialized: bool,
    pending: usize,
    failed: Vec<String>,
}

impl Inner {
    fn state(&self) -> ResolutionState {
        if self.initialized {
            ResolutionState::Initialized
        } else if self.loaded {
            ResolutionState::Loaded {
                pending: self.pending,
            }
        } else {
            ResolutionState::Unloaded
        }
    }

    fn check_init(&self) -> Result<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(HintError::UninitializedAccess { state: self.state() })
        }
    }
}

/// Flip to initialized and record the prefix entries
fn finalize(inner: &Mutex<Inner>, prefix: &str, all_succeeded: bool) {
    let mut inner = inner.lock();
    if !prefix.is_empty() {
        inner
            .entries
            .insert(prefix.to_string(), HintValue::Text(prefix.to_string()));
        inner
            .entries
            .insert(PREFIX_KEY.to_string(), HintValue::Text(prefix.to_string()));
    }
    inner.pending = 0;
    inner.loaded = true;
    inner.initialized = true;
    debug!(prefix, all_succeeded, entries = inner.entries.len(), "hints initialized");
}

// ============================================================================
// HINT MAP
// ============================================================================

/// Key/value hints parsed from one directive body
pub struct HintMap {
    body: String,
    token: DedupToken,
    inner: Arc<Mutex<Inner>>,
}

impl HintMap {
    /// Create an unloaded map over `body` (trimmed)
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into().trim().to_string(),
            token: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn dedup_token(&self) -> DedupToken {
        self.token
    }

    pub fn state(&self) -> ResolutionState {
        self.inner.lock().state()
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.lock().loaded
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.lock().initialized
    }

    /// Keys whose deferred load failed; empty until initialized
    pub fn failed_keys(&self) -> Vec<String> {
        self.inner.lock().failed.clone()
    }

    /// Tokenize the body and register deferred loads with `resolver`
    ///
    /// Runs once; later calls are no-ops. Structural errors leave the map empty.
    /// Without deferred loads the map is initialized before this returns,
    /// otherwise when `resolver` runs the barrier for this map's token.
    pub fn load(&self, resolver: &mut ModuleResolver, prefix: &str) -> Result<()> {
        if self.is_loaded() {
            return Ok(());
        }

        let entries = match validate_prefix(&self.body, prefix).and_then(|_| tokenize(&self.body)) {
            Ok(entries) => entries,
            Err(e) => {
                self.inner.lock().loaded = true;
                return Err(e);
            }
        };

        let mut pending = 0;
        {
            let mut inner = self.inner.lock();
            for entry in entries {
                let (key, value) = entry.into_pair();
                if let HintValue::Pending(reference) = &value {
                    let handle = Arc::clone(&self.inner);
                    let slot = key.clone();
                    resolver.register_load(
                        key.clone(),
                        reference.clone(),
                        self.token,
                        Box::new(move |result| {
                            let mut inner = handle.lock();
                            inner.pending = inner.pending.saturating_sub(1);
                            match result {
                                Ok(value) => {
                                    inner.entries.insert(slot, HintValue::Json(value));
                                }
                                Err(reason) => {
                                    debug!(key = %slot, %reason, "deferred hint failed");
                                    inner.entries.remove(&slot);
                                    inner.failed.push(slot);
                                }
                            }
                        }),
                    );
                    pending += 1;
                }
                inner.entries.insert(key, value);
            }
            inner.loaded = true;
            inner.pending = pending;
        }

        if resolver.has_pending_for(self.token) {
            let handle = Arc::clone(&self.inner);
            let prefix = prefix.to_string();
            resolver.register_barrier(
                self.token,
                Box::new(move |all_succeeded| finalize(&handle, &prefix, all_succeeded)),
            );
        } else {
            finalize(&self.inner, prefix, true);
        }
        Ok(())
    }

    /// Load with a private resolver and hand back the map or a future of it
    pub fn load_and_resolve(self, prefix: &str, loader: Arc<dyn ModuleLoader>) -> Result<HintsOutcome> {
        let mut resolver = ModuleResolver::new(loader);
        self.load(&mut resolver, prefix)?;
        if resolver.has_pending_work() {
            Ok(HintsOutcome::Pending(PendingHints::new(self, resolver)))
        } else {
            Ok(HintsOutcome::Ready(self))
        }
    }

    // ------------------------------------------------------------------------
    // Guarded accessors
    // ------------------------------------------------------------------------

    pub fn get(&self, key: &str) -> Result<Option<HintValue>> {
        let inner = self.inner.lock();
        inner.check_init()?;
        Ok(inner.entries.get(key).cloned())
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<HintValue>) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_init()?;
        inner.entries.insert(key.into(), value.into());
        Ok(())
    }

    pub fn has(&self, key: &str) -> Result<bool> {
        let inner = self.inner.lock();
        inner.check_init()?;
        Ok(inner.entries.contains_key(key))
    }

    /// Remove `key`, returning whether it was present
    pub fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.lock();
        inner.check_init()?;
        Ok(inner.entries.remove(key).is_some())
    }

    pub fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        inner.check_init()?;
        inner.entries.clear();
        Ok(())
    }

    pub fn len(&self) -> Result<usize> {
        let inner = self.inner.lock();
        inner.check_init()?;
        Ok(inner.entries.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Sorted keys
    pub fn keys(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock();
        inner.check_init()?;
        let mut keys: Vec<String> = inner.entries.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    /// All entries as a JSON object
    pub fn to_json(&self) -> Result<Value> {
        let inner = self.inner.lock();
        inner.check_init()?;
        let object: Map<String, Value> = inner
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        Ok(Value::Object(object))
    }

    /// Merge `source` into this map, see [`merge_into`]
    pub fn merge_from(&self, source: &HintMap, replace: bool) -> Result<()> {
        merge_into(source, self, replace)
    }
}

impl TryFrom<Option<&str>> for HintMap {
    type Error = HintError;

    fn try_from(body: Option<&str>) -> Result<Self> {
        body.map(HintMap::new).ok_or(HintError::UndefinedHintBody)
    }
}

impl fmt::Debug for HintMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("HintMap")
            .field("body", &self.body)
            .field("token", &self.token)
            .field("state", &inner.state())
            .field("entries", &inner.entries)
            .finish()
    }
}

/// Copy every entry of `source` into `target`
///
/// Existing keys in `target` are overwritten only when `replace` is set. Both
/// maps must be initialized.
pub fn merge_into(source: &HintMap, target: &HintMap, replace: bool) -> Result<()> {
    let entries = {
        let inner = source.inner.lock();
        inner.check_init()?;
        inner.entries.clone()
    };

    if Arc::ptr_eq(&source.inner, &target.inner) {
        return Ok(());
    }

    let mut inner = target.inner.lock();
    inner.check_init()?;
    for (key, value) in entries {
        if replace || !inner.entries.contains_key(&key) {
            inner.entries.insert(key, value);
        }
    }
    Ok(())
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// A map that is ready now, or one still waiting on deferred loads
#[derive(Debug)]
pub enum HintsOutcome {
    Ready(HintMap),
    Pending(PendingHints),
}

impl HintsOutcome {
    pub fn is_pending(&self) -> bool {
        matches!(self, HintsOutcome::Pending(_))
    }

    /// Wait for the map, failing if any deferred load failed
    pub async fn into_map(self) -> Result<HintMap> {
        match self {
            HintsOutcome::Ready(map) => Ok(map),
            HintsOutcome::Pending(pending) => pending.await,
        }
    }
}

/// Future of a map whose deferred loads are still running
///
/// Awaiting it yields the initialized map, or [`HintError::ModuleLoad`] listing
/// every failed load. [`PendingHints::settle`] returns the map and the failures
/// together instead.
pub struct PendingHints {
    future: BoxFuture<'static, (HintMap, Vec<LoadFailure>)>,
}

impl PendingHints {
    fn new(map: HintMap, mut resolver: ModuleResolver) -> Self {
        let token = map.dedup_token();
        let future = async move {
            let outcomes = resolver.resolve().await;
            let failures: Vec<LoadFailure> = outcomes
                .into_iter()
                .filter(|o| o.token == token)
                .filter_map(|o| o.error.map(|error| LoadFailure { key: o.key, error }))
                .collect();
            (map, failures)
        };
        Self {
            future: future.boxed(),
        }
    }

    /// Run the loads; the map is initialized even when some failed
    pub async fn settle(self) -> (HintMap, Vec<LoadFailure>) {
        self.future.await
    }
}

impl Future for PendingHints {
    type Output = Result<HintMap>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.future.poll_unpin(cx).map(|(map, failures)| {
            if failures.is_empty() {
                Ok(map)
            } else {
                warn!(failed = failures.len(), body = map.body(), "errors resolving modules");
                Err(HintError::ModuleLoad { failures })
            }
        })
    }
}

impl fmt::Debug for PendingHints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingHints").finish_non_exhaustive()
    }
}
