//! Loader seam for deferred hint values

use async_trait::async_trait;
use serde_json::Value;

use super::ModuleReference;
use crate::error::Result;

/// Fetches the value behind a [`ModuleReference`]
///
/// Implementations own their timeout and retry policy; the resolver waits for
/// every load to finish or fail.
#[async_trait]
pub trait ModuleLoader: Send + Sync {
    async fn load(&self, reference: &ModuleReference) -> Result<Value>;
}
