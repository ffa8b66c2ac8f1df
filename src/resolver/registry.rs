//! In-process module registry - the default [`ModuleLoader`]
//!
//! Rust cannot import packages by name at runtime, so modules are registered up
//! front: JSON exports (usually from the config file) and named async functions.
//! JSON resources are read from disk relative to `base_dir`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use super::{ModuleExport, ModuleLoader, ModuleReference};
use crate::config::HintsConfig;
use crate::error::{HintError, Result};
use crate::jsonpath;

/// Async function exported by a module; errors are plain messages
pub type ModuleFunction =
    Arc<dyn Fn() -> BoxFuture<'static, std::result::Result<Value, String>> + Send + Sync>;

/// A registered module: JSON exports plus named functions
#[derive(Clone, Default)]
pub struct Module {
    exports: Value,
    functions: HashMap<String, ModuleFunction>,
}

impl Module {
    pub fn with_exports(exports: Value) -> Self {
        Self {
            exports,
            functions: HashMap::new(),
        }
    }

    pub fn exports(&self) -> &Value {
        &self.exports
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("exports", &self.exports)
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Thread-safe module table (lock-free reads)
#[derive(Debug)]
pub struct ModuleRegistry {
    base_dir: PathBuf,
    modules: DashMap<String, Module>,
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new(".")
    }
}

impl ModuleRegistry {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            modules: DashMap::new(),
        }
    }

    /// Registry seeded with the config's base dir and module exports
    pub fn from_config(config: &HintsConfig) -> Self {
        let registry = Self::new(config.base_dir());
        for (name, exports) in &config.modules {
            registry.register_exports(name.clone(), exports.clone());
        }
        registry
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Set (or replace) the JSON exports of a module
    pub fn register_exports(&self, module: impl Into<String>, exports: Value) {
        self.modules.entry(module.into()).or_default().exports = exports;
    }

    /// Add an async function to a module
    pub fn register_function<F, Fut>(&self, module: impl Into<String>, function: impl Into<String>, f: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, String>> + Send + 'static,
    {
        let func: ModuleFunction = Arc::new(move || f().boxed());
        self.modules
            .entry(module.into())
            .or_default()
            .functions
            .insert(function.into(), func);
    }

    pub fn contains(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    fn load_json_resource(&self, path: &str) -> Result<Value> {
        let full = self.base_dir.join(path);
        let content = std::fs::read_to_string(&full).map_err(|e| match e.kind() {
            ErrorKind::NotFound => HintError::ResourceNotFound {
                path: full.display().to_string(),
            },
            _ => HintError::Io(e),
        })?;
        serde_json::from_str(&content).map_err(|e| HintError::InvalidResource {
            path: full.display().to_string(),
            reason: e.to_string(),
        })
    }

    fn load_property(&self, module: &str, property: &str) -> Result<Value> {
        let entry = self.modules.get(module).ok_or_else(|| HintError::ModuleNotFound {
            module: module.to_string(),
        })?;
        jsonpath::resolve(&entry.exports, property)?.ok_or_else(|| HintError::ExportNotFound {
            module: module.to_string(),
            export: property.to_string(),
        })
    }

    fn function(&self, module: &str, function: &str) -> Result<ModuleFunction> {
        let entry = self.modules.get(module).ok_or_else(|| HintError::ModuleNotFound {
            module: module.to_string(),
        })?;
        entry
            .functions
            .get(function)
            .cloned()
            .ok_or_else(|| HintError::ExportNotFound {
                module: module.to_string(),
                export: function.to_string(),
            })
    }
}

#[async_trait]
impl ModuleLoader for ModuleRegistry {
    async fn load(&self, reference: &ModuleReference) -> Result<Value> {
        let module = reference.module_name.as_str();
        match &reference.export {
            None => self.load_json_resource(module),
            Some(ModuleExport::Property(property)) => self.load_property(module, property),
            Some(ModuleExport::Function(function)) => {
                // Registry guard is released before awaiting
                let func = self.function(module, function)?;
                func().await.map_err(|reason| HintError::FunctionFailed {
                    module: module.to_string(),
                    function: function.to_string(),
                    reason,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ImportStyle;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> ModuleRegistry {
        let registry = ModuleRegistry::default();
        registry.register_exports("@acme/test", json!({"jsonStr": {"prop": "jsonStr"}, "list": [{"name": "first"}]}));
        registry.register_function("@acme/test", "getJSON", || async { Ok(json!({"hello": "world"})) });
        registry.register_function("@acme/test", "broken", || async { Err("boom".to_string()) });
        registry
    }

    #[tokio::test]
    async fn loads_property() {
        let r = ModuleReference::property(ImportStyle::Import, "@acme/test", "jsonStr");
        assert_eq!(registry().load(&r).await.unwrap(), json!({"prop": "jsonStr"}));
    }

    #[tokio::test]
    async fn loads_nested_property_path() {
        let r = ModuleReference::property(ImportStyle::Import, "@acme/test", "list[0].name");
        assert_eq!(registry().load(&r).await.unwrap(), json!("first"));
    }

    #[tokio::test]
    async fn invokes_function() {
        let r = ModuleReference::function(ImportStyle::Import, "@acme/test", "getJSON");
        assert_eq!(registry().load(&r).await.unwrap(), json!({"hello": "world"}));
    }

    #[tokio::test]
    async fn function_failure_is_reported() {
        let r = ModuleReference::function(ImportStyle::Import, "@acme/test", "broken");
        let err = registry().load(&r).await.unwrap_err();
        assert!(matches!(err, HintError::FunctionFailed { reason, .. } if reason == "boom"));
    }

    #[tokio::test]
    async fn unknown_module_and_export() {
        let registry = registry();
        let r = ModuleReference::property(ImportStyle::Require, "@acme/other", "x");
        assert_eq!(registry.load(&r).await.unwrap_err().code(), "HINT-033");

        let r = ModuleReference::property(ImportStyle::Require, "@acme/test", "nope");
        assert_eq!(registry.load(&r).await.unwrap_err().code(), "HINT-034");

        let r = ModuleReference::function(ImportStyle::Require, "@acme/test", "nope");
        assert_eq!(registry.load(&r).await.unwrap_err().code(), "HINT-034");
    }

    #[tokio::test]
    async fn loads_json_resource_relative_to_base_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("test.json"), r#"{"a": [1, 2]}"#).unwrap();
        fs::write(dir.path().join("bad.json"), "{nope").unwrap();
        let registry = ModuleRegistry::new(dir.path());

        let ok = ModuleReference::json_resource(ImportStyle::Require, "./test.json");
        assert_eq!(registry.load(&ok).await.unwrap(), json!({"a": [1, 2]}));

        let missing = ModuleReference::json_resource(ImportStyle::Require, "missing.json");
        assert_eq!(registry.load(&missing).await.unwrap_err().code(), "HINT-031");

        let bad = ModuleReference::json_resource(ImportStyle::Require, "bad.json");
        assert_eq!(registry.load(&bad).await.unwrap_err().code(), "HINT-032");
    }

    #[test]
    fn from_config_registers_modules() {
        let config = HintsConfig::from_yaml("base_dir: /data\nmodules:\n  settings:\n    level: 3\n").unwrap();
        let registry = ModuleRegistry::from_config(&config);
        assert!(registry.contains("settings"));
        assert_eq!(registry.base_dir(), Path::new("/data"));
    }

    #[test]
    fn exports_and_functions_share_a_module() {
        let registry = registry();
        let module = registry.modules.get("@acme/test").unwrap();
        assert!(module.has_function("getJSON"));
        assert!(module.exports().get("jsonStr").is_some());
    }
}
