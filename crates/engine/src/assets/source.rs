use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::scene::SceneNode;

#[derive(Debug, Clone, Error)]
#[error("asset source failure for {path}: {message}")]
pub struct AssetSourceError {
    pub path: String,
    pub message: String,
}

impl AssetSourceError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Loader collaborator contract: `Ok(None)` means the path does not resolve
/// to an asset, `Err` means the loader itself failed.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn load(&self, path: &str) -> Result<Option<SceneNode>, AssetSourceError>;
}

/// In-memory source backed by a path → prototype map, for tests and wiring.
#[derive(Debug, Default)]
pub struct StaticAssetSource {
    templates: HashMap<String, SceneNode>,
    failures: HashSet<String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl StaticAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, path: impl Into<String>, root: SceneNode) -> Self {
        self.templates.insert(path.into(), root);
        self
    }

    pub fn with_failure(mut self, path: impl Into<String>) -> Self {
        self.failures.insert(path.into());
        self
    }

    pub fn load_count(&self, path: &str) -> usize {
        let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
        calls.get(path).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AssetSource for StaticAssetSource {
    async fn load(&self, path: &str) -> Result<Option<SceneNode>, AssetSourceError> {
        {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            *calls.entry(path.to_string()).or_insert(0) += 1;
        }
        if self.failures.contains(path) {
            return Err(AssetSourceError::new(path, "simulated source failure"));
        }
        Ok(self.templates.get(path).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_source_serves_registered_templates() {
        let source = StaticAssetSource::new().with_template("props/crate", SceneNode::new("crate"));

        let found = source.load("props/crate").await.expect("load");
        assert_eq!(found.expect("template").name, "crate");

        let missing = source.load("props/barrel").await.expect("load");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn failure_paths_error_and_calls_are_counted() {
        let source = StaticAssetSource::new().with_failure("props/cursed");

        assert!(source.load("props/cursed").await.is_err());
        assert!(source.load("props/cursed").await.is_err());
        assert_eq!(source.load_count("props/cursed"), 2);
        assert_eq!(source.load_count("props/crate"), 0);
    }
}
