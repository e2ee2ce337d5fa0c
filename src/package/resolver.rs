//! Package tree resolution.
//!
//! Trees come from an external resolver. [`CachedResolver`] memoizes any
//! resolver by `(package, version)` so a version string resolves to the same
//! tree for the whole run, and optionally persists trees on disk.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::Result;

use super::tree::Package;

/// Source of package dependency trees.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TreeResolver: Send + Sync {
    /// Resolves the dependency tree of `package_id` at `version`.
    async fn resolve(&self, package_id: &str, version: &str) -> Result<Package>;
}

/// Memoizing wrapper around a [`TreeResolver`].
#[derive(Debug)]
pub struct CachedResolver<R> {
    /// Underlying resolver.
    inner: R,
    /// Trees resolved during this run.
    memory: Mutex<HashMap<(String, String), Package>>,
    /// Optional on-disk cache directory.
    disk_dir: Option<PathBuf>,
}

impl<R: TreeResolver> CachedResolver<R> {
    /// Wraps a resolver with an in-memory cache only.
    #[must_use]
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            memory: Mutex::new(HashMap::new()),
            disk_dir: None,
        }
    }

    /// Enables the on-disk cache under `dir`.
    #[must_use]
    pub fn with_disk_cache(mut self, dir: impl Into<PathBuf>) -> Self {
        self.disk_dir = Some(dir.into());
        self
    }

    /// Number of trees held in memory.
    #[must_use]
    pub fn cached_count(&self) -> usize {
        self.memory.lock().map_or(0, |m| m.len())
    }

    fn memory_get(&self, key: &(String, String)) -> Option<Package> {
        self.memory.lock().ok().and_then(|m| m.get(key).cloned())
    }

    fn memory_put(&self, key: (String, String), tree: Package) {
        if let Ok(mut m) = self.memory.lock() {
            m.insert(key, tree);
        }
    }

    async fn disk_get(&self, dir: &Path, package_id: &str, version: &str) -> Option<Package> {
        let path = cache_file(dir, package_id, version);
        let content = fs::read_to_string(&path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(tree) => {
                debug!("Loaded {package_id} {version} from {}", path.display());
                Some(tree)
            }
            Err(e) => {
                warn!("Ignoring corrupt tree cache entry {}: {e}", path.display());
                None
            }
        }
    }

    async fn disk_put(&self, dir: &Path, package_id: &str, version: &str, tree: &Package) {
        let path = cache_file(dir, package_id, version);
        let content = match serde_json::to_string(tree) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to serialize tree for cache: {e}");
                return;
            }
        };

        if let Err(e) = fs::create_dir_all(dir).await {
            warn!("Failed to create tree cache directory {}: {e}", dir.display());
            return;
        }

        if let Err(e) = fs::write(&path, content).await {
            warn!("Failed to write tree cache entry {}: {e}", path.display());
        }
    }
}

#[async_trait]
impl<R: TreeResolver> TreeResolver for CachedResolver<R> {
    async fn resolve(&self, package_id: &str, version: &str) -> Result<Package> {
        let key = (package_id.to_string(), version.to_string());

        if let Some(tree) = self.memory_get(&key) {
            debug!("Tree cache hit for {package_id} {version}");
            return Ok(tree);
        }

        if let Some(dir) = &self.disk_dir
            && let Some(tree) = self.disk_get(dir, package_id, version).await
        {
            self.memory_put(key, tree.clone());
            return Ok(tree);
        }

        info!("Collecting {package_id} package tree for version \"{version}\"...");
        let tree = self.inner.resolve(package_id, version).await?;

        if let Some(dir) = &self.disk_dir {
            self.disk_put(dir, package_id, version, &tree).await;
        }
        self.memory_put(key, tree.clone());

        Ok(tree)
    }
}

/// Path of the cache entry for a package version.
fn cache_file(dir: &Path, package_id: &str, version: &str) -> PathBuf {
    let mut hasher = Sha256::new();
    hasher.update(package_id.as_bytes());
    hasher.update(b"@");
    hasher.update(version.as_bytes());
    dir.join(format!("{}.json", hex::encode(hasher.finalize())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree(version: &str) -> Package {
        Package::new("Acme", version).with_dependencies(vec![Package::new("Acme.Core", version)])
    }

    #[tokio::test]
    async fn test_same_version_resolved_once() {
        let mut inner = MockTreeResolver::new();
        inner
            .expect_resolve()
            .times(1)
            .returning(|_, v| Ok(tree(v)));

        let resolver = CachedResolver::new(inner);
        let first = resolver.resolve("Acme", "14.1").await.expect("first resolve");
        let second = resolver.resolve("Acme", "14.1").await.expect("second resolve");

        assert_eq!(first, second);
        assert_eq!(resolver.cached_count(), 1);
    }

    #[tokio::test]
    async fn test_distinct_versions_resolved_separately() {
        let mut inner = MockTreeResolver::new();
        inner
            .expect_resolve()
            .times(2)
            .returning(|_, v| Ok(tree(v)));

        let resolver = CachedResolver::new(inner);
        let old = resolver.resolve("Acme", "13.3").await.expect("old");
        let new = resolver.resolve("Acme", "14.1").await.expect("new");

        assert_eq!(old.version, "13.3");
        assert_eq!(new.version, "14.1");
    }

    #[tokio::test]
    async fn test_disk_cache_survives_new_resolver() {
        let temp = TempDir::new().expect("temp dir");

        let mut inner = MockTreeResolver::new();
        inner.expect_resolve().times(1).returning(|_, v| Ok(tree(v)));
        let resolver = CachedResolver::new(inner).with_disk_cache(temp.path());
        resolver.resolve("Acme", "14.1").await.expect("resolve");

        let mut untouched = MockTreeResolver::new();
        untouched.expect_resolve().never();
        let reloaded = CachedResolver::new(untouched).with_disk_cache(temp.path());
        let cached = reloaded.resolve("Acme", "14.1").await.expect("cached");

        assert_eq!(cached, tree("14.1"));
    }

    #[test]
    fn test_cache_file_name_is_stable() {
        let dir = Path::new("/tmp/cache");
        assert_eq!(
            cache_file(dir, "Acme", "1.0"),
            cache_file(dir, "Acme", "1.0")
        );
        assert_ne!(
            cache_file(dir, "Acme", "1.0"),
            cache_file(dir, "Acme", "1.1")
        );
    }
}
