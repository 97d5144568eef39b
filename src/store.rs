//! Persistence of tracked packages, keyed by package name.
//!
//! ## File layout
//!
//! ```text
//! packages.json    { "Gift": "1Z999AA10123456784", "Boots": "1Z..." }
//! ```
//!
//! Writes go to a sibling temp file that is then renamed over the original.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::TrackError;

/// Name/tracking-number pair as persisted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPackage {
    pub package_name: String,
    pub tracking_number: String,
}

/// Package names double as element ids, so the first space becomes `_`
pub fn format_package_name(package_name: &str) -> String {
    package_name.replacen(' ', "_", 1)
}

#[async_trait]
pub trait PackageStore: Send + Sync {
    /// Insert or overwrite the tracking number stored under `package_name`.
    async fn insert(&self, package_name: &str, tracking_number: &str) -> Result<(), TrackError>;

    async fn get(&self, package_name: &str) -> Result<Option<String>, TrackError>;

    /// Returns whether anything was removed.
    async fn remove(&self, package_name: &str) -> Result<bool, TrackError>;

    /// All packages, ordered by name.
    async fn entries(&self) -> Result<Vec<StoredPackage>, TrackError>;
}

fn to_entries(map: &BTreeMap<String, String>) -> Vec<StoredPackage> {
    map.iter()
        .map(|(name, tracking)| StoredPackage {
            package_name: name.clone(),
            tracking_number: tracking.clone(),
        })
        .collect()
}

/// JSON file backed store
pub struct LocalPackageStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process
    lock: RwLock<()>,
}

impl LocalPackageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TrackError {
        TrackError::Store {
            path: self.path.display().to_string(),
            source,
        }
    }

    async fn load(&self) -> Result<BTreeMap<String, String>, TrackError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(BTreeMap::new());
        }
        serde_json::from_slice(&bytes).map_err(|source| TrackError::Deserialize {
            context: self.path.display().to_string(),
            source,
        })
    }

    async fn save(&self, map: &BTreeMap<String, String>) -> Result<(), TrackError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let json = serde_json::to_vec_pretty(map).map_err(|source| TrackError::Serialize {
            context: self.path.display().to_string(),
            source,
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }
}

#[async_trait]
impl PackageStore for LocalPackageStore {
    async fn insert(&self, package_name: &str, tracking_number: &str) -> Result<(), TrackError> {
        let _guard = self.lock.write().await;
        let mut map = self.load().await?;
        map.insert(package_name.to_string(), tracking_number.to_string());
        self.save(&map).await?;
        tracing::debug!(package_name, path = %self.path.display(), "stored package");
        Ok(())
    }

    async fn get(&self, package_name: &str) -> Result<Option<String>, TrackError> {
        let _guard = self.lock.read().await;
        Ok(self.load().await?.remove(package_name))
    }

    async fn remove(&self, package_name: &str) -> Result<bool, TrackError> {
        let _guard = self.lock.write().await;
        let mut map = self.load().await?;
        if map.remove(package_name).is_none() {
            return Ok(false);
        }
        self.save(&map).await?;
        Ok(true)
    }

    async fn entries(&self) -> Result<Vec<StoredPackage>, TrackError> {
        let _guard = self.lock.read().await;
        Ok(to_entries(&self.load().await?))
    }
}

/// In-process store, gone when dropped
#[derive(Default)]
pub struct MemoryPackageStore {
    packages: RwLock<BTreeMap<String, String>>,
}

impl MemoryPackageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PackageStore for MemoryPackageStore {
    async fn insert(&self, package_name: &str, tracking_number: &str) -> Result<(), TrackError> {
        self.packages
            .write()
            .await
            .insert(package_name.to_string(), tracking_number.to_string());
        Ok(())
    }

    async fn get(&self, package_name: &str) -> Result<Option<String>, TrackError> {
        Ok(self.packages.read().await.get(package_name).cloned())
    }

    async fn remove(&self, package_name: &str) -> Result<bool, TrackError> {
        Ok(self.packages.write().await.remove(package_name).is_some())
    }

    async fn entries(&self) -> Result<Vec<StoredPackage>, TrackError> {
        Ok(to_entries(&*self.packages.read().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_package_name() {
        assert_eq!(format_package_name("Gift"), "Gift");
        assert_eq!(format_package_name("Mom Gift"), "Mom_Gift");
        // Only the first space is replaced
        assert_eq!(format_package_name("New Running Shoes"), "New_Running Shoes");
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryPackageStore::new();
        store.insert("Boots", "1Z2").await.unwrap();
        store.insert("Gift", "1Z1").await.unwrap();
        store.insert("Gift", "1Z3").await.unwrap();

        assert_eq!(store.get("Gift").await.unwrap().as_deref(), Some("1Z3"));
        let names: Vec<String> = store
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.package_name)
            .collect();
        assert_eq!(names, vec!["Boots", "Gift"]);

        assert!(store.remove("Gift").await.unwrap());
        assert!(!store.remove("Gift").await.unwrap());
        assert_eq!(store.get("Gift").await.unwrap(), None);
    }
}
