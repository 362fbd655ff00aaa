// Offline shell-asset cache: install a manifest, purge old versions, network-first reads
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub content_type: &'static str,
    pub body: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(String),
    #[error("asset origin unavailable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where fresh copies come from.
#[async_trait]
pub trait AssetOrigin: Send + Sync {
    async fn load(&self, path: &str) -> Result<Asset, AssetError>;
}

pub fn content_type(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("json") => "application/json",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

/// Serves files below a root directory; `/` maps to `index.html`.
#[derive(Debug, Clone)]
pub struct DirectoryOrigin {
    root: PathBuf,
}

impl DirectoryOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = path.trim_start_matches('/');
        let relative = if relative.is_empty() { "index.html" } else { relative };
        let relative = Path::new(relative);

        // only plain segments; no parent or absolute components
        if relative.components().all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }
}

#[async_trait]
impl AssetOrigin for DirectoryOrigin {
    async fn load(&self, path: &str) -> Result<Asset, AssetError> {
        let file = self
            .resolve(path)
            .ok_or_else(|| AssetError::NotFound(path.to_string()))?;

        match tokio::fs::read(&file).await {
            Ok(body) => Ok(Asset {
                content_type: content_type(&file.to_string_lossy()),
                body: Bytes::from(body),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AssetError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

type CacheEntries = HashMap<String, Asset>;

/// All cache versions, keyed by cache name. Shared between cache handles.
#[derive(Debug, Clone, Default)]
pub struct CacheStorage {
    caches: Arc<RwLock<HashMap<String, CacheEntries>>>,
}

impl CacheStorage {
    pub async fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    async fn put(&self, cache: &str, path: &str, asset: Asset) {
        self.caches
            .write()
            .await
            .entry(cache.to_string())
            .or_default()
            .insert(path.to_string(), asset);
    }

    /// Look in `preferred` first, then in any other version.
    async fn lookup(&self, preferred: &str, path: &str) -> Option<Asset> {
        let caches = self.caches.read().await;
        caches
            .get(preferred)
            .and_then(|entries| entries.get(path))
            .or_else(|| caches.values().find_map(|entries| entries.get(path)))
            .cloned()
    }
}

pub struct AssetCache {
    name: String,
    manifest: Vec<String>,
    storage: CacheStorage,
    origin: Arc<dyn AssetOrigin>,
}

impl AssetCache {
    pub fn new(
        name: impl Into<String>,
        manifest: Vec<String>,
        storage: CacheStorage,
        origin: Arc<dyn AssetOrigin>,
    ) -> Self {
        Self {
            name: name.into(),
            manifest,
            storage,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache every manifest entry. Nothing is stored unless all of them load.
    pub async fn install(&self) -> Result<usize, AssetError> {
        let loads = self.manifest.iter().map(|path| self.origin.load(path));
        let loaded = futures::future::try_join_all(loads).await?;

        for (path, asset) in self.manifest.iter().zip(loaded) {
            self.storage.put(&self.name, path, asset).await;
        }

        tracing::info!(cache = %self.name, assets = self.manifest.len(), "cached app shell");
        Ok(self.manifest.len())
    }

    /// Drop every cache version except this one. Returns the purged names.
    pub async fn activate(&self) -> Vec<String> {
        let mut caches = self.storage.caches.write().await;
        let stale: Vec<String> = caches.keys().filter(|k| **k != self.name).cloned().collect();
        for name in &stale {
            caches.remove(name);
            tracing::info!(cache = %name, "purged stale asset cache");
        }
        stale
    }

    /// Network first; on failure fall back to the cached copy.
    pub async fn fetch(&self, path: &str) -> Result<Asset, AssetError> {
        match self.origin.load(path).await {
            Ok(asset) => {
                self.storage.put(&self.name, path, asset.clone()).await;
                Ok(asset)
            }
            Err(err) => match self.storage.lookup(&self.name, path).await {
                Some(asset) => {
                    tracing::debug!(%path, error = %err, "serving asset from cache");
                    Ok(asset)
                }
                None => Err(err),
            },
        }
    }
}
