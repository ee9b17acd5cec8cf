//! Compiled plugin config cache.
//!
//! Memoizes the aggregate manifest map in a single JSON artifact so production
//! processes skip directory scanning and YAML parsing. The artifact is never
//! checked against the filesystem; anything that installs, removes, enables or
//! disables a plugin must call [`ManifestProvider::invalidate`].

use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use emporium_core::error::{AppError, ErrorKind};
use emporium_core::result::AppResult;

use crate::manifest::Manifest;
use crate::provider::ManifestProvider;

/// File name of the compiled artifact inside the cache directory.
pub const CACHE_FILE: &str = "config_cache.json";

/// Bumped whenever the serialized manifest layout changes.
const CACHE_FORMAT: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CacheArtifact {
    format: u32,
    plugins: BTreeMap<String, Manifest>,
}

/// State of the artifact as reported by [`CachedManifestProvider::status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStatus {
    /// Artifact location.
    pub path: PathBuf,
    /// Whether the artifact file exists.
    pub exists: bool,
    /// Number of cached plugins, when the artifact is readable.
    pub plugins: Option<usize>,
}

/// Production provider backed by the compiled artifact.
#[derive(Debug, Clone)]
pub struct CachedManifestProvider {
    inner: Arc<dyn ManifestProvider>,
    cache_dir: PathBuf,
}

impl CachedManifestProvider {
    /// Wraps `inner`, persisting its result under `cache_dir`.
    pub fn new(inner: Arc<dyn ManifestProvider>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            cache_dir: cache_dir.into(),
        }
    }

    /// Location of the artifact.
    pub fn artifact_path(&self) -> PathBuf {
        self.cache_dir.join(CACHE_FILE)
    }

    /// Whether an artifact file is present.
    pub async fn is_cached(&self) -> bool {
        fs::try_exists(self.artifact_path()).await.unwrap_or(false)
    }

    /// Describes the artifact without recomputing anything.
    pub async fn status(&self) -> CacheStatus {
        let path = self.artifact_path();
        let exists = fs::try_exists(&path).await.unwrap_or(false);
        let plugins = if exists {
            self.read_artifact().await.map(|plugins| plugins.len())
        } else {
            None
        };
        CacheStatus {
            path,
            exists,
            plugins,
        }
    }

    /// Recomputes and persists the artifact unconditionally.
    ///
    /// Unlike `get`, a failed write is returned as an error.
    pub async fn warm(&self) -> AppResult<BTreeMap<String, Manifest>> {
        let plugins = self.inner.get().await?;
        self.write_artifact(&plugins).await?;
        info!(
            path = %self.artifact_path().display(),
            plugins = plugins.len(),
            "Plugin config cache warmed"
        );
        Ok(plugins)
    }

    /// Removes temp files left behind by interrupted writes.
    pub async fn sweep_temp_files(&self) -> AppResult<usize> {
        let mut entries = match fs::read_dir(&self.cache_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if is_temp_artifact(&path) {
                fs::remove_file(&path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn read_artifact(&self) -> Option<BTreeMap<String, Manifest>> {
        let path = self.artifact_path();

        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == IoErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable plugin config cache");
                return None;
            }
        };

        match serde_json::from_slice::<CacheArtifact>(&bytes) {
            Ok(artifact) if artifact.format == CACHE_FORMAT => Some(artifact.plugins),
            Ok(artifact) => {
                warn!(
                    path = %path.display(),
                    format = artifact.format,
                    expected = CACHE_FORMAT,
                    "Plugin config cache has an outdated format"
                );
                None
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupt plugin config cache");
                None
            }
        }
    }

    async fn write_artifact(&self, plugins: &BTreeMap<String, Manifest>) -> AppResult<()> {
        fs::create_dir_all(&self.cache_dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Cache,
                format!("Failed to create cache directory: {}", self.cache_dir.display()),
                e,
            )
        })?;

        let artifact = CacheArtifact {
            format: CACHE_FORMAT,
            plugins: plugins.clone(),
        };
        let content = serde_json::to_vec_pretty(&artifact)?;

        let path = self.artifact_path();
        let temp_path = self
            .cache_dir
            .join(format!("{CACHE_FILE}.{}.tmp", Uuid::new_v4()));

        write_temp_file(&temp_path, &content).await?;

        // Concurrent writers each rename their own temp file; the last one wins.
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(AppError::with_source(
                ErrorKind::Cache,
                format!(
                    "Failed to rename {} to {}",
                    temp_path.display(),
                    path.display()
                ),
                e,
            ));
        }

        debug!(path = %path.display(), plugins = plugins.len(), "Plugin config cache written");
        Ok(())
    }
}

#[async_trait]
impl ManifestProvider for CachedManifestProvider {
    async fn get(&self) -> AppResult<BTreeMap<String, Manifest>> {
        if let Some(plugins) = self.read_artifact().await {
            debug!(plugins = plugins.len(), "Plugin config cache hit");
            return Ok(plugins);
        }

        let plugins = self.inner.get().await?;

        if let Err(e) = self.write_artifact(&plugins).await {
            warn!(error = %e, "Failed to persist plugin config cache, serving uncached result");
        }

        Ok(plugins)
    }

    async fn invalidate(&self) -> AppResult<()> {
        let path = self.artifact_path();
        match fs::remove_file(&path).await {
            Ok(()) => info!(path = %path.display(), "Plugin config cache invalidated"),
            Err(e) if e.kind() == IoErrorKind::NotFound => {}
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Cache,
                    format!("Failed to remove {}", path.display()),
                    e,
                ));
            }
        }
        self.inner.invalidate().await
    }

    fn name(&self) -> &'static str {
        "cached"
    }
}

/// Writes `content` to `temp_path`, removing whatever was written on failure.
async fn write_temp_file(temp_path: &Path, content: &[u8]) -> AppResult<()> {
    if let Err(e) = fs::write(temp_path, content).await {
        let _ = fs::remove_file(temp_path).await;
        return Err(AppError::with_source(
            ErrorKind::Cache,
            format!("Failed to write temp file: {}", temp_path.display()),
            e,
        ));
    }
    Ok(())
}

/// Whether `path` looks like a leftover temp file of an interrupted write.
pub fn is_temp_artifact(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(CACHE_FILE) && n.ends_with(".tmp"))
}
