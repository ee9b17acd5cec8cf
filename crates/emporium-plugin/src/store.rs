//! Manifest store: discovers plugin directories and parses their manifests.

use std::collections::BTreeMap;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use emporium_core::error::{AppError, ErrorKind};
use emporium_core::result::AppResult;

use crate::manifest::Manifest;

/// Required manifest file of a plugin directory.
pub const CONFIG_FILE: &str = "config.yml";
/// Optional event binding file of a plugin directory.
pub const EVENT_FILE: &str = "event.yml";

/// Reads manifests from `<root>/<code>/`.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    /// Creates a store over a plugin root directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Plugin root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory of one plugin.
    pub fn plugin_dir(&self, code: &str) -> PathBuf {
        self.root.join(code)
    }

    /// Lists plugin codes (immediate sub-directory names), sorted.
    pub async fn discover_codes(&self) -> AppResult<Vec<String>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                info!(root = %self.root.display(), "Plugin directory does not exist");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read plugin directory: {}", self.root.display()),
                    e,
                ));
            }
        };

        let mut codes = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if !is_dir {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(code) => codes.push(code),
                Err(raw) => warn!(name = ?raw, "Skipping plugin directory with non UTF-8 name"),
            }
        }

        codes.sort();
        Ok(codes)
    }

    /// Reads the manifest of one plugin.
    ///
    /// Returns `Ok(None)` when the directory has no `config.yml`.
    pub async fn read_manifest(&self, code: &str) -> AppResult<Option<Manifest>> {
        let dir = self.plugin_dir(code);

        let config = match fs::read_to_string(dir.join(CONFIG_FILE)).await {
            Ok(content) => content,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read {CONFIG_FILE} of plugin '{code}'"),
                    e,
                ));
            }
        };

        let events = match fs::read_to_string(dir.join(EVENT_FILE)).await {
            Ok(content) => Some(content),
            Err(e) if e.kind() == IoErrorKind::NotFound => {
                info!(plugin_code = %code, "Plugin has no {EVENT_FILE}");
                None
            }
            Err(e) => {
                return Err(AppError::with_source(
                    ErrorKind::Storage,
                    format!("Failed to read {EVENT_FILE} of plugin '{code}'"),
                    e,
                ));
            }
        };

        Manifest::parse(code, &config, events.as_deref()).map(Some)
    }

    /// Discovers every valid plugin, keyed by code.
    ///
    /// Invalid or incomplete plugins are logged and left out; scanning continues.
    pub async fn discover_all(&self) -> AppResult<BTreeMap<String, Manifest>> {
        let mut manifests = BTreeMap::new();

        for code in self.discover_codes().await? {
            match self.read_manifest(&code).await {
                Ok(Some(manifest)) => {
                    debug!(
                        plugin_code = %code,
                        bindings = manifest.binding_count(),
                        "Manifest discovered"
                    );
                    manifests.insert(code, manifest);
                }
                Ok(None) => {
                    warn!(plugin_code = %code, "Plugin has no {CONFIG_FILE}, skipping");
                }
                Err(e) => {
                    warn!(plugin_code = %code, error = %e, "Invalid plugin manifest, skipping");
                }
            }
        }

        info!(
            root = %self.root.display(),
            plugins = manifests.len(),
            "Plugin discovery complete"
        );

        Ok(manifests)
    }
}
