//! Read-through cache of `.txt` assets in one directory.
//!
//! Lookups are synchronous behind an `RwLock`. A cancellable tokio task
//! (see [`TextAssetStore::spawn_refresh`]) rescans the directory on an
//! interval and reloads files whose modification time changed.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use broadcast_core::error::{BroadcastError, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const ASSET_EXTENSION: &str = "txt";

struct CachedAsset {
    lines: Vec<String>,
    modified: Option<SystemTime>,
}

/// In-memory snapshot of the text assets under `dir`, keyed by file stem.
pub struct TextAssetStore {
    dir: PathBuf,
    files: RwLock<HashMap<String, CachedAsset>>,
}

impl TextAssetStore {
    /// Open a store over `dir` and load every `.txt` file in it.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(BroadcastError::AssetNotFound(dir.display().to_string()));
        }
        let store = Self {
            dir,
            files: RwLock::new(HashMap::new()),
        };
        let loaded = store.refresh();
        tracing::info!(dir = %store.dir.display(), assets = loaded, "Text assets loaded");
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// On-disk path of asset `name` (with or without the `.txt` suffix).
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.{ASSET_EXTENSION}", asset_key(name)))
    }

    /// Lines of asset `name`. Falls through to disk on a cache miss.
    pub fn get_lines(&self, name: &str) -> Result<Vec<String>> {
        let key = asset_key(name);
        {
            let files = self.files.read().unwrap_or_else(|e| e.into_inner());
            if let Some(asset) = files.get(key) {
                return Ok(asset.lines.clone());
            }
        }

        let path = self.path_of(key);
        if !path.is_file() {
            return Err(BroadcastError::AssetNotFound(path.display().to_string()));
        }
        let asset = read_asset(&path)?;
        let lines = asset.lines.clone();
        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), asset);
        Ok(lines)
    }

    /// Rescan the directory: load new files, reload modified ones, forget
    /// deleted ones. Returns how many assets were (re)loaded.
    pub fn refresh(&self) -> usize {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), "Failed to scan asset dir: {e}");
                return 0;
            }
        };

        let mut seen = Vec::new();
        let mut reloaded = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(ASSET_EXTENSION) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            let modified = entry.metadata().and_then(|m| m.modified()).ok();
            seen.push(key.clone());

            let unchanged = {
                let files = self.files.read().unwrap_or_else(|e| e.into_inner());
                files
                    .get(&key)
                    .is_some_and(|a| a.modified.is_some() && a.modified == modified)
            };
            if unchanged {
                continue;
            }

            match read_asset(&path) {
                Ok(asset) => {
                    tracing::debug!(file = %path.display(), lines = asset.lines.len(), "Asset (re)loaded");
                    self.files
                        .write()
                        .unwrap_or_else(|e| e.into_inner())
                        .insert(key, asset);
                    reloaded += 1;
                }
                Err(e) => tracing::warn!(file = %path.display(), "Failed to read asset: {e}"),
            }
        }

        self.files
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|key, _| seen.contains(key));
        reloaded
    }

    /// Spawn the background refresh task. It stops when `cancel` fires.
    pub fn spawn_refresh(self: &Arc<Self>, every: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            tracing::debug!(interval_ms = every.as_millis() as u64, "Asset refresh started");
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("Asset refresh stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let reloaded = store.refresh();
                        if reloaded > 0 {
                            tracing::info!(reloaded, "Detected asset changes");
                        }
                    }
                }
            }
        })
    }
}

fn asset_key(name: &str) -> &str {
    name.strip_suffix(".txt").unwrap_or(name)
}

fn read_asset(path: &Path) -> Result<CachedAsset> {
    let content = std::fs::read_to_string(path)?;
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
    Ok(CachedAsset {
        lines: content.lines().map(str::to_string).collect(),
        modified,
    })
}
