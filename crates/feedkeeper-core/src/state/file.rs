// # Snapshot File
//
// JSON persistence for `CatalogData` with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write to `<path>.tmp`, then rename over the snapshot
// - Backup: the previous snapshot is copied to `<path>.backup` before the rename
// - Recovery: a snapshot that fails to parse is replaced by its backup
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "catalog": {
//     "settings": { "channel_title": "Top Java Blogs" },
//     "sources": [ ... ],
//     "categories": [ ... ],
//     "items": { "1": { ... } },
//     "digests": [ ... ]
//   }
// }
// ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::state::memory::CatalogData;

/// Snapshot format version
const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFormat {
    version: String,
    catalog: CatalogData,
}

/// A catalog snapshot on disk
///
/// # Example
///
/// ```rust,no_run
/// use feedkeeper_core::state::{MemoryCatalog, SnapshotFile};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let file = SnapshotFile::new("/var/lib/feedkeeper/catalog.json");
///     let catalog = MemoryCatalog::from_data(file.load().await?);
///
///     // ... run jobs ...
///
///     file.save(&catalog.snapshot().await).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, falling back to the backup when it is corrupt
    ///
    /// A missing snapshot yields an empty catalog. If both the snapshot and
    /// its backup are unreadable, loading starts from an empty catalog.
    pub async fn load(&self) -> Result<CatalogData, Error> {
        match Self::read(&self.path).await {
            Ok(data) => Ok(data),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Snapshot {} is corrupted: {}. Attempting recovery from backup.",
                    self.path.display(),
                    e
                );

                let backup_path = self.backup_path();
                if !fs::try_exists(&backup_path).await? {
                    tracing::warn!("No backup snapshot found. Starting with an empty catalog.");
                    return Ok(CatalogData::default());
                }

                match Self::read(&backup_path).await {
                    Ok(data) => {
                        tracing::info!("Recovered catalog from backup snapshot");
                        if let Err(restore_err) = fs::copy(&backup_path, &self.path).await {
                            tracing::error!(
                                "Failed to restore snapshot from backup: {}",
                                restore_err
                            );
                        }
                        Ok(data)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup snapshot also unreadable: {}. Starting with an empty catalog.",
                            backup_err
                        );
                        Ok(CatalogData::default())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn read(path: &Path) -> Result<CatalogData, Error> {
        if !fs::try_exists(path).await? {
            tracing::debug!("Snapshot {} does not exist yet", path.display());
            return Ok(CatalogData::default());
        }

        let content = fs::read_to_string(path).await?;
        let snapshot: SnapshotFormat = serde_json::from_str(&content)?;

        if snapshot.version != SNAPSHOT_VERSION {
            tracing::warn!(
                "Snapshot version mismatch: expected {}, got {}. Attempting to load anyway.",
                SNAPSHOT_VERSION,
                snapshot.version
            );
        }

        Ok(snapshot.catalog)
    }

    /// Write the snapshot atomically
    pub async fn save(&self, catalog: &CatalogData) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let json = serde_json::to_string_pretty(&SnapshotFormat {
            version: SNAPSHOT_VERSION.to_string(),
            catalog: catalog.clone(),
        })?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(json.as_bytes()).await?;
            file.flush().await?;
        }

        if fs::try_exists(&self.path).await? {
            if let Err(e) = fs::copy(&self.path, self.backup_path()).await {
                tracing::warn!("Failed to create backup snapshot: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Snapshot written to {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone();
        backup.set_extension("backup");
        backup
    }
}
