// Tag cache: keeps the last `getTags` answer on disk and serves it while it
// is younger than the configured expiry. Freshness comes from the file's
// modification time. The artifact is always replaced through a temp file in
// the same directory plus a rename, so readers never see a partial write.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::api::{ApiError, TagSource};
use crate::config::Config;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Remote(#[from] ApiError),
    #[error("failed to write tag cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode tag cache: {0}")]
    Encode(#[from] serde_json::Error),
}

/// On-disk cache of the tag list.
#[derive(Debug, Clone)]
pub struct TagCache {
    path: PathBuf,
    expiry: Duration,
}

impl TagCache {
    pub fn new(path: impl Into<PathBuf>, expiry: Duration) -> Self {
        TagCache {
            path: path.into(),
            expiry,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        TagCache::new(config.cache_path.clone(), config.cache_expiry)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the tag list, from disk when the artifact is fresh and from
    /// `source` otherwise (missing, expired, corrupted or `force_refresh`).
    /// A refetched list is persisted before it is returned.
    pub fn get_tags<S: TagSource + ?Sized>(
        &self,
        source: &S,
        force_refresh: bool,
    ) -> Result<Vec<String>, CacheError> {
        if !force_refresh && self.is_fresh() {
            match self.read() {
                Ok(tags) => {
                    log::debug!("Read {} tags from cache {}", tags.len(), self.path.display());
                    return Ok(tags);
                }
                Err(err) => {
                    log::error!(
                        "Cache file {} is corrupted, refreshing cache: {}",
                        self.path.display(),
                        err
                    );
                }
            }
        }

        let tags = source.fetch_tags()?;
        self.write(&tags)?;
        log::debug!("Cached {} tags in {}", tags.len(), self.path.display());
        Ok(tags)
    }

    /// Whether the artifact exists and was modified less than `expiry` ago.
    fn is_fresh(&self) -> bool {
        let modified = match fs::metadata(&self.path).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };
        // An mtime in the future counts as age zero.
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age >= self.expiry {
            log::debug!("Cache {} expired ({}s old)", self.path.display(), age.as_secs());
            return false;
        }
        true
    }

    fn read(&self) -> anyhow::Result<Vec<String>> {
        let data = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn write(&self, tags: &[String]) -> Result<(), CacheError> {
        let data = serde_json::to_vec(tags)?;
        let io_err = |source: io::Error| CacheError::Io {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(io_err)?;

        let mut temp = NamedTempFile::new_in(parent).map_err(io_err)?;
        temp.write_all(&data).map_err(io_err)?;
        temp.as_file().sync_all().map_err(io_err)?;
        // Dropping a failed `PersistError` removes the temp file.
        temp.persist(&self.path).map_err(|err| io_err(err.error))?;
        Ok(())
    }
}

/// Tags containing `substring` verbatim, in their original order. `None` or
/// an empty substring keeps everything.
pub fn filter_tags(tags: &[String], substring: Option<&str>) -> Vec<String> {
    match substring {
        Some(needle) if !needle.is_empty() => tags
            .iter()
            .filter(|tag| tag.contains(needle))
            .cloned()
            .collect(),
        _ => tags.to_vec(),
    }
}
