use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;

use crate::util::{sha256_hex, url_slug, write_json_pretty};

use super::PageData;

/// On-disk page cache: one JSON file per sanitized URL. Entries are
/// immutable for a run; a concurrent duplicate write carries identical
/// content, so last-write-wins is safe.
pub struct PageCache {
    root: PathBuf,
}

impl PageCache {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Cache key: the URL slug suffixed with the URL's own digest so
    /// distinct URLs that slug identically never collide.
    fn entry_path(&self, url: &str) -> PathBuf {
        let slug = url_slug(url);
        let digest = &sha256_hex(url)[..12];
        self.root.join(format!("{slug}-{digest}.json"))
    }

    pub fn load(&self, url: &str) -> Option<PageData> {
        let path = self.entry_path(url);
        if !path.exists() {
            return None;
        }

        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to read cache entry");
                return None;
            }
        };

        match serde_json::from_slice::<PageData>(&raw) {
            Ok(page) => Some(page),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "discarding unreadable cache entry");
                None
            }
        }
    }

    pub fn store(&self, url: &str, page: &PageData) -> Result<()> {
        let path = self.entry_path(url);
        write_json_pretty(&path, page)
            .with_context(|| format!("failed to write cache entry for {url}"))
    }
}
