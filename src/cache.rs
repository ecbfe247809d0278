//! Local cache for the raw ad spend export.
//!
//! The configured source is either a file on disk, used in place, or an
//! http(s) URL downloaded once into the cache directory. Remote sources are
//! re-downloaded when their `ETag` / `Last-Modified` validator changes.
//! Gzipped downloads (`.gz`) are decompressed on arrival.

use crate::config;
use crate::error::{MetricsError, Result};
use flate2::read::GzDecoder;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, LAST_MODIFIED};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tracing::{info, warn};

/// Resolves the raw export to a local file, downloading when needed.
pub struct CacheManager {
    /// Directory where downloaded files are stored.
    pub cache_dir: PathBuf,
    /// If true, never download (use cached files only).
    pub offline: bool,
    /// Local path or http(s) URL of the CSV export, if configured.
    pub source: Option<String>,
    timeout: Duration,
    client: Option<Client>,
    remote_ver: Option<String>,
}

impl CacheManager {
    /// Create a new cache manager.
    ///
    /// If `cache_dir` is `None`, uses the platform-appropriate default cache directory.
    /// Creates the cache directory if it does not exist.
    pub fn new(
        cache_dir: Option<PathBuf>,
        source: Option<String>,
        offline: bool,
        timeout: Duration,
    ) -> Result<Self> {
        let dir = cache_dir.unwrap_or_else(config::default_cache_dir);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            cache_dir: dir,
            offline,
            source,
            timeout,
            client: None,
            remote_ver: None,
        })
    }

    /// Lazy HTTP client, created on first use.
    fn client(&mut self) -> Result<Client> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        let client = Client::builder()
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;
        self.client = Some(client.clone());
        Ok(client)
    }

    /// Path the downloaded export lives at inside the cache directory.
    pub fn cached_path(&self) -> PathBuf {
        self.cache_dir.join(config::CACHED_SOURCE_FILE)
    }

    fn local_version(&self) -> Option<String> {
        fs::read_to_string(self.cache_dir.join(config::VERSION_FILE))
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn save_version(&self, version: &str) {
        if let Err(e) = fs::write(self.cache_dir.join(config::VERSION_FILE), version) {
            warn!(error = %e, "could not record source version");
        }
    }

    /// Fetch the validator (`ETag`, else `Last-Modified`) of the remote source.
    ///
    /// Returns `None` when offline, when the source is local, or when the
    /// server is unreachable. Caches the result for subsequent calls.
    pub fn remote_version(&mut self) -> Result<Option<String>> {
        if self.remote_ver.is_some() {
            return Ok(self.remote_ver.clone());
        }
        let url = match &self.source {
            Some(s) if config::is_remote_source(s) => s.clone(),
            _ => return Ok(None),
        };
        if self.offline {
            return Ok(None);
        }
        let client = self.client()?;
        match client.head(&url).send() {
            Ok(resp) => {
                let resp = resp.error_for_status()?;
                let headers = resp.headers();
                let version = headers
                    .get(ETAG)
                    .or_else(|| headers.get(LAST_MODIFIED))
                    .and_then(|v| v.to_str().ok())
                    .map(|s| s.to_string());
                self.remote_ver = version.clone();
                Ok(version)
            }
            Err(e) => {
                warn!(url = %url, error = %e, "failed to check source version");
                Ok(None)
            }
        }
    }

    /// Check if the cached download is out of date.
    ///
    /// Returns `true` if a remote source was never downloaded or its validator changed.
    /// Returns `false` if up to date, if the source has no validator, or if
    /// the server is unreachable.
    pub fn is_stale(&mut self) -> Result<bool> {
        // Local files are read in place; there is nothing to go stale
        if !self.source.as_deref().is_some_and(config::is_remote_source) {
            return Ok(false);
        }
        match self.local_version() {
            None => Ok(!self.cached_path().exists()),
            Some(local_ver) => match self.remote_version()? {
                None => Ok(false),
                Some(remote_ver) => Ok(local_ver != remote_ver),
            },
        }
    }

    /// Download `url` to `dest` through a temp file in the same directory,
    /// so an interrupted transfer never leaves a partial file at `dest`.
    fn download_file(&mut self, url: &str, dest: &Path) -> Result<()> {
        info!(url = %url, "downloading ad spend export");

        let parent = dest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cache_dir.clone());
        fs::create_dir_all(&parent)?;

        let client = self.client()?;
        let resp = client.get(url).send()?.error_for_status()?;
        let bytes = resp.bytes()?;

        let mut tmp = NamedTempFile::new_in(&parent)?;
        if url.ends_with(".gz") {
            let mut decoder = GzDecoder::new(&bytes[..]);
            io::copy(&mut decoder, &mut tmp)?;
        } else {
            tmp.write_all(&bytes)?;
        }
        tmp.flush()?;
        tmp.persist(dest).map_err(|e| MetricsError::Io(e.error))?;
        Ok(())
    }

    /// Resolve the configured source to a readable local CSV file.
    pub fn ensure_source(&mut self) -> Result<PathBuf> {
        let source = self.source.clone().ok_or_else(|| {
            MetricsError::NotFound("No ad spend source configured".to_string())
        })?;

        if !config::is_remote_source(&source) {
            let path = PathBuf::from(&source);
            if !path.exists() {
                return Err(MetricsError::NotFound(format!(
                    "Source file {} does not exist",
                    path.display()
                )));
            }
            return Ok(path);
        }

        let local_path = self.cached_path();
        if !local_path.exists() || self.is_stale()? {
            if self.offline {
                if local_path.exists() {
                    return Ok(local_path);
                }
                return Err(MetricsError::NotFound(format!(
                    "Source {} not cached and offline mode is enabled",
                    source
                )));
            }
            self.download_file(&source, &local_path)?;
            if let Ok(Some(version)) = self.remote_version() {
                self.save_version(&version);
            }
        }

        Ok(local_path)
    }

    /// Remove all cached files and recreate the cache directory.
    pub fn clear(&mut self) -> Result<()> {
        if self.cache_dir.exists() {
            fs::remove_dir_all(&self.cache_dir)?;
            fs::create_dir_all(&self.cache_dir)?;
        }
        self.remote_ver = None;
        Ok(())
    }

    /// Close the HTTP client, if open.
    pub fn close(&mut self) {
        self.client = None;
    }
}
