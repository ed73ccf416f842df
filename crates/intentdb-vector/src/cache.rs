//! File-backed embedding cache keyed by the blake3 digest of the text.
//!
//! One `<hex digest>.json` file per entry holding
//! `{embedder_id, text, vector, created_at}`. The cache is best-effort: read,
//! parse and write failures are logged and behave like a miss, never like an
//! error. An entry written by another provider, or for another text, is a
//! miss. Entries older than the expiration window are dropped on read. When a
//! write pushes the directory over its byte budget it is trimmed back,
//! expired entries first, then oldest-created first.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use intentdb_core::config::CacheConfig;

const ENTRY_EXTENSION: &str = "json";

static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// [`intentdb_core::traits::Embedder::id`] of the provider that produced
    /// `vector`. Empty for entries written without one.
    #[serde(default)]
    pub embedder_id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub created_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(embedder_id: impl Into<String>, text: impl Into<String>, vector: Vec<f32>) -> Self {
        Self { embedder_id: embedder_id.into(), text: text.into(), vector, created_at: Utc::now() }
    }
}

/// Only the timestamp, so eviction and statistics skip materializing vectors.
#[derive(Deserialize)]
struct EntryHeader {
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStatistics {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub total_size_bytes: u64,
    pub max_size_bytes: u64,
}

struct ScannedEntry {
    path: PathBuf,
    size: u64,
}

#[derive(Debug, Clone)]
pub struct EmbeddingCache {
    dir: PathBuf,
    max_size_bytes: u64,
    expiration: Duration,
}

impl EmbeddingCache {
    pub fn new(dir: impl Into<PathBuf>, max_size_bytes: u64, expiration: Duration) -> Self {
        Self { dir: dir.into(), max_size_bytes, expiration }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.resolved_dir(),
            config.max_size_bytes,
            Duration::days(i64::from(config.expiration_days)),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn key_for(text: &str) -> String {
        blake3::hash(text.as_bytes()).to_hex().to_string()
    }

    pub fn entry_path(&self, text: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", Self::key_for(text), ENTRY_EXTENSION))
    }

    fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(created_at) >= self.expiration
    }

    /// Vector cached for `text` by the provider `embedder_id`, if any.
    pub async fn get(&self, embedder_id: &str, text: &str) -> Option<Vec<f32>> {
        let path = self.entry_path(text);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "embedding cache read failed");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt embedding cache entry");
                remove_quietly(&path).await;
                return None;
            }
        };
        if entry.text != text {
            warn!(path = %path.display(), "embedding cache entry text mismatch; ignoring");
            return None;
        }
        if entry.embedder_id != embedder_id {
            debug!(
                path = %path.display(),
                cached = %entry.embedder_id,
                wanted = embedder_id,
                "embedding cache entry from another provider"
            );
            return None;
        }
        if self.is_expired(entry.created_at, Utc::now()) {
            debug!(path = %path.display(), "embedding cache entry expired");
            remove_quietly(&path).await;
            return None;
        }
        Some(entry.vector)
    }

    pub async fn put(&self, embedder_id: &str, text: &str, vector: &[f32]) {
        self.put_entry(&CacheEntry::new(embedder_id, text, vector.to_vec())).await;
    }

    /// Writes `entry` as-is (including its timestamp), then trims the cache.
    pub async fn put_entry(&self, entry: &CacheEntry) {
        if let Err(e) = self.write_entry(entry).await {
            warn!(dir = %self.dir.display(), error = %format!("{e:#}"), "embedding cache write failed");
            return;
        }
        self.cleanup().await;
    }

    async fn write_entry(&self, entry: &CacheEntry) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let key = Self::key_for(&entry.text);
        let payload = serde_json::to_vec(entry)?;
        // Write-then-rename: a racing writer of the same key never leaves a
        // torn file and the last rename wins.
        let tmp = self.dir.join(format!(
            ".{}.{}.{}.tmp",
            key,
            std::process::id(),
            TMP_SEQ.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&tmp, &payload)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        let target = self.dir.join(format!("{key}.{ENTRY_EXTENSION}"));
        if let Err(e) = tokio::fs::rename(&tmp, &target).await {
            remove_quietly(&tmp).await;
            return Err(e).with_context(|| format!("renaming into {}", target.display()));
        }
        Ok(())
    }

    /// Enforces the byte budget. Returns the number of entries removed.
    pub async fn cleanup(&self) -> usize {
        match self.try_cleanup().await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %format!("{e:#}"), "embedding cache cleanup failed");
                0
            }
        }
    }

    async fn try_cleanup(&self) -> Result<usize> {
        let entries = self.scan().await?;
        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        if total <= self.max_size_bytes {
            return Ok(0);
        }

        let now = Utc::now();
        let mut removed = 0usize;
        let mut remaining = Vec::with_capacity(entries.len());
        for entry in entries {
            match read_created_at(&entry.path).await {
                Some(created_at) if !self.is_expired(created_at, now) => remaining.push((created_at, entry)),
                _ => {
                    remove_quietly(&entry.path).await;
                    total = total.saturating_sub(entry.size);
                    removed += 1;
                }
            }
        }

        remaining.sort_by_key(|(created_at, _)| *created_at);
        for (_, entry) in remaining {
            if total <= self.max_size_bytes {
                break;
            }
            remove_quietly(&entry.path).await;
            total = total.saturating_sub(entry.size);
            removed += 1;
        }
        debug!(removed, total_size_bytes = total, "embedding cache trimmed");
        Ok(removed)
    }

    /// Entry files and their sizes, from directory metadata only.
    async fn scan(&self) -> Result<Vec<ScannedEntry>> {
        let mut dir = match tokio::fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("listing {}", self.dir.display())),
        };
        let mut out = Vec::new();
        while let Some(item) = dir.next_entry().await? {
            let path = item.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            match item.metadata().await {
                Ok(meta) if meta.is_file() => out.push(ScannedEntry { path, size: meta.len() }),
                _ => continue,
            }
        }
        Ok(out)
    }

    pub async fn statistics(&self) -> CacheStatistics {
        let mut stats = CacheStatistics { max_size_bytes: self.max_size_bytes, ..Default::default() };
        let entries = match self.scan().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %format!("{e:#}"), "embedding cache scan failed");
                return stats;
            }
        };
        let now = Utc::now();
        for entry in entries {
            stats.total_entries += 1;
            stats.total_size_bytes += entry.size;
            match read_created_at(&entry.path).await {
                Some(c) if !self.is_expired(c, now) => stats.valid_entries += 1,
                _ => stats.expired_entries += 1,
            }
        }
        stats
    }

    /// Removes every entry. Returns how many were deleted.
    pub async fn clear(&self) -> Result<usize> {
        let entries = self.scan().await?;
        let count = entries.len();
        for entry in entries {
            remove_quietly(&entry.path).await;
        }
        Ok(count)
    }
}

/// `None` when the file could not be read or parsed.
async fn read_created_at(path: &Path) -> Option<DateTime<Utc>> {
    let bytes = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice::<EntryHeader>(&bytes).ok().map(|h| h.created_at)
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove embedding cache file");
        }
    }
}
