use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};

use intentdb_core::config::CacheConfig;
use intentdb_core::traits::Embedder;
use intentdb_vector::{CacheEntry, CachedEmbedder, EmbeddingCache};

const COUNTING: &str = "counting";

struct CountingEmbedder {
    calls: AtomicUsize,
    dim: usize,
}

impl CountingEmbedder {
    fn new(dim: usize) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), dim })
    }
}

#[async_trait]
impl Embedder for CountingEmbedder {
    fn id(&self) -> &str {
        COUNTING
    }
    fn dim(&self) -> usize {
        self.dim
    }
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![text.len() as f32; self.dim])
    }
}

struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    fn id(&self) -> &str {
        "failing"
    }
    fn dim(&self) -> usize {
        4
    }
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("model offline")
    }
}

/// Always returns `vector`, under the provider id `id`.
struct FixedEmbedder {
    id: &'static str,
    vector: Vec<f32>,
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn id(&self) -> &str {
        self.id
    }
    fn dim(&self) -> usize {
        self.vector.len()
    }
    async fn embed(&self, _text: &str) -> anyhow::Result<Vec<f32>> {
        Ok(self.vector.clone())
    }
}

fn blake3_hash(s: &str) -> String {
    blake3::hash(s.as_bytes()).to_hex().to_string()
}

#[tokio::test]
async fn eviction_keeps_cache_under_budget_dropping_oldest_first() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let base = Utc::now() - Duration::hours(10);
    let sizing = EmbeddingCache::new(tmp.path().join("sizing"), u64::MAX, Duration::days(30));
    let mut sample = CacheEntry::new(COUNTING, "entry-00", vec![0.5; 8]);
    sample.created_at = base;
    sizing.put_entry(&sample).await;
    let entry_size = sizing.statistics().await.total_size_bytes;
    assert!(entry_size > 0);

    let budget = entry_size * 3 + entry_size / 2;
    let cache = EmbeddingCache::new(tmp.path().join("cache"), budget, Duration::days(30));
    for i in 0..10 {
        let mut entry = CacheEntry::new(COUNTING, format!("entry-{i:02}"), vec![0.5; 8]);
        entry.created_at = base + Duration::minutes(i);
        cache.put_entry(&entry).await;
        assert!(cache.statistics().await.total_size_bytes <= budget, "over budget after put {i}");
    }

    let stats = cache.statistics().await;
    assert_eq!(stats.total_entries, 3);
    for i in 0..7 {
        assert_eq!(cache.get(COUNTING, &format!("entry-{i:02}")).await, None, "entry-{i:02} should be evicted");
    }
    for i in 7..10 {
        assert!(cache.get(COUNTING, &format!("entry-{i:02}")).await.is_some(), "entry-{i:02} should survive");
    }
    Ok(())
}

#[tokio::test]
async fn eviction_prefers_expired_entries() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cache = EmbeddingCache::new(tmp.path(), u64::MAX, Duration::days(1));
    let mut stale = CacheEntry::new(COUNTING, "stale", vec![1.0; 8]);
    stale.created_at = Utc::now() - Duration::days(2);
    cache.put_entry(&stale).await;
    let mut older_but_fresh = CacheEntry::new(COUNTING, "fresh-a", vec![1.0; 8]);
    older_but_fresh.created_at = Utc::now() - Duration::hours(12);
    cache.put_entry(&older_but_fresh).await;

    let size = cache.statistics().await.total_size_bytes;
    let tight = EmbeddingCache::new(tmp.path(), size + size / 4, Duration::days(1));
    tight.put_entry(&CacheEntry::new(COUNTING, "fresh-b", vec![1.0; 8])).await;

    assert!(!tmp.path().join(format!("{}.json", blake3_hash("stale"))).exists());
    assert!(tmp.path().join(format!("{}.json", blake3_hash("fresh-a"))).exists());
    assert!(tmp.path().join(format!("{}.json", blake3_hash("fresh-b"))).exists());
    Ok(())
}

#[tokio::test]
async fn cached_embedder_generates_once() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let inner = CountingEmbedder::new(4);
    let cache = EmbeddingCache::new(tmp.path(), u64::MAX, Duration::days(30));
    let embedder = CachedEmbedder::new(inner.clone(), cache);

    let first = embedder.embed("open settings").await?;
    let second = embedder.embed("open settings").await?;
    assert_eq!(first, second);
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    assert_eq!((embedder.hits(), embedder.misses()), (1, 1));

    // A second wrapper over the same directory sees the persisted entry.
    let reopened = CachedEmbedder::new(inner.clone(), EmbeddingCache::new(tmp.path(), u64::MAX, Duration::days(30)));
    reopened.embed("open settings").await?;
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[tokio::test]
async fn cached_vector_with_wrong_dimension_is_regenerated() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cache = EmbeddingCache::new(tmp.path(), u64::MAX, Duration::days(30));
    cache.put(COUNTING, "profile", &[1.0, 2.0]).await;

    let inner = CountingEmbedder::new(4);
    let embedder = CachedEmbedder::new(inner.clone(), cache.clone());
    let v = embedder.embed("profile").await?;
    assert_eq!(v.len(), 4);
    assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(COUNTING, "profile").await.map(|v| v.len()), Some(4));
    Ok(())
}

#[tokio::test]
async fn provider_errors_propagate_and_are_not_cached() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cache = EmbeddingCache::new(tmp.path(), u64::MAX, Duration::days(30));
    let embedder = CachedEmbedder::new(Arc::new(FailingEmbedder), cache.clone());

    let err = embedder.embed("anything").await.unwrap_err();
    let rendered = format!("{err:#}");
    assert!(rendered.contains("model offline"), "{rendered}");
    assert!(rendered.contains("failing"), "{rendered}");
    assert_eq!(cache.statistics().await.total_entries, 0);
    Ok(())
}

#[tokio::test]
async fn disabled_cache_config_skips_disk() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = CacheConfig {
        enabled: false,
        dir: tmp.path().to_string_lossy().to_string(),
        ..Default::default()
    };
    let inner = CountingEmbedder::new(2);
    let embedder = CachedEmbedder::from_config(inner.clone(), &config);
    assert!(embedder.cache().is_none());
    embedder.embed("a").await?;
    embedder.embed("a").await?;
    assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    assert_eq!(std::fs::read_dir(tmp.path())?.count(), 0);
    Ok(())
}

#[tokio::test]
async fn providers_sharing_a_directory_never_see_each_others_vectors() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let open = || EmbeddingCache::new(tmp.path(), u64::MAX, Duration::days(30));
    let a = CachedEmbedder::new(Arc::new(FixedEmbedder { id: "model-a", vector: vec![1.0, 0.0] }), open());
    let b = CachedEmbedder::new(Arc::new(FixedEmbedder { id: "model-b", vector: vec![0.0, 1.0] }), open());

    assert_eq!(a.embed("sign in").await?, vec![1.0, 0.0]);
    assert_eq!(b.embed("sign in").await?, vec![0.0, 1.0]);
    assert_eq!((b.hits(), b.misses()), (0, 1));

    // b's write replaced a's entry; a regenerates rather than reading b's vector.
    assert_eq!(a.embed("sign in").await?, vec![1.0, 0.0]);
    assert_eq!((a.hits(), a.misses()), (0, 2));
    assert_eq!(a.embed("sign in").await?, vec![1.0, 0.0]);
    assert_eq!(a.hits(), 1);
    Ok(())
}
