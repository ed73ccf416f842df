use intentdb_core::config::EmbeddingConfig;
use intentdb_embed::{cosine_similarity, get_default_embedder, HashEmbedder};
use intentdb_core::traits::Embedder;

#[tokio::test]
async fn trait_object_embeds_with_configured_dimension() {
    let config = EmbeddingConfig { provider: "hash".into(), dimension: 128 };
    let embedder = get_default_embedder(&config).expect("embedder");
    assert_eq!(embedder.dim(), 128);

    let v = embedder.embed("add item to cart").await.expect("embed");
    assert_eq!(v.len(), 128);
    let again = embedder.embed("add item to cart").await.expect("embed");
    assert!((cosine_similarity(&v, &again) - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn async_and_sync_paths_agree() {
    let e = HashEmbedder::new(32);
    assert_eq!(e.embed("checkout").await.unwrap(), e.embed_sync("checkout"));
}

#[test]
fn unknown_provider_is_rejected() {
    if std::env::var("APP_USE_FAKE_EMBEDDINGS").is_ok() {
        return;
    }
    let config = EmbeddingConfig { provider: "remote-magic".into(), dimension: 8 };
    let err = get_default_embedder(&config).err().expect("should fail");
    assert!(err.to_string().contains("remote-magic"));
}
