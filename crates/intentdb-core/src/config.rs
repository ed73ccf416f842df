//! Configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (`__` separates nested keys, e.g. `APP_CACHE__MAX_SIZE_BYTES`). Every typed
//! section falls back to its documented defaults when absent.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use crate::types::DocumentType;

/// English stopwords dropped by the tokenizer unless overridden.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "but", "by", "for", "if", "in", "into", "is",
    "it", "no", "not", "of", "on", "or", "such", "that", "the", "their", "then", "there",
    "these", "they", "this", "to", "was", "will", "with", "i", "me", "my", "we", "you", "your",
    "please",
];

const DEFAULT_SYNONYMS: &[(&str, &[&str])] = &[
    ("login", &["signin", "sign", "log", "username", "password"]),
    ("signin", &["login"]),
    ("logout", &["signout", "log"]),
    ("signout", &["logout"]),
    ("signup", &["register"]),
    ("register", &["signup"]),
    ("button", &["btn"]),
    ("search", &["find"]),
    ("find", &["search"]),
];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> anyhow::Result<Self> {
        let config = Self { figment: Figment::new().merge(Toml::string(toml)) };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    pub fn search(&self) -> anyhow::Result<SearchConfig> {
        self.section("search")
    }

    pub fn cache(&self) -> anyhow::Result<CacheConfig> {
        self.section("cache")
    }

    pub fn embedding(&self) -> anyhow::Result<EmbeddingConfig> {
        self.section("embedding")
    }

    pub fn data(&self) -> anyhow::Result<DataConfig> {
        self.section("data")
    }

    /// Extracts `key` layered over the type's defaults, so partially specified
    /// sections keep defaults for the fields they omit.
    fn section<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: Default + Serialize + serde::de::DeserializeOwned,
    {
        if !self.figment.contains(key) {
            return Ok(T::default());
        }
        Figment::from(Serialized::defaults(T::default()))
            .merge(Serialized::defaults(self.figment.find_value(key)?))
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    fn validate(&self) -> anyhow::Result<()> {
        let search = self.search()?;
        if search.embedding_weight < 0.0 || search.lexical_weight < 0.0 {
            anyhow::bail!(crate::error::Error::InvalidConfig(
                "search weights must be non-negative".to_string()
            ));
        }
        if search.max_lexical_candidates == 0 {
            anyhow::bail!(crate::error::Error::InvalidConfig(
                "search.max_lexical_candidates must be at least 1".to_string()
            ));
        }
        let embedding = self.embedding()?;
        if embedding.dimension == 0 {
            anyhow::bail!(crate::error::Error::InvalidConfig(
                "embedding.dimension must be at least 1".to_string()
            ));
        }
        Ok(())
    }
}

/// Per-type multiplier applied to fused scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeBoosts {
    pub page: f32,
    pub element: f32,
    pub task: f32,
    pub step: f32,
}

impl Default for TypeBoosts {
    fn default() -> Self {
        Self { page: 1.05, element: 1.0, task: 1.03, step: 1.0 }
    }
}

impl TypeBoosts {
    pub fn for_type(&self, doc_type: DocumentType) -> f32 {
        match doc_type {
            DocumentType::Page => self.page,
            DocumentType::Element => self.element,
            DocumentType::Task => self.task,
            DocumentType::Step => self.step,
        }
    }
}

/// Ranking and query-processing settings for the hybrid engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Weight of the cosine similarity in the fused score.
    pub embedding_weight: f32,
    /// Weight of the BM25 score in the fused score.
    pub lexical_weight: f32,
    /// Upper bound on documents scored per query after lexical pruning.
    pub max_lexical_candidates: usize,
    pub default_max_results: usize,
    pub default_min_similarity: f32,
    pub boosts: TypeBoosts,
    pub stopwords: Vec<String>,
    /// Term -> extra query terms added during expansion.
    pub synonyms: HashMap<String, Vec<String>>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embedding_weight: 0.6,
            lexical_weight: 0.4,
            max_lexical_candidates: 500,
            default_max_results: 10,
            default_min_similarity: 0.3,
            boosts: TypeBoosts::default(),
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            synonyms: DEFAULT_SYNONYMS
                .iter()
                .map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect()))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: String,
    pub max_size_bytes: u64,
    pub expiration_days: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "~/.cache/intentdb/embeddings".to_string(),
            max_size_bytes: 100 * 1024 * 1024,
            expiration_days: 30,
        }
    }
}

impl CacheConfig {
    pub fn resolved_dir(&self) -> PathBuf {
        expand_path(&self.dir)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { provider: "hash".to_string(), dimension: 384 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub models_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self { models_dir: "demo_data/models".to_string() }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.search().unwrap(), SearchConfig::default());
        assert_eq!(config.cache().unwrap(), CacheConfig::default());
        assert_eq!(config.embedding().unwrap().dimension, 384);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            [search]
            max_lexical_candidates = 7

            [search.boosts]
            element = 1.2
            "#,
        )
        .unwrap();
        let search = config.search().unwrap();
        assert_eq!(search.max_lexical_candidates, 7);
        assert_eq!(search.boosts.element, 1.2);
        assert_eq!(search.boosts.page, TypeBoosts::default().page);
        assert_eq!(search.embedding_weight, 0.6);
        assert!(search.stopwords.iter().any(|s| s == "the"));
    }

    #[test]
    fn configured_synonyms_merge_over_defaults() {
        let config = Config::from_toml_str("[search.synonyms]\ncart = [\"basket\"]\n").unwrap();
        let synonyms = config.search().unwrap().synonyms;
        assert_eq!(synonyms["cart"], vec!["basket".to_string()]);
        assert!(synonyms.contains_key("login"));
    }

    #[test]
    fn rejects_zero_candidate_budget() {
        let err = Config::from_toml_str("[search]\nmax_lexical_candidates = 0\n");
        assert!(err.is_err());
    }

    #[test]
    fn raw_get_reads_nested_keys() {
        let config = Config::from_toml_str("[data]\nmodels_dir = \"/srv/models\"\n").unwrap();
        let dir: String = config.get("data.models_dir").unwrap();
        assert_eq!(dir, "/srv/models");
    }

    #[test]
    fn boosts_resolve_per_type() {
        let boosts = TypeBoosts { page: 1.0, element: 2.0, task: 3.0, step: 4.0 };
        assert_eq!(boosts.for_type(DocumentType::Task), 3.0);
        assert_eq!(boosts.for_type(DocumentType::Step), 4.0);
    }
}
