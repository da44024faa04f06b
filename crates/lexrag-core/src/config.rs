//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults + `config.toml` + `config.<env>.toml`
//! + `APP_*` env vars (`__` separates nested keys, e.g. `APP_RETRIEVAL__TOP_K`).

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::data_processor::ChunkingConfig;
use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    /// Load from the current directory for the `RUST_ENV` environment.
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_from(Path::new("."), &env_name)
    }

    pub fn load_from(dir: &Path, env_name: &str) -> anyhow::Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.settings()?.validate()?;
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

    pub fn settings(&self) -> anyhow::Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalSettings,
    pub embedding: EmbeddingSettings,
    pub generation: GenerationSettings,
    pub confidence: ConfidenceSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// Directory of raw legal documents consumed by the index builder.
    pub source_dir: String,
    /// Directory holding the persisted vector collection.
    pub persist_dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self { source_dir: "data/legal".to_string(), persist_dir: "prebuilt_vector_store".to_string() }
    }
}

impl DataSettings {
    pub fn source_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.source_dir) }
    pub fn persist_path(&self, base: &Path) -> PathBuf { resolve_with_base(base, &self.persist_dir) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub min_score: f32,
    /// Characters of chunk text kept in a source preview.
    pub preview_chars: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self { Self { top_k: 3, min_score: 0.3, preview_chars: 200 } }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Local directory with `config.json`, `tokenizer.json` and weights.
    pub model_dir: Option<String>,
    /// Use the deterministic hashing embedder instead of a model.
    pub use_fake: bool,
    pub fake_dim: usize,
    /// Token budget per input; longer inputs are truncated.
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { model_dir: Some("models/all-MiniLM-L6-v2".to_string()), use_fake: false, fake_dim: 384, max_len: 256 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// OpenAI-compatible API root; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: usize,
    pub timeout_secs: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.1-8b-instant".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: 0.1,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

/// Constants of the heuristic confidence policy.
///
/// With sources: `floor + weight * top_score`, clamped to `[0, 1]`.
/// Without sources: `baseline`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    pub baseline: f32,
    pub floor: f32,
    pub weight: f32,
}

impl Default for ConfidenceSettings {
    fn default() -> Self { Self { baseline: 0.8, floor: 0.5, weight: 0.5 } }
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f32| {
            if (0.0..=1.0).contains(&v) { Ok(()) } else { Err(Error::InvalidConfig(format!("{name} must lie in [0, 1], got {v}"))) }
        };
        if self.retrieval.top_k == 0 { return Err(Error::InvalidConfig("retrieval.top_k must be >= 1".into())); }
        unit("retrieval.min_score", self.retrieval.min_score)?;
        if self.retrieval.preview_chars == 0 { return Err(Error::InvalidConfig("retrieval.preview_chars must be > 0".into())); }
        if self.chunking.max_tokens == 0 { return Err(Error::InvalidConfig("chunking.max_tokens must be > 0".into())); }
        if !(0.0..1.0).contains(&self.chunking.overlap_percent) {
            return Err(Error::InvalidConfig(format!("chunking.overlap_percent must lie in [0, 1), got {}", self.chunking.overlap_percent)));
        }
        if self.embedding.fake_dim == 0 || self.embedding.max_len == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim and embedding.max_len must be > 0".into()));
        }
        unit("confidence.baseline", self.confidence.baseline)?;
        unit("confidence.floor", self.confidence.floor)?;
        unit("confidence.weight", self.confidence.weight)?;
        Ok(())
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

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
