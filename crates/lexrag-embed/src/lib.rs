//! Sentence embeddings for queries and document chunks.
//!
//! [`BertEmbedder`] runs a local BERT-family sentence encoder with candle;
//! [`HashEmbedder`] is a deterministic token-hashing stand-in used by tests and
//! offline development.

use anyhow::anyhow;
use std::collections::HashMap;
use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{info, warn};
use twox_hash::XxHash64;

use lexrag_core::config::{resolve_with_base, EmbeddingSettings};
use lexrag_core::traits::Embedder;
use lexrag_core::{Error, Result};

mod device;
mod pool;
mod tokenize;

pub use device::select_device;
pub use pool::masked_mean_l2;
pub use tokenize::tokenize_on_device;

pub struct BertEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device, id: String, dim: usize, max_len: usize }

impl BertEmbedder {
    /// Load `config.json`, `tokenizer.json` and `model.safetensors` (or
    /// `pytorch_model.bin`) from `model_dir`.
    pub fn new(model_dir: &Path, max_len: usize) -> Result<Self> {
        Self::load(model_dir, max_len).map_err(|e| Error::ModelUnavailable(format!("{}: {:#}", model_dir.display(), e)))
    }

    fn load(model_dir: &Path, max_len: usize) -> anyhow::Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading sentence encoder");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        let config_text = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: BertConfig = serde_json::from_str(&config_text)?;
        let raw: serde_json::Value = serde_json::from_str(&config_text)?;
        let dim = raw["hidden_size"].as_u64().ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;
        let max_positions = raw["max_position_embeddings"].as_u64().map_or(max_len, |v| v as usize);

        let safetensors = model_dir.join("model.safetensors");
        let weights: HashMap<String, Tensor> = if safetensors.exists() {
            candle_core::safetensors::load(&safetensors, &device)?
        } else {
            candle_core::pickle::read_all(model_dir.join("pytorch_model.bin"))?.into_iter().collect()
        };
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &config)?;
        let name = model_dir.file_name().map_or_else(|| "model".to_string(), |n| n.to_string_lossy().to_string());
        let id = format!("bert:{}:d{}", name, dim);
        info!(%id, "sentence encoder ready");
        Ok(Self { model, tokenizer, device, id, dim, max_len: max_len.min(max_positions) })
    }

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let mask = attention_mask.to_dtype(DType::F32)?;
        let pooled = masked_mean_l2(&hidden, &mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if start.elapsed().as_millis() > 250 { warn!(ms = start.elapsed().as_millis() as u64, "slow embedding"); }
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let v = self.embed_text(text).map_err(|e| Error::Embedding(format!("{:#}", e)))?;
        if v.len() != self.dim { return Err(Error::DimensionMismatch { expected: self.dim, actual: v.len() }); }
        Ok(v)
    }
}

/// Bag-of-tokens hashing embedder. Tokens are lowercased and stripped of
/// surrounding punctuation, each adds a hashed weight to one bucket, and the
/// result is L2-normalised. Input without tokens maps to a fixed unit vector.
pub struct HashEmbedder { dim: usize, id: String }

impl HashEmbedder {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 { return Err(Error::InvalidConfig("hashing embedder needs at least one dimension".into())); }
        Ok(Self { dim, id: format!("hash:xxh64:d{}", dim) })
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0f32; self.dim];
        let mut tokens = 0usize;
        for raw in text.split_whitespace() {
            let token = raw.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase();
            if token.is_empty() { continue; }
            let mut hasher = XxHash64::with_seed(0);
            hasher.write(token.as_bytes());
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let val = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val;
            tokens += 1;
        }
        if tokens == 0 { v[0] = 1.0; return Ok(v); }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v { *x /= norm; }
        Ok(v)
    }
}

/// Build the process-wide embedder from settings.
///
/// `APP_USE_FAKE_EMBEDDINGS=1` forces the [`HashEmbedder`] regardless of
/// configuration.
pub fn get_default_embedder(settings: &EmbeddingSettings, base: &Path) -> Result<Arc<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS").ok().is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));
    if settings.use_fake || env_fake {
        info!(dim = settings.fake_dim, "using hashing embedder");
        return Ok(Arc::new(HashEmbedder::new(settings.fake_dim)?));
    }
    let model_dir = resolve_model_dir(settings, base)?;
    Ok(Arc::new(BertEmbedder::new(&model_dir, settings.max_len)?))
}

fn resolve_model_dir(settings: &EmbeddingSettings, base: &Path) -> Result<PathBuf> {
    if let Some(dir) = &settings.model_dir {
        let p = resolve_with_base(base, dir);
        if p.exists() { return Ok(p); }
        warn!(dir = %p.display(), "configured model dir does not exist");
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") {
        let p = PathBuf::from(&dir);
        if p.exists() { info!(dir = %p.display(), "using MODEL_DIR"); return Ok(p); }
    }
    Err(Error::ModelUnavailable("could not locate a sentence encoder directory (set embedding.model_dir)".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_embedder_ignores_case_and_punctuation() {
        let e = HashEmbedder::new(64).unwrap();
        assert_eq!(e.embed("What is Negligence?").unwrap(), e.embed("what is negligence").unwrap());
    }

    #[test]
    fn hash_embedder_empty_input_is_unit_vector() {
        let v = HashEmbedder::new(8).unwrap().embed("  ?! ").unwrap();
        assert_eq!(v[0], 1.0);
        assert!(v[1..].iter().all(|x| *x == 0.0));
    }

    #[test]
    fn hash_embedder_rejects_zero_dimensions() {
        assert!(matches!(HashEmbedder::new(0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn missing_model_dir_is_model_unavailable() {
        let settings = EmbeddingSettings { model_dir: Some("/no/such/model".into()), use_fake: false, fake_dim: 8, max_len: 16 };
        std::env::remove_var("MODEL_DIR");
        let err = resolve_model_dir(&settings, Path::new("/")).unwrap_err();
        assert!(matches!(err, Error::ModelUnavailable(_)));
        let err = BertEmbedder::new(Path::new("/no/such/model"), 16).err().expect("load must fail");
        assert!(matches!(err, Error::ModelUnavailable(_)));
    }
}
