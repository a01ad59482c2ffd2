use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use fundfaq_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub const MINILM_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
pub const MINILM_DIM: usize = 384;
const MAX_LEN: usize = 256;
const MODEL_DIR_NAME: &str = "all-MiniLM-L6-v2";

/// all-MiniLM-L6-v2: BERT encoder, attention-masked mean pooling, L2 normalisation.
pub struct MiniLmEmbedder { model: BertModel, tokenizer: Tokenizer, device: Device }

impl MiniLmEmbedder {
    pub fn load(model_dir: Option<&Path>) -> Result<Self> {
        let device = select_device();
        let model_dir = resolve_model_dir(model_dir)?;
        info!(dir = %model_dir.display(), "loading {}", MINILM_ID);

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer.with_padding(None);

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let weights = load_weights(&model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DTYPE, &device);
        let model = BertModel::load(vb, &config)?;
        info!("{} loaded", MINILM_ID);
        Ok(Self { model, tokenizer, device })
    }

    fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let (input_ids, attention_mask) = tokenize_on_device(&self.tokenizer, text, MAX_LEN, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let emb = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1::<f32>()?;
        if emb.len() != MINILM_DIM { return Err(anyhow!("expected {} dims, model produced {}", MINILM_DIM, emb.len())); }
        let elapsed = start.elapsed();
        if elapsed.as_millis() > 250 { warn!(ms = elapsed.as_millis() as u64, "slow embedding"); } else { debug!(ms = elapsed.as_millis() as u64, "embedded text"); }
        Ok(emb)
    }
}

impl Embedder for MiniLmEmbedder {
    fn id(&self) -> &str { MINILM_ID }
    fn dim(&self) -> usize { MINILM_DIM }
    fn embed_batch(&self, texts: &[String]) -> fundfaq_core::Result<Vec<Vec<f32>>> {
        texts
            .iter()
            .map(|t| self.embed_text(t).map_err(|e| fundfaq_core::Error::Embedding(format!("{e:#}"))))
            .collect()
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        debug!(path = %safetensors.display(), "reading safetensors weights");
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        debug!(path = %pickle.display(), "reading pytorch weights");
        let weights = candle_core::pickle::read_all(&pickle)?;
        return weights
            .into_iter()
            .map(|(name, t)| -> Result<(String, Tensor)> { Ok((name, t.to_device(device)?)) })
            .collect();
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

fn resolve_model_dir(configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = configured {
        if p.exists() { return Ok(p.to_path_buf()); }
        return Err(anyhow!("Configured model directory {} does not exist", p.display()));
    }
    if let Ok(dir) = std::env::var("MODEL_DIR") { let p = PathBuf::from(&dir); if p.exists() { info!(dir = %p.display(), "using MODEL_DIR"); return Ok(p); } }
    for candidate in [Path::new("models").join(MODEL_DIR_NAME), Path::new("../models").join(MODEL_DIR_NAME)] {
        if candidate.exists() { return Ok(candidate); }
    }
    Err(anyhow!("Could not locate the {} model directory; set embedding.model_dir or MODEL_DIR", MODEL_DIR_NAME))
}
