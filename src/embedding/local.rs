//! In-process sentence embeddings via fastembed.
//!
//! The model is downloaded from Hugging Face on first use and cached; after
//! that, embedding runs offline. The loaded model lives for the whole
//! process and is shared by every build and query.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::{check_batch, EmbeddingProvider, DEFAULT_LOCAL_MODEL};
use crate::config::EmbeddingConfig;

/// Embedding provider running a fastembed model locally.
pub struct LocalProvider {
    model_name: String,
    dims: usize,
    batch_size: usize,
    model: Arc<Mutex<fastembed::TextEmbedding>>,
}

impl LocalProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCAL_MODEL.to_string());
        let (fastembed_model, known_dims) = resolve_model(&model_name)?;
        let dims = local_dims(&model_name, config.dims, known_dims)?;

        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
        )
        .map_err(|e| anyhow::anyhow!("Failed to initialize local embedding model: {}", e))?;

        Ok(Self {
            model_name,
            dims,
            batch_size: config.batch_size,
            model: Arc::new(Mutex::new(model)),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for LocalProvider {
    fn model_name(&self) -> &str {
        &self.model_name
    }
    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        let batch_size = self.batch_size;
        let expected = texts.len();

        let vectors = tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| anyhow::anyhow!("Local embedding model lock poisoned"))?;
            model
                .embed(texts, Some(batch_size))
                .map_err(|e| anyhow::anyhow!("Local embedding failed: {}", e))
        })
        .await??;

        check_batch(&vectors, expected, self.dims)?;
        Ok(vectors)
    }
}

/// Native dimensionality of a supported local model.
pub(super) fn known_dims(name: &str) -> Option<usize> {
    resolve_model(name).ok().map(|(_, dims)| dims)
}

/// The model's output size is fixed; a configured `dims` may only restate it.
fn local_dims(model: &str, configured: Option<usize>, known: usize) -> Result<usize> {
    match configured {
        Some(dims) if dims != known => bail!(
            "embedding.dims = {} does not match local model '{}', which produces {} dims",
            dims,
            model,
            known
        ),
        _ => Ok(known),
    }
}

/// Map a config model name to the fastembed model and its native dimensionality.
fn resolve_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    use fastembed::EmbeddingModel as M;
    match name {
        "paraphrase-multilingual-minilm-l12-v2" => Ok((M::ParaphraseMLMiniLML12V2, 384)),
        "paraphrase-multilingual-mpnet-base-v2" => Ok((M::ParaphraseMLMpnetBaseV2, 768)),
        "all-minilm-l6-v2" => Ok((M::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((M::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((M::BGEBaseENV15, 768)),
        "multilingual-e5-small" => Ok((M::MultilingualE5Small, 384)),
        "multilingual-e5-base" => Ok((M::MultilingualE5Base, 768)),
        other => bail!(
            "Unknown local embedding model: '{}'. Supported models: \
             paraphrase-multilingual-minilm-l12-v2, paraphrase-multilingual-mpnet-base-v2, \
             all-minilm-l6-v2, bge-small-en-v1.5, bge-base-en-v1.5, \
             multilingual-e5-small, multilingual-e5-base",
            other
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_known() {
        let (_, dims) = resolve_model(DEFAULT_LOCAL_MODEL).unwrap();
        assert_eq!(dims, 384);
    }

    #[test]
    fn unknown_model_lists_supported() {
        let err = resolve_model("word2vec").unwrap_err();
        assert!(err.to_string().contains("paraphrase-multilingual-minilm-l12-v2"));
    }

    #[test]
    fn dims_override_must_match_model() {
        assert_eq!(local_dims(DEFAULT_LOCAL_MODEL, None, 384).unwrap(), 384);
        assert_eq!(local_dims(DEFAULT_LOCAL_MODEL, Some(384), 384).unwrap(), 384);
        let err = local_dims(DEFAULT_LOCAL_MODEL, Some(768), 384).unwrap_err();
        assert!(err.to_string().contains("768"));
    }
}
