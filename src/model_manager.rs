use std::sync::Mutex;

use candle_core::{Device, Tensor};
use pylate_rs::ColBERT;

use crate::{
    config_db::{ConfigDb, MODEL_NAME_KEY},
    embedder::Embedder,
    error::{Error, Result},
    scoring::normalize,
};

pub const DEFAULT_MODEL_ID: &str = "lightonai/GTE-ModernColBERT-v1";
pub const MODEL_ENV_VAR: &str = "CVSEARCH_MODEL";

/// Where the active model id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    Flag,
    Env,
    Config,
    Default,
}

impl ModelSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ModelSource::Flag => "flag",
            ModelSource::Env => "env",
            ModelSource::Config => "config",
            ModelSource::Default => "default",
        }
    }
}

/// Resolve the model id from `--model`, then `CVSEARCH_MODEL`, then the
/// stored `model_name` setting, then the default.
pub fn resolve_model_id(
    explicit: Option<&str>,
    config_db: &ConfigDb,
) -> Result<(String, ModelSource)> {
    if let Some(model) = explicit {
        return Ok((model.to_string(), ModelSource::Flag));
    }
    if let Ok(model) = std::env::var(MODEL_ENV_VAR) {
        return Ok((model, ModelSource::Env));
    }
    if let Some(model) = config_db.get_setting(MODEL_NAME_KEY)? {
        return Ok((model, ModelSource::Config));
    }
    Ok((DEFAULT_MODEL_ID.to_string(), ModelSource::Default))
}

/// Select the best available compute device.
///
/// Uses CUDA when compiled with the `cuda` feature, Metal when compiled with
/// the `metal` feature, and falls back to CPU otherwise.
fn default_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        if let Ok(device) = Device::new_cuda(0) {
            return device;
        }
    }

    #[cfg(feature = "metal")]
    {
        if let Ok(device) = Device::new_metal(0) {
            return device;
        }
    }

    Device::Cpu
}

fn model_err(e: impl std::fmt::Display) -> Error {
    Error::Model(e.to_string())
}

/// Manages the ColBERT model lifecycle, loading it lazily on first use.
pub struct ModelManager {
    model: Option<ColBERT>,
    model_id: String,
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelManager {
    /// Creates a new `ModelManager`. The model ID is resolved from:
    /// 1. The `CVSEARCH_MODEL` environment variable, if set
    /// 2. Otherwise, the default model (`lightonai/GTE-ModernColBERT-v1`)
    pub fn new() -> Self {
        let model_id = std::env::var(MODEL_ENV_VAR)
            .unwrap_or_else(|_| DEFAULT_MODEL_ID.to_string());
        Self::with_model_id(model_id)
    }

    /// Creates a `ModelManager` with an explicit model ID, bypassing
    /// environment variable resolution.
    pub fn with_model_id(model_id: String) -> Self {
        Self {
            model: None,
            model_id,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    fn ensure_loaded(&mut self) -> Result<&mut ColBERT> {
        if self.model.is_none() {
            tracing::info!(model = %self.model_id, "loading ColBERT model");
            let colbert: ColBERT = ColBERT::from(&self.model_id)
                .with_device(default_device())
                .try_into()
                .map_err(model_err)?;
            self.model = Some(colbert);
        }

        self.model
            .as_mut()
            .ok_or_else(|| Error::Model("model failed to load".to_string()))
    }

    /// Encode text into one unit vector by mean-pooling its token
    /// embeddings.
    ///
    /// Queries and field contents both go through the document encoder so
    /// the pooled vectors live in the same space.
    pub fn encode_pooled(&mut self, text: &str) -> Result<Vec<f32>> {
        let model = self.ensure_loaded()?;
        // [1, T, D]
        let embeddings = model
            .encode(&[text.to_string()], false)
            .map_err(model_err)?;
        let mut pooled = mean_pool(&embeddings.squeeze(0).map_err(model_err)?)?;
        normalize(&mut pooled);
        Ok(pooled)
    }
}

/// Average a `[T, D]` token matrix into a `[D]` vector.
fn mean_pool(tokens: &Tensor) -> Result<Vec<f32>> {
    tokens
        .mean(0)
        .and_then(|t| t.to_vec1::<f32>())
        .map_err(model_err)
}

/// Thread-safe [`Embedder`] over a lazily loaded ColBERT model.
pub struct ColbertEmbedder {
    inner: Mutex<ModelManager>,
}

impl ColbertEmbedder {
    pub fn new(manager: ModelManager) -> Self {
        Self {
            inner: Mutex::new(manager),
        }
    }
}

impl Embedder for ColbertEmbedder {
    fn name(&self) -> &'static str {
        "colbert"
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut manager = self
            .inner
            .lock()
            .map_err(|_| Error::Model("model lock poisoned".to_string()))?;
        manager.encode_pooled(text)
    }
}
