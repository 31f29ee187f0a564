//! Model size lookup against the Ollama registry.
//!
//! The VRAM estimate is the size of the weight layers times a fixed overhead
//! factor. It is a rough guide, not a memory simulation; callers can always
//! override it.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Registry base for library models.
pub const REGISTRY_BASE_URL: &str = "https://registry.ollama.ai/v2/library";

/// Media type of layers that hold model weights.
pub const MODEL_MEDIA_TYPE: &str = "application/vnd.ollama.image.model";

/// Multiplier applied to weight size to estimate VRAM.
pub const VRAM_OVERHEAD_FACTOR: f64 = 1.2;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

const BYTES_PER_GB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Errors from the model registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Registry returned an unexpected status.
    #[error("Registry error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The model or tag does not exist.
    #[error("Model not found: '{0}' (registry returned 404)")]
    NotFound(String),

    /// The manifest has no weight layers.
    #[error("No model layers found in manifest for '{0}'")]
    NoWeightLayers(String),
}

/// Image manifest.
#[derive(Debug, Deserialize)]
pub struct Manifest {
    /// Layers.
    #[serde(default)]
    pub layers: Vec<ManifestLayer>,
}

/// Manifest layer.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLayer {
    /// Layer media type.
    pub media_type: String,
    /// Size in bytes.
    pub size: u64,
}

impl Manifest {
    /// Total bytes of weight layers.
    #[must_use]
    pub fn weight_bytes(&self) -> u64 {
        self.layers
            .iter()
            .filter(|l| l.media_type == MODEL_MEDIA_TYPE)
            .map(|l| l.size)
            .sum()
    }
}

/// Split `name:tag` into `(name, tag)`; the tag defaults to `latest`.
#[must_use]
pub fn parse_model(model: &str) -> (&str, &str) {
    model.split_once(':').unwrap_or((model, "latest"))
}

/// Client for the Ollama model registry.
#[derive(Clone)]
pub struct ModelRegistry {
    client: Client,
    base_url: String,
}

impl ModelRegistry {
    /// Create a client for the public registry.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, RegistryError> {
        Self::with_base_url(REGISTRY_BASE_URL)
    }

    /// Create a client for a registry at `base_url`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, RegistryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the manifest for `name:tag`.
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] on 404, otherwise transport or status errors.
    pub async fn manifest(&self, name: &str, tag: &str) -> Result<Manifest, RegistryError> {
        let url = format!("{}/{name}/manifests/{tag}", self.base_url);
        debug!(url = %url, "Fetching manifest");

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(format!("{name}:{tag}")));
        }
        if !status.is_success() {
            return Err(RegistryError::Api {
                status: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        Ok(response.json().await?)
    }

    /// Size of a model's weights in GB (1 GB = 1024³ bytes).
    ///
    /// # Errors
    /// [`RegistryError::NotFound`] or [`RegistryError::NoWeightLayers`], or a
    /// transport error.
    pub async fn model_size_gb(&self, model: &str) -> Result<f64, RegistryError> {
        let (name, tag) = parse_model(model);
        let bytes = self.manifest(name, tag).await?.weight_bytes();
        if bytes == 0 {
            return Err(RegistryError::NoWeightLayers(model.to_string()));
        }

        #[allow(clippy::cast_precision_loss)]
        let size_gb = bytes as f64 / BYTES_PER_GB;
        Ok(size_gb)
    }

    /// Estimate VRAM needed to serve a model, in GB.
    ///
    /// # Errors
    /// See [`ModelRegistry::model_size_gb`].
    pub async fn estimate_vram_gb(&self, model: &str) -> Result<f64, RegistryError> {
        let size = self.model_size_gb(model).await?;
        let estimate = size * VRAM_OVERHEAD_FACTOR;
        debug!(model = %model, size_gb = size, estimate_gb = estimate, "Estimated VRAM");
        Ok(estimate)
    }
}
