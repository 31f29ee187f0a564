//! Runtime configuration.

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::providers::runpod::API_BASE_URL;
use crate::registry::REGISTRY_BASE_URL;
use crate::state::TrackingMode;

/// Directory under the home directory that holds local state.
pub const STATE_DIR_NAME: &str = ".ollama-pod";

/// Everything the lifecycle operations need from the outside world.
#[derive(Debug, Clone)]
pub struct Config {
    /// RunPod API key.
    pub api_key: String,
    /// RunPod GraphQL endpoint.
    pub provider_url: String,
    /// Ollama registry base for library models.
    pub registry_url: String,
    /// Local state directory.
    pub state_dir: PathBuf,
    /// How pods are addressed locally.
    pub tracking: TrackingMode,
}

impl Config {
    /// Build a configuration with default endpoints.
    ///
    /// `state_dir` falls back to [`default_state_dir`] when `None`.
    ///
    /// # Errors
    /// [`Error::Config`] when the API key is empty or no state directory can
    /// be determined.
    pub fn new(
        api_key: impl Into<String>,
        state_dir: Option<PathBuf>,
        tracking: TrackingMode,
    ) -> Result<Self> {
        let api_key = api_key.into().trim().to_string();
        if api_key.is_empty() {
            return Err(Error::Config(
                "Missing RunPod API key. Set RUNPOD_API_KEY or pass --api-key.".to_string(),
            ));
        }

        let state_dir = match state_dir {
            Some(dir) => dir,
            None => default_state_dir()?,
        };

        Ok(Self {
            api_key,
            provider_url: API_BASE_URL.to_string(),
            registry_url: REGISTRY_BASE_URL.to_string(),
            state_dir,
            tracking,
        })
    }
}

/// `~/.ollama-pod`.
///
/// # Errors
/// [`Error::Config`] when the home directory cannot be determined.
pub fn default_state_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(STATE_DIR_NAME))
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))
}
