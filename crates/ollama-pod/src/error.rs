//! Error types for pod lifecycle operations.

use thiserror::Error;

use crate::providers::{CloudType, PodProviderError};
use crate::registry::RegistryError;
use crate::state::StateError;

/// Errors surfaced to the operator by the lifecycle operations.
///
/// None of these are retried internally.
#[derive(Debug, Error)]
pub enum Error {
    /// No GPU type has enough VRAM.
    #[error(
        "No GPUs found with >= {min_vram_gb:.1} GB VRAM. \
         Try a smaller model or specify --gpu-type manually."
    )]
    NoCandidate { min_vram_gb: f64 },

    /// GPU types with enough VRAM exist but none can be bought under the constraint.
    #[error(
        "No available GPUs with >= {min_vram_gb:.1} GB VRAM (cloud_type={cloud_type}). \
         Try again later, broaden --cloud-type, or specify --gpu-type manually."
    )]
    NoAvailable {
        min_vram_gb: f64,
        cloud_type: CloudType,
    },

    /// The provider refused to create the pod.
    #[error("{diagnostic}")]
    Rejected { diagnostic: String },

    /// The pod never reported a runtime.
    #[error("Pod {pod_id} did not become ready within {timeout_secs}s")]
    ReadinessTimeout { pod_id: String, timeout_secs: u64 },

    /// Triggering the model pull on the pod failed.
    #[error("Model pull failed: {0}")]
    Transfer(String),

    /// A pod is already tracked under this name.
    #[error("Pod '{name}' already active: {pod_id} ({endpoint})")]
    AlreadyTracked {
        name: String,
        pod_id: String,
        endpoint: String,
    },

    /// No pod is tracked under this name.
    #[error("No pod named '{name}'{}", known_suffix(.known))]
    NotTracked { name: String, known: Vec<String> },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Provider call failed.
    #[error(transparent)]
    Provider(#[from] PodProviderError),

    /// Model registry lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Local state could not be read or written.
    #[error(transparent)]
    State(#[from] StateError),
}

fn known_suffix(known: &[String]) -> String {
    if known.is_empty() {
        ". No tracked pods found.".to_string()
    } else {
        format!(". Tracked pods: {}", known.join(", "))
    }
}

/// Result alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_tracked_lists_known_names() {
        let err = Error::NotTracked {
            name: "gpu2".to_string(),
            known: vec!["default".to_string(), "big".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No pod named 'gpu2'. Tracked pods: default, big"
        );

        let err = Error::NotTracked {
            name: "gpu2".to_string(),
            known: vec![],
        };
        assert_eq!(err.to_string(), "No pod named 'gpu2'. No tracked pods found.");
    }

    #[test]
    fn test_no_available_names_cloud_type() {
        let err = Error::NoAvailable {
            min_vram_gb: 10.0,
            cloud_type: CloudType::Secure,
        };
        assert!(err.to_string().contains("cloud_type=secure"));
    }
}
