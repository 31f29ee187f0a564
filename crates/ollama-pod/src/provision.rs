//! Pod creation and rejection diagnosis.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::ollama::{OLLAMA_IMAGE, OLLAMA_PORT};
use crate::providers::{CloudType, CreatePodRequest, EnvVar, PodProvider, PodProviderError};

/// Container disk size in GB.
pub const CONTAINER_DISK_GB: u32 = 20;

/// Inline volume size in GB, used when no network volume is attached.
pub const VOLUME_GB: u32 = 50;

/// Where a network volume is mounted; Ollama keeps its models here.
pub const VOLUME_MOUNT_PATH: &str = "/root/.ollama";

/// What to provision.
#[derive(Debug, Clone)]
pub struct PodSpec {
    /// GPU type ID.
    pub gpu_type_id: String,
    /// Pod name.
    pub name: String,
    /// Network volume to attach.
    pub network_volume_id: Option<String>,
    /// Cloud tier constraint.
    pub cloud_type: CloudType,
    /// Container image; defaults to [`OLLAMA_IMAGE`].
    pub image: Option<String>,
}

impl PodSpec {
    /// Build the provider request for this spec.
    #[must_use]
    pub fn to_request(&self) -> CreatePodRequest {
        let (volume_in_gb, volume_mount_path) = match self.network_volume_id {
            Some(_) => (None, Some(VOLUME_MOUNT_PATH.to_string())),
            None => (Some(VOLUME_GB), None),
        };

        CreatePodRequest {
            name: self.name.clone(),
            image_name: self
                .image
                .clone()
                .unwrap_or_else(|| OLLAMA_IMAGE.to_string()),
            gpu_type_id: self.gpu_type_id.clone(),
            gpu_count: 1,
            cloud_type: self.cloud_type,
            ports: format!("{OLLAMA_PORT}/http"),
            container_disk_in_gb: CONTAINER_DISK_GB,
            volume_in_gb,
            network_volume_id: self.network_volume_id.clone(),
            volume_mount_path,
            env: vec![EnvVar {
                key: "OLLAMA_HOST".to_string(),
                value: "0.0.0.0".to_string(),
            }],
        }
    }
}

/// Why the provider refused a creation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionKind {
    /// No machine could host the requested GPU under the given constraints.
    Unavailable,
    /// Anything else.
    Other,
}

/// Message fragments the provider uses when no matching machine exists.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "no longer any instances available",
    "no instances available",
    "not enough free gpus",
    "no available",
    "unavailable",
    "not available",
    "does not have the resources",
];

/// Classify a rejection message.
///
/// This is the only place that inspects provider message text. A message is
/// [`RejectionKind::Unavailable`] when it contains, case-insensitively, any of
/// the provider's "no capacity" phrasings (e.g. "There are no longer any
/// instances available with the requested specifications").
#[must_use]
pub fn classify_rejection(message: &str) -> RejectionKind {
    let lower = message.to_lowercase();
    if UNAVAILABLE_MARKERS.iter().any(|m| lower.contains(m)) {
        RejectionKind::Unavailable
    } else {
        RejectionKind::Other
    }
}

/// Turn a rejection into an operator-facing diagnostic.
///
/// A network volume pins the pod to the volume's datacenter. Pricing data is
/// global, so the chosen GPU may not exist on the requested tier in that
/// datacenter; when that combination is in play the diagnostic says so.
#[must_use]
pub fn diagnose_rejection(spec: &PodSpec, message: &str) -> String {
    match (
        classify_rejection(message),
        spec.network_volume_id.as_deref(),
        spec.cloud_type,
    ) {
        (RejectionKind::Unavailable, Some(volume_id), cloud_type) if cloud_type != CloudType::Any => {
            format!(
                "No {gpu} available as {cloud_type} cloud in the datacenter of volume {volume_id}. \
                 The volume pins the pod to one datacenter and GPU availability is reported globally. \
                 Retry with --cloud-type any or choose a different --gpu-type. (provider said: {message})",
                gpu = spec.gpu_type_id,
            )
        }
        _ => format!("Pod creation rejected: {message}"),
    }
}

/// Create a pod for `spec`. Returns the new pod ID.
///
/// # Errors
/// [`Error::Rejected`] with a diagnostic when the provider refuses the
/// request, or the underlying provider error otherwise.
pub async fn provision<P: PodProvider + ?Sized>(provider: &P, spec: &PodSpec) -> Result<String> {
    info!(
        name = %spec.name,
        gpu_type = %spec.gpu_type_id,
        cloud_type = %spec.cloud_type,
        volume = spec.network_volume_id.as_deref().unwrap_or("-"),
        "Provisioning pod"
    );

    match provider.create_pod(spec.to_request()).await {
        Ok(pod) => {
            info!(pod_id = %pod.id, "Pod provisioned");
            Ok(pod.id)
        }
        Err(PodProviderError::Rejected(message)) => {
            warn!(reason = %message, "Provider rejected pod creation");
            Err(Error::Rejected {
                diagnostic: diagnose_rejection(spec, &message),
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Look up the datacenter a network volume lives in.
///
/// # Errors
/// Returns the provider error if the account lookup fails.
pub async fn resolve_volume_datacenter<P: PodProvider + ?Sized>(
    provider: &P,
    volume_id: &str,
) -> Result<Option<String>> {
    let user = provider.get_user().await?;
    Ok(user
        .network_volumes
        .into_iter()
        .find(|v| v.id == volume_id)
        .and_then(|v| v.data_center_id))
}
