//! Pod provider trait and common types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during pod provider operations.
#[derive(Error, Debug)]
pub enum PodProviderError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The provider refused to create the pod.
    #[error("Provider rejected the request: {0}")]
    Rejected(String),

    /// Resource not found.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Purchasing tier for a GPU.
///
/// `Community` is shared, spot-like capacity; `Secure` is dedicated. Price and
/// availability differ per tier for the same GPU type.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CloudType {
    /// No constraint; the provider may place the pod on either tier.
    #[default]
    Any,
    /// Community cloud only.
    Community,
    /// Secure cloud only.
    Secure,
}

impl CloudType {
    /// Value the provider API expects for this tier.
    #[must_use]
    pub fn as_provider_value(self) -> &'static str {
        match self {
            Self::Any => "ALL",
            Self::Community => "COMMUNITY",
            Self::Secure => "SECURE",
        }
    }
}

impl std::fmt::Display for CloudType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Any => write!(f, "any"),
            Self::Community => write!(f, "community"),
            Self::Secure => write!(f, "secure"),
        }
    }
}

/// A GPU type as it appears in the provider's catalogue listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpuType {
    /// GPU type ID (e.g., "NVIDIA RTX A5000").
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// VRAM in GB.
    pub memory_in_gb: f64,
}

/// Pricing and availability for a single GPU type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpuTypeDetail {
    /// GPU type ID.
    pub id: String,
    /// Human-readable name.
    pub display_name: String,
    /// VRAM in GB.
    pub memory_in_gb: f64,
    /// Whether community cloud currently has capacity.
    pub community_cloud: bool,
    /// Whether secure cloud currently has capacity.
    pub secure_cloud: bool,
    /// Hourly community cloud price in USD.
    pub community_price: Option<f64>,
    /// Hourly secure cloud price in USD.
    pub secure_price: Option<f64>,
    /// Provider-computed lowest non-interruptible hourly price.
    pub lowest_uninterruptable_price: Option<f64>,
}

/// Pod status as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PodStatus {
    /// Pod record exists but is not scheduled yet.
    Created,
    /// Pod is running.
    Running,
    /// Pod is restarting.
    Restarting,
    /// Pod container exited.
    Exited,
    /// Pod is paused.
    Paused,
    /// Pod is dead.
    Dead,
    /// Pod has been terminated.
    Terminated,
    /// Unknown status.
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for PodStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Restarting => write!(f, "restarting"),
            Self::Exited => write!(f, "exited"),
            Self::Paused => write!(f, "paused"),
            Self::Dead => write!(f, "dead"),
            Self::Terminated => write!(f, "terminated"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single port mapping on a running pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    /// Address the port is reachable on.
    pub ip: Option<String>,
    /// Whether `ip` is publicly routable.
    pub is_ip_public: bool,
    /// Port inside the container.
    pub private_port: u16,
    /// Port on `ip`.
    pub public_port: Option<u16>,
    /// Mapping type (`http` or `tcp`).
    pub mapping_type: String,
}

/// Evidence that the provider has scheduled the pod.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodRuntime {
    /// Seconds since the container started.
    pub uptime_in_seconds: Option<u64>,
    /// Port mappings, once networking is up.
    pub ports: Option<Vec<PortMapping>>,
}

impl PodRuntime {
    /// A runtime object with no fields set carries no readiness signal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uptime_in_seconds.is_none() && self.ports.is_none()
    }
}

/// A pod instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pod {
    /// Provider-assigned pod ID.
    pub id: String,
    /// Pod name.
    pub name: Option<String>,
    /// Desired status.
    pub desired_status: Option<PodStatus>,
    /// Container image.
    pub image_name: Option<String>,
    /// Hourly cost in USD.
    pub cost_per_hr: f64,
    /// Exposed ports in provider notation (e.g., "11434/http").
    pub ports: Option<String>,
    /// GPU display name of the host machine.
    pub gpu_display_name: Option<String>,
    /// Attached network volume.
    pub network_volume_id: Option<String>,
    /// Timestamp of the last status transition.
    pub last_status_change: Option<String>,
    /// Runtime descriptor; absent while the pod is pending.
    pub runtime: Option<PodRuntime>,
}

impl Pod {
    /// Whether the pod has a non-empty runtime descriptor.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.runtime.as_ref().is_some_and(|r| !r.is_empty())
    }

    /// Whether the pod exposes the given container port.
    #[must_use]
    pub fn exposes_port(&self, port: u16) -> bool {
        self.ports.as_deref().is_some_and(|p| {
            p.split(',')
                .filter_map(|entry| entry.trim().split('/').next())
                .any(|number| number.trim().parse::<u16>().ok() == Some(port))
        })
    }
}

/// Environment variable passed to the pod container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

/// Request to create a new pod.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePodRequest {
    /// Pod name.
    pub name: String,
    /// Container image.
    pub image_name: String,
    /// GPU type ID.
    pub gpu_type_id: String,
    /// Number of GPUs.
    pub gpu_count: u32,
    /// Cloud tier constraint.
    pub cloud_type: CloudType,
    /// Exposed ports in provider notation.
    pub ports: String,
    /// Container disk size in GB.
    pub container_disk_in_gb: u32,
    /// Inline volume size in GB; `None` when a network volume is attached.
    pub volume_in_gb: Option<u32>,
    /// Network volume to attach.
    pub network_volume_id: Option<String>,
    /// Mount path of the network volume.
    pub volume_mount_path: Option<String>,
    /// Container environment.
    pub env: Vec<EnvVar>,
}

/// Network volume owned by the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkVolume {
    /// Volume ID.
    pub id: String,
    /// Volume name.
    pub name: Option<String>,
    /// Size in GB.
    pub size: Option<u32>,
    /// Datacenter the volume lives in.
    pub data_center_id: Option<String>,
}

/// The authenticated account.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserInfo {
    /// Account ID.
    pub id: Option<String>,
    /// Network volumes owned by the account.
    pub network_volumes: Vec<NetworkVolume>,
}

/// Trait for GPU pod rental providers.
#[async_trait]
pub trait PodProvider: Send + Sync {
    /// List all GPU types in the catalogue.
    async fn list_gpu_types(&self) -> Result<Vec<GpuType>, PodProviderError>;

    /// Get pricing and availability for one GPU type.
    async fn get_gpu_type(&self, id: &str) -> Result<GpuTypeDetail, PodProviderError>;

    /// Create a new pod. Returns the created pod (at least its ID).
    async fn create_pod(&self, req: CreatePodRequest) -> Result<Pod, PodProviderError>;

    /// Get a pod by ID.
    async fn get_pod(&self, id: &str) -> Result<Pod, PodProviderError>;

    /// List all pods on the account.
    async fn list_pods(&self) -> Result<Vec<Pod>, PodProviderError>;

    /// Terminate a pod.
    async fn terminate_pod(&self, id: &str) -> Result<(), PodProviderError>;

    /// Get the authenticated account, including its network volumes.
    async fn get_user(&self) -> Result<UserInfo, PodProviderError>;
}
