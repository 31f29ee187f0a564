//! RunPod GraphQL API models.
//!
//! Field names follow the provider's GraphQL schema (camelCase).

use serde::{Deserialize, Serialize};

use crate::providers::traits::{EnvVar, PodStatus};

// ============================================================================
// GraphQL envelope
// ============================================================================

/// GraphQL request body.
#[derive(Debug, Serialize)]
pub struct GraphQlRequest<'a> {
    /// Query or mutation document.
    pub query: &'a str,
    /// Variables referenced by the document.
    pub variables: serde_json::Value,
}

/// GraphQL response wrapper.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse<T> {
    /// Response data; absent when the whole operation failed.
    pub data: Option<T>,
    /// Errors reported by the server. GraphQL reports these with HTTP 200.
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

/// A single GraphQL error.
#[derive(Debug, Deserialize)]
pub struct GraphQlError {
    /// Error message.
    pub message: String,
}

// ============================================================================
// GPU types
// ============================================================================

/// `gpuTypes` query result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuTypesData {
    /// Matching GPU types.
    #[serde(default)]
    pub gpu_types: Vec<GpuTypeResource>,
}

/// GPU type resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GpuTypeResource {
    /// GPU type ID.
    pub id: String,
    /// Display name.
    pub display_name: Option<String>,
    /// VRAM in GB.
    pub memory_in_gb: Option<f64>,
    /// Secure cloud availability.
    pub secure_cloud: Option<bool>,
    /// Community cloud availability.
    pub community_cloud: Option<bool>,
    /// Secure cloud hourly price.
    pub secure_price: Option<f64>,
    /// Community cloud hourly price.
    pub community_price: Option<f64>,
    /// Lowest price summary (only on detail queries).
    pub lowest_price: Option<LowestPrice>,
}

/// Lowest price summary for a GPU type.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowestPrice {
    /// Lowest non-interruptible price.
    pub uninterruptable_price: Option<f64>,
}

// ============================================================================
// Pods
// ============================================================================

/// `pod` query result.
#[derive(Debug, Deserialize)]
pub struct PodData {
    /// The pod, or null when the ID is unknown.
    pub pod: Option<PodResource>,
}

/// `myself { pods }` query result.
#[derive(Debug, Deserialize)]
pub struct MyselfPodsData {
    /// Account.
    pub myself: MyselfPods,
}

/// Account pods.
#[derive(Debug, Deserialize)]
pub struct MyselfPods {
    /// Pods on the account.
    #[serde(default)]
    pub pods: Vec<PodResource>,
}

/// Pod resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResource {
    /// Pod ID.
    pub id: String,
    /// Pod name.
    pub name: Option<String>,
    /// Desired status.
    pub desired_status: Option<PodStatus>,
    /// Container image.
    pub image_name: Option<String>,
    /// Hourly cost.
    pub cost_per_hr: Option<f64>,
    /// Exposed ports (e.g., "11434/http").
    pub ports: Option<String>,
    /// Network volume ID.
    pub network_volume_id: Option<String>,
    /// Last status change timestamp.
    pub last_status_change: Option<String>,
    /// Host machine.
    pub machine: Option<MachineResource>,
    /// Runtime, once scheduled.
    pub runtime: Option<RuntimeResource>,
}

/// Host machine info.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineResource {
    /// GPU display name.
    pub gpu_display_name: Option<String>,
}

/// Pod runtime.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeResource {
    /// Uptime in seconds.
    pub uptime_in_seconds: Option<u64>,
    /// Port mappings.
    pub ports: Option<Vec<PortResource>>,
}

/// Runtime port mapping.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortResource {
    /// Address.
    pub ip: Option<String>,
    /// Whether `ip` is public.
    pub is_ip_public: Option<bool>,
    /// Container port.
    pub private_port: u16,
    /// Host port.
    pub public_port: Option<u16>,
    /// `http` or `tcp`.
    #[serde(rename = "type")]
    pub port_type: Option<String>,
}

/// `podFindAndDeployOnDemand` mutation result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployData {
    /// Created pod.
    pub pod_find_and_deploy_on_demand: Option<PodResource>,
}

/// Input for `podFindAndDeployOnDemand`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployInput {
    /// `ALL`, `COMMUNITY` or `SECURE`.
    pub cloud_type: &'static str,
    /// GPU count.
    pub gpu_count: u32,
    /// Inline volume size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_in_gb: Option<u32>,
    /// Container disk size.
    pub container_disk_in_gb: u32,
    /// GPU type ID.
    pub gpu_type_id: String,
    /// Pod name.
    pub name: String,
    /// Container image.
    pub image_name: String,
    /// Exposed ports.
    pub ports: String,
    /// Network volume mount path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_mount_path: Option<String>,
    /// Network volume ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_volume_id: Option<String>,
    /// Container environment.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

// ============================================================================
// Account
// ============================================================================

/// `myself` query result.
#[derive(Debug, Deserialize)]
pub struct MyselfData {
    /// Account.
    pub myself: MyselfResource,
}

/// Account resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyselfResource {
    /// Account ID.
    pub id: Option<String>,
    /// Network volumes.
    pub network_volumes: Option<Vec<NetworkVolumeResource>>,
}

/// Network volume resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkVolumeResource {
    /// Volume ID.
    pub id: String,
    /// Volume name.
    pub name: Option<String>,
    /// Size in GB.
    pub size: Option<u32>,
    /// Datacenter ID.
    pub data_center_id: Option<String>,
}
