//! RunPod GraphQL API client implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info, warn};

use super::models::{
    DeployData, DeployInput, GpuTypeResource, GpuTypesData, GraphQlError, GraphQlRequest,
    GraphQlResponse, MyselfData, MyselfPodsData, PodData, PodResource,
};
use crate::providers::traits::{
    CreatePodRequest, GpuType, GpuTypeDetail, NetworkVolume, Pod, PodProvider, PodProviderError,
    PodRuntime, PortMapping, UserInfo,
};

/// GraphQL endpoint for RunPod.
pub const API_BASE_URL: &str = "https://api.runpod.io/graphql";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const POD_FIELDS: &str = "id name desiredStatus imageName costPerHr ports networkVolumeId \
    lastStatusChange machine { gpuDisplayName } \
    runtime { uptimeInSeconds ports { ip isIpPublic privatePort publicPort type } }";

const GPU_TYPES_QUERY: &str = "query GpuTypes { gpuTypes { id displayName memoryInGb } }";

const GPU_TYPE_QUERY: &str = "query GpuType($input: GpuTypeFilter) { \
    gpuTypes(input: $input) { id displayName memoryInGb secureCloud communityCloud \
    securePrice communityPrice \
    lowestPrice(input: { gpuCount: 1 }) { uninterruptablePrice } } }";

const MYSELF_QUERY: &str =
    "query Myself { myself { id networkVolumes { id name size dataCenterId } } }";

const TERMINATE_MUTATION: &str =
    "mutation Terminate($input: PodTerminateInput!) { podTerminate(input: $input) }";

/// RunPod pod provider.
#[derive(Clone)]
pub struct RunPod {
    /// HTTP client.
    client: Client,
    /// API key for authentication.
    api_key: String,
    /// GraphQL endpoint.
    base_url: String,
}

impl RunPod {
    /// Create a new RunPod provider against the public API.
    ///
    /// # Errors
    /// Returns error if the API key is empty or the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self, PodProviderError> {
        Self::with_base_url(api_key, API_BASE_URL)
    }

    /// Create a new RunPod provider against a specific GraphQL endpoint.
    ///
    /// # Errors
    /// Returns error if the API key is empty or the HTTP client cannot be created.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, PodProviderError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PodProviderError::Config("RunPod API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into(),
        })
    }

    /// Execute a GraphQL document and return the raw envelope.
    ///
    /// Transport and non-2xx failures become errors here; GraphQL-level
    /// `errors` are left for the caller to interpret.
    async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQlResponse<T>, PodProviderError> {
        debug!(url = %self.base_url, "GraphQL request");

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(&self.api_key)
            .json(&GraphQlRequest { query, variables })
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status.is_success() {
            serde_json::from_str(&text).map_err(|e| {
                warn!(error = %e, body = %text, "Failed to parse response");
                PodProviderError::Serialization(e)
            })
        } else if status == StatusCode::NOT_FOUND {
            Err(PodProviderError::NotFound(text))
        } else {
            Err(PodProviderError::Api {
                status: status.as_u16(),
                message: text,
            })
        }
    }

    /// Execute a query whose errors carry no special meaning.
    async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<T, PodProviderError> {
        let response = self.execute(query, variables).await?;
        if !response.errors.is_empty() {
            return Err(PodProviderError::Api {
                status: StatusCode::OK.as_u16(),
                message: join_errors(&response.errors),
            });
        }
        response.data.ok_or_else(|| PodProviderError::Api {
            status: StatusCode::OK.as_u16(),
            message: "response contained no data".to_string(),
        })
    }

    fn to_pod(resource: PodResource) -> Pod {
        Pod {
            id: resource.id,
            name: resource.name,
            desired_status: resource.desired_status,
            image_name: resource.image_name,
            cost_per_hr: resource.cost_per_hr.unwrap_or(0.0),
            ports: resource.ports,
            gpu_display_name: resource.machine.and_then(|m| m.gpu_display_name),
            network_volume_id: resource.network_volume_id,
            last_status_change: resource.last_status_change,
            runtime: resource.runtime.map(|r| PodRuntime {
                uptime_in_seconds: r.uptime_in_seconds,
                ports: r.ports.map(|ports| {
                    ports
                        .into_iter()
                        .map(|p| PortMapping {
                            ip: p.ip,
                            is_ip_public: p.is_ip_public.unwrap_or(false),
                            private_port: p.private_port,
                            public_port: p.public_port,
                            mapping_type: p.port_type.unwrap_or_default(),
                        })
                        .collect()
                }),
            }),
        }
    }

    fn to_gpu_detail(resource: GpuTypeResource) -> GpuTypeDetail {
        GpuTypeDetail {
            display_name: resource.display_name.unwrap_or_else(|| resource.id.clone()),
            id: resource.id,
            memory_in_gb: resource.memory_in_gb.unwrap_or(0.0),
            community_cloud: resource.community_cloud.unwrap_or(false),
            secure_cloud: resource.secure_cloud.unwrap_or(false),
            community_price: resource.community_price,
            secure_price: resource.secure_price,
            lowest_uninterruptable_price: resource
                .lowest_price
                .and_then(|p| p.uninterruptable_price),
        }
    }
}

fn join_errors(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

fn is_not_found_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not found") || lower.contains("does not exist")
}

#[async_trait]
impl PodProvider for RunPod {
    async fn list_gpu_types(&self) -> Result<Vec<GpuType>, PodProviderError> {
        let data: GpuTypesData = self.query(GPU_TYPES_QUERY, json!({})).await?;
        Ok(data
            .gpu_types
            .into_iter()
            .map(|g| GpuType {
                display_name: g.display_name.unwrap_or_else(|| g.id.clone()),
                id: g.id,
                memory_in_gb: g.memory_in_gb.unwrap_or(0.0),
            })
            .collect())
    }

    async fn get_gpu_type(&self, id: &str) -> Result<GpuTypeDetail, PodProviderError> {
        let data: GpuTypesData = self
            .query(GPU_TYPE_QUERY, json!({ "input": { "id": id } }))
            .await?;
        data.gpu_types
            .into_iter()
            .next()
            .map(Self::to_gpu_detail)
            .ok_or_else(|| PodProviderError::NotFound(id.to_string()))
    }

    async fn create_pod(&self, req: CreatePodRequest) -> Result<Pod, PodProviderError> {
        info!(name = %req.name, gpu_type = %req.gpu_type_id, cloud_type = %req.cloud_type, "Creating pod");

        let input = DeployInput {
            cloud_type: req.cloud_type.as_provider_value(),
            gpu_count: req.gpu_count,
            volume_in_gb: req.volume_in_gb,
            container_disk_in_gb: req.container_disk_in_gb,
            gpu_type_id: req.gpu_type_id,
            name: req.name,
            image_name: req.image_name,
            ports: req.ports,
            volume_mount_path: req.volume_mount_path,
            network_volume_id: req.network_volume_id,
            env: req.env,
        };
        let mutation = format!(
            "mutation Deploy($input: PodFindAndDeployOnDemandInput) {{ \
             podFindAndDeployOnDemand(input: $input) {{ {POD_FIELDS} }} }}"
        );

        let response: GraphQlResponse<DeployData> = self
            .execute(&mutation, json!({ "input": input }))
            .await?;
        if !response.errors.is_empty() {
            return Err(PodProviderError::Rejected(join_errors(&response.errors)));
        }

        let pod = response
            .data
            .and_then(|d| d.pod_find_and_deploy_on_demand)
            .map(Self::to_pod)
            .ok_or_else(|| {
                PodProviderError::Rejected("provider returned no pod".to_string())
            })?;

        info!(pod_id = %pod.id, "Pod created");
        Ok(pod)
    }

    async fn get_pod(&self, id: &str) -> Result<Pod, PodProviderError> {
        let query = format!("query Pod($input: PodFilter) {{ pod(input: $input) {{ {POD_FIELDS} }} }}");
        let response: GraphQlResponse<PodData> = self
            .execute(&query, json!({ "input": { "podId": id } }))
            .await?;

        if !response.errors.is_empty() {
            let message = join_errors(&response.errors);
            if is_not_found_message(&message) {
                return Err(PodProviderError::NotFound(id.to_string()));
            }
            return Err(PodProviderError::Api {
                status: StatusCode::OK.as_u16(),
                message,
            });
        }

        response
            .data
            .and_then(|d| d.pod)
            .map(Self::to_pod)
            .ok_or_else(|| PodProviderError::NotFound(id.to_string()))
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, PodProviderError> {
        let query = format!("query Pods {{ myself {{ pods {{ {POD_FIELDS} }} }} }}");
        let data: MyselfPodsData = self.query(&query, json!({})).await?;
        Ok(data.myself.pods.into_iter().map(Self::to_pod).collect())
    }

    async fn terminate_pod(&self, id: &str) -> Result<(), PodProviderError> {
        info!(pod_id = %id, "Terminating pod");

        let response: GraphQlResponse<serde_json::Value> = self
            .execute(TERMINATE_MUTATION, json!({ "input": { "podId": id } }))
            .await?;

        if !response.errors.is_empty() {
            let message = join_errors(&response.errors);
            if is_not_found_message(&message) {
                return Err(PodProviderError::NotFound(id.to_string()));
            }
            return Err(PodProviderError::Api {
                status: StatusCode::OK.as_u16(),
                message,
            });
        }

        info!(pod_id = %id, "Pod terminated");
        Ok(())
    }

    async fn get_user(&self) -> Result<UserInfo, PodProviderError> {
        let data: MyselfData = self.query(MYSELF_QUERY, json!({})).await?;
        Ok(UserInfo {
            id: data.myself.id,
            network_volumes: data
                .myself
                .network_volumes
                .unwrap_or_default()
                .into_iter()
                .map(|v| NetworkVolume {
                    id: v.id,
                    name: v.name,
                    size: v.size,
                    data_center_id: v.data_center_id,
                })
                .collect(),
        })
    }
}
