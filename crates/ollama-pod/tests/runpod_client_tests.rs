//! RunPod GraphQL client against a mock API.

use ollama_pod::endpoint::resolve_endpoint;
use ollama_pod::providers::{CreatePodRequest, EnvVar};
use ollama_pod::runpod::RunPod;
use ollama_pod::{CloudType, PodProvider, PodProviderError, PodStatus};
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> RunPod {
    RunPod::with_base_url("test-key", server.uri()).unwrap()
}

fn pod_json(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": "default",
        "desiredStatus": "RUNNING",
        "imageName": "ollama/ollama",
        "costPerHr": 0.16,
        "ports": "11434/http",
        "networkVolumeId": null,
        "lastStatusChange": "Rented by User: Mon Jan 05 2026",
        "machine": { "gpuDisplayName": "RTX A5000" },
        "runtime": {
            "uptimeInSeconds": 42,
            "ports": [
                { "ip": "10.0.0.2", "isIpPublic": false, "privatePort": 11434, "publicPort": 11434, "type": "http" },
                { "ip": "194.68.245.3", "isIpPublic": true, "privatePort": 11434, "publicPort": 22055, "type": "tcp" }
            ]
        }
    })
}

fn request() -> CreatePodRequest {
    CreatePodRequest {
        name: "default".to_string(),
        image_name: "ollama/ollama".to_string(),
        gpu_type_id: "NVIDIA RTX A5000".to_string(),
        gpu_count: 1,
        cloud_type: CloudType::Secure,
        ports: "11434/http".to_string(),
        container_disk_in_gb: 20,
        volume_in_gb: None,
        network_volume_id: Some("vol-1".to_string()),
        volume_mount_path: Some("/root/.ollama".to_string()),
        env: vec![EnvVar {
            key: "OLLAMA_HOST".to_string(),
            value: "0.0.0.0".to_string(),
        }],
    }
}

#[tokio::test]
async fn test_get_pod_parses_runtime() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({ "variables": { "input": { "podId": "abc" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "pod": pod_json("abc") } })))
        .mount(&server)
        .await;

    let pod = provider(&server).get_pod("abc").await.unwrap();

    assert_eq!(pod.desired_status, Some(PodStatus::Running));
    assert_eq!(pod.gpu_display_name.as_deref(), Some("RTX A5000"));
    assert!(pod.is_ready());
    assert_eq!(resolve_endpoint(&pod), "http://194.68.245.3:22055");
}

#[tokio::test]
async fn test_get_pod_null_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "pod": null } })))
        .mount(&server)
        .await;

    let err = provider(&server).get_pod("gone").await.unwrap_err();
    assert!(matches!(err, PodProviderError::NotFound(ref id) if id == "gone"));
}

#[tokio::test]
async fn test_get_pod_not_found_error_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "Pod not found" }]
        })))
        .mount(&server)
        .await;

    let err = provider(&server).get_pod("gone").await.unwrap_err();
    assert!(matches!(err, PodProviderError::NotFound(_)));
}

#[tokio::test]
async fn test_unauthorized_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let err = provider(&server).list_pods().await.unwrap_err();
    assert!(matches!(err, PodProviderError::Api { status: 401, .. }));
}

#[tokio::test]
async fn test_create_pod_sends_deploy_input() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("podFindAndDeployOnDemand"))
        .and(body_partial_json(json!({
            "variables": {
                "input": {
                    "cloudType": "SECURE",
                    "gpuTypeId": "NVIDIA RTX A5000",
                    "networkVolumeId": "vol-1",
                    "volumeMountPath": "/root/.ollama",
                    "containerDiskInGb": 20,
                    "env": [{ "key": "OLLAMA_HOST", "value": "0.0.0.0" }]
                }
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "podFindAndDeployOnDemand": { "id": "new-pod" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let pod = provider(&server).create_pod(request()).await.unwrap();
    assert_eq!(pod.id, "new-pod");
}

#[tokio::test]
async fn test_create_pod_graphql_error_is_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "podFindAndDeployOnDemand": null },
            "errors": [{ "message": "There are no longer any instances available with the requested specifications." }]
        })))
        .mount(&server)
        .await;

    let err = provider(&server).create_pod(request()).await.unwrap_err();
    assert!(matches!(err, PodProviderError::Rejected(ref msg) if msg.contains("no longer any instances")));
}

#[tokio::test]
async fn test_list_pods_and_user_volumes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("networkVolumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "myself": {
                "id": "user-1",
                "networkVolumes": [
                    { "id": "vol-1", "name": "models", "size": 100, "dataCenterId": "EU-RO-1" }
                ]
            } }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("pods"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "myself": { "pods": [pod_json("a"), pod_json("b")] } }
        })))
        .mount(&server)
        .await;

    let runpod = provider(&server);

    let user = runpod.get_user().await.unwrap();
    assert_eq!(user.network_volumes.len(), 1);
    assert_eq!(user.network_volumes[0].data_center_id.as_deref(), Some("EU-RO-1"));

    let pods = runpod.list_pods().await.unwrap();
    let ids: Vec<_> = pods.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert!(pods.iter().all(|p| p.exposes_port(11434)));
}

#[tokio::test]
async fn test_gpu_type_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "variables": { "input": { "id": "NVIDIA RTX A5000" } } })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "gpuTypes": [{
                "id": "NVIDIA RTX A5000",
                "displayName": "RTX A5000",
                "memoryInGb": 24,
                "secureCloud": true,
                "communityCloud": true,
                "securePrice": 0.26,
                "communityPrice": 0.16,
                "lowestPrice": { "minimumBidPrice": 0.1, "uninterruptablePrice": 0.16 }
            }] }
        })))
        .mount(&server)
        .await;

    let detail = provider(&server)
        .get_gpu_type("NVIDIA RTX A5000")
        .await
        .unwrap();

    assert!((detail.memory_in_gb - 24.0).abs() < f64::EPSILON);
    assert!(detail.community_cloud && detail.secure_cloud);
    assert_eq!(detail.lowest_uninterruptable_price, Some(0.16));
}

#[tokio::test]
async fn test_terminate_missing_pod_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("podTerminate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "pod does not exist" }]
        })))
        .mount(&server)
        .await;

    let err = provider(&server).terminate_pod("gone").await.unwrap_err();
    assert!(matches!(err, PodProviderError::NotFound(_)));
}
