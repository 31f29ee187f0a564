//! Reachable URL of the Ollama service on a pod.

use crate::ollama::OLLAMA_PORT;
use crate::providers::Pod;

/// Domain of the provider's HTTP reverse proxy.
pub const PROXY_DOMAIN: &str = "proxy.runpod.net";

/// Reverse-proxy URL for a pod's Ollama port.
#[must_use]
pub fn proxy_url(pod_id: &str) -> String {
    format!("https://{pod_id}-{OLLAMA_PORT}.{PROXY_DOMAIN}")
}

/// Derive the Ollama URL from a pod's runtime port mappings.
///
/// A public mapping of the Ollama port is preferred: `https` when the mapping
/// is of type `http`, plain `http` otherwise. Without one, the provider's
/// reverse proxy is used.
#[must_use]
pub fn resolve_endpoint(pod: &Pod) -> String {
    let direct = pod
        .runtime
        .as_ref()
        .and_then(|r| r.ports.as_deref())
        .unwrap_or_default()
        .iter()
        .filter(|p| p.private_port == OLLAMA_PORT && p.is_ip_public)
        .find_map(|p| {
            let ip = p.ip.as_deref().filter(|ip| !ip.is_empty())?;
            let port = p.public_port?;
            let scheme = if p.mapping_type == "http" { "https" } else { "http" };
            Some(format!("{scheme}://{ip}:{port}"))
        });

    direct.unwrap_or_else(|| proxy_url(&pod.id))
}
