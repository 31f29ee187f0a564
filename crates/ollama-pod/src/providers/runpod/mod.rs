//! RunPod GPU pod provider.
//!
//! Implements the [`PodProvider`](crate::providers::traits::PodProvider) trait
//! against RunPod's GraphQL API.
//!
//! ## Example
//!
//! ```ignore
//! use ollama_pod::providers::runpod::RunPod;
//! use ollama_pod::providers::traits::PodProvider;
//!
//! let provider = RunPod::new(api_key)?;
//!
//! // List GPU types
//! let gpus = provider.list_gpu_types().await?;
//!
//! // Look up a pod
//! let pod = provider.get_pod("abc123").await?;
//! ```

mod client;
mod models;

pub use client::{RunPod, API_BASE_URL};
