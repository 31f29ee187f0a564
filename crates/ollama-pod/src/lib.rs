//! Ollama on rented GPUs.
//!
//! This crate finds the cheapest RunPod GPU with enough VRAM for an Ollama
//! model, starts an Ollama pod on it, waits for the pod to come up, pulls the
//! model, and keeps a local record of the pod so it can be inspected and torn
//! down later.
//!
//! ## Flow
//!
//! ```text
//!   model ──► registry ──► VRAM estimate ──► cheapest GPU ──► create pod
//!                                                                 │
//!   local record ◄── pull model ◄── endpoint ◄── wait for runtime ◄┘
//! ```
//!
//! A pod that never becomes ready, or whose model pull fails, is terminated
//! before the error is returned.
//!
//! ## Example
//!
//! ```ignore
//! use ollama_pod::{Config, Deployer, TrackingMode, UpOptions};
//!
//! let config = Config::new(api_key, None, TrackingMode::Named)?;
//! let deployer = Deployer::from_config(&config)?;
//!
//! deployer.up(UpOptions::new("qwen2.5:7b")).await?;
//! deployer.down("default").await?;
//! ```

pub mod config;
pub mod endpoint;
pub mod error;
pub mod lifecycle;
pub mod ollama;
pub mod providers;
pub mod provision;
pub mod readiness;
pub mod registry;
pub mod selection;
pub mod state;

pub use config::Config;
pub use error::{Error, Result};
pub use lifecycle::{Deployer, DownOutcome, PodReport, StatusReport, UpOptions, UpOutcome, UpPlan};
pub use providers::runpod;
pub use providers::traits::{CloudType, Pod, PodProvider, PodProviderError, PodStatus};
pub use selection::{GpuQuote, GpuSelection};
pub use state::{PodStore, TrackedPod, TrackingMode};
