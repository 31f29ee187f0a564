//! Pod provider implementations.
//!
//! This module contains the [`PodProvider`] trait and the RunPod
//! implementation of it.

pub mod runpod;
pub mod traits;

pub use traits::{
    CloudType, CreatePodRequest, EnvVar, GpuType, GpuTypeDetail, NetworkVolume, Pod, PodProvider,
    PodProviderError, PodRuntime, PodStatus, PortMapping, UserInfo,
};
