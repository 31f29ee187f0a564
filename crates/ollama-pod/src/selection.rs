//! Cheapest-GPU selection.
//!
//! Availability and pricing come from the provider's global catalogue. They
//! are not scoped to a datacenter, so a selection made here can still be
//! refused at creation time (see [`crate::provision::classify_rejection`]).

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::providers::{CloudType, GpuTypeDetail, PodProvider};

/// A GPU type with a usable price under a cloud constraint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuQuote {
    /// GPU type ID.
    pub gpu_type_id: String,
    /// VRAM in GB.
    pub memory_in_gb: f64,
    /// Hourly price in USD.
    pub price_per_hr: f64,
    /// Cloud tier the price applies to.
    pub cloud_type: CloudType,
}

/// The GPU chosen for a provisioning attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuSelection {
    /// GPU type ID.
    pub gpu_type_id: String,
    /// Hourly price in USD; `0.0` when the GPU was picked manually.
    pub price_per_hr: f64,
    /// Cloud tier actually used.
    pub cloud_type: CloudType,
}

impl GpuSelection {
    /// A selection made by the operator, bypassing the price lookup.
    #[must_use]
    pub fn manual(gpu_type_id: impl Into<String>, cloud_type: CloudType) -> Self {
        Self {
            gpu_type_id: gpu_type_id.into(),
            price_per_hr: 0.0,
            cloud_type,
        }
    }

    /// Whether the price is known.
    #[must_use]
    pub fn has_price(&self) -> bool {
        self.price_per_hr > 0.0
    }
}

impl From<GpuQuote> for GpuSelection {
    fn from(quote: GpuQuote) -> Self {
        Self {
            gpu_type_id: quote.gpu_type_id,
            price_per_hr: quote.price_per_hr,
            cloud_type: quote.cloud_type,
        }
    }
}

/// Zero and missing prices both mean "no price".
fn usable(price: Option<f64>) -> Option<f64> {
    price.filter(|p| *p > 0.0)
}

/// Derive `(price, resolved cloud)` for a GPU under a cloud constraint.
///
/// Returns `None` when the GPU cannot be bought under the constraint.
#[must_use]
pub fn price_and_cloud(detail: &GpuTypeDetail, cloud_type: CloudType) -> Option<(f64, CloudType)> {
    match cloud_type {
        CloudType::Community => {
            if !detail.community_cloud {
                return None;
            }
            usable(detail.community_price).map(|p| (p, CloudType::Community))
        }
        CloudType::Secure => {
            if !detail.secure_cloud {
                return None;
            }
            usable(detail.secure_price).map(|p| (p, CloudType::Secure))
        }
        CloudType::Any => {
            let price = usable(detail.lowest_uninterruptable_price).or_else(|| {
                [detail.community_price, detail.secure_price]
                    .into_iter()
                    .filter_map(usable)
                    .reduce(f64::min)
            })?;

            if !detail.community_cloud && !detail.secure_cloud {
                return None;
            }

            // Community wins whenever it has capacity.
            let resolved = if detail.community_cloud {
                CloudType::Community
            } else {
                CloudType::Secure
            };
            Some((price, resolved))
        }
    }
}

/// Quote every GPU type with at least `min_vram_gb` VRAM that can be bought
/// under `cloud_type`, in catalogue order.
///
/// # Errors
/// [`Error::NoCandidate`] when no GPU type meets the VRAM floor, or a
/// provider error from the catalogue or pricing lookups.
pub async fn quote_gpus<P: PodProvider + ?Sized>(
    provider: &P,
    min_vram_gb: f64,
    cloud_type: CloudType,
) -> Result<Vec<GpuQuote>> {
    let gpus = provider.list_gpu_types().await?;
    let candidates: Vec<_> = gpus
        .into_iter()
        .filter(|g| g.memory_in_gb >= min_vram_gb)
        .collect();

    if candidates.is_empty() {
        return Err(Error::NoCandidate { min_vram_gb });
    }

    let mut quotes = Vec::with_capacity(candidates.len());
    for gpu in candidates {
        let detail = provider.get_gpu_type(&gpu.id).await?;
        match price_and_cloud(&detail, cloud_type) {
            Some((price_per_hr, resolved)) => quotes.push(GpuQuote {
                gpu_type_id: gpu.id,
                memory_in_gb: gpu.memory_in_gb,
                price_per_hr,
                cloud_type: resolved,
            }),
            None => debug!(gpu_type = %gpu.id, %cloud_type, "Skipping GPU without usable price"),
        }
    }

    Ok(quotes)
}

/// Find the cheapest GPU with at least `min_vram_gb` VRAM.
///
/// Ties go to the GPU listed first by the provider.
///
/// # Errors
/// [`Error::NoCandidate`] when no GPU type meets the VRAM floor,
/// [`Error::NoAvailable`] when none of those can be bought under `cloud_type`.
pub async fn select_gpu<P: PodProvider + ?Sized>(
    provider: &P,
    min_vram_gb: f64,
    cloud_type: CloudType,
) -> Result<GpuSelection> {
    let quotes = quote_gpus(provider, min_vram_gb, cloud_type).await?;

    let mut best: Option<GpuQuote> = None;
    for quote in quotes {
        if best
            .as_ref()
            .is_none_or(|b| quote.price_per_hr < b.price_per_hr)
        {
            best = Some(quote);
        }
    }

    let best = best.ok_or(Error::NoAvailable {
        min_vram_gb,
        cloud_type,
    })?;

    info!(
        gpu_type = %best.gpu_type_id,
        price_per_hr = best.price_per_hr,
        cloud_type = %best.cloud_type,
        "Selected GPU"
    );
    Ok(best.into())
}
