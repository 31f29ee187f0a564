//! Local records of the pods this tool created.
//!
//! Records are a cache of provider truth. Each one is a JSON document written
//! whole; when none exist they can be rebuilt from the provider's live pod
//! listing with [`PodStore::reconcile_from_remote`].
//!
//! There is no locking. Two invocations touching the same name race, and the
//! last writer wins.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::endpoint::resolve_endpoint;
use crate::error::Result;
use crate::ollama::OLLAMA_PORT;
use crate::providers::{Pod, PodProvider, PodStatus};

/// Name used when none is given.
pub const DEFAULT_NAME: &str = "default";

const PODS_DIR: &str = "pods";
const SINGLE_SLOT_FILE: &str = "pod.json";
const UNKNOWN: &str = "unknown";

/// Errors from local state persistence.
#[derive(Error, Debug)]
pub enum StateError {
    /// File could not be read or written.
    #[error("State file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// File contents are not a valid record.
    #[error("Failed to parse state file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Name cannot be used as a file name.
    #[error("Invalid pod name '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidName(String),
}

impl StateError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// How pods are addressed locally.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    /// One pod, stored in a single fixed file. Names are ignored.
    Single,
    /// Any number of pods, one file per operator-chosen name.
    #[default]
    Named,
}

/// A pod this tool created and is tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPod {
    /// Tracking name; `None` in single-slot mode.
    pub name: Option<String>,
    /// Provider pod ID.
    pub pod_id: String,
    /// Model pulled onto the pod.
    pub model: String,
    /// Ollama URL.
    pub endpoint: String,
    /// GPU type ID.
    pub gpu_type: String,
    /// Hourly cost in USD; `0.0` when unknown.
    pub cost_per_hr: f64,
    /// Attached network volume.
    pub network_volume_id: Option<String>,
    /// When the pod was created (RFC 3339), as far as is known.
    pub created_at: String,
}

impl TrackedPod {
    /// Name shown to the operator.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(DEFAULT_NAME)
    }

    /// Build a record from a live provider pod whose origin is unknown.
    #[must_use]
    pub fn from_remote(pod: &Pod, name: Option<String>) -> Self {
        Self {
            name,
            pod_id: pod.id.clone(),
            model: UNKNOWN.to_string(),
            endpoint: resolve_endpoint(pod),
            gpu_type: pod
                .gpu_display_name
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            cost_per_hr: pod.cost_per_hr,
            network_volume_id: pod.network_volume_id.clone(),
            created_at: pod
                .last_status_change
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
        }
    }
}

/// Outcome of [`PodStore::reconcile_from_remote`].
#[derive(Debug, Clone)]
pub enum Reconciliation {
    /// Local records already exist; nothing was queried.
    Skipped,
    /// The provider has no running Ollama pods.
    NoneFound,
    /// Records were created for these pods.
    Synced(Vec<TrackedPod>),
    /// Single-slot mode found several candidates and picked none.
    Ambiguous(Vec<Pod>),
}

/// File-backed store of [`TrackedPod`] records.
#[derive(Debug, Clone)]
pub struct PodStore {
    root: PathBuf,
    mode: TrackingMode,
}

impl PodStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, mode: TrackingMode) -> Self {
        Self {
            root: root.into(),
            mode,
        }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tracking mode.
    #[must_use]
    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    fn pods_dir(&self) -> PathBuf {
        self.root.join(PODS_DIR)
    }

    /// Path of the record for `name`.
    ///
    /// # Errors
    /// [`StateError::InvalidName`] when `name` is not usable as a file name.
    pub fn record_path(&self, name: &str) -> std::result::Result<PathBuf, StateError> {
        match self.mode {
            TrackingMode::Single => Ok(self.root.join(SINGLE_SLOT_FILE)),
            TrackingMode::Named => {
                validate_name(name)?;
                Ok(self.pods_dir().join(format!("{name}.json")))
            }
        }
    }

    /// Write a record, replacing any previous one under the same name.
    ///
    /// The document is written to a temporary file and renamed into place.
    ///
    /// # Errors
    /// Returns error if the name is invalid or the file cannot be written.
    pub fn save(&self, record: &TrackedPod) -> std::result::Result<(), StateError> {
        let mut record = record.clone();
        if self.mode == TrackingMode::Single {
            record.name = None;
        } else if record.name.is_none() {
            record.name = Some(DEFAULT_NAME.to_string());
        }

        let path = self.record_path(record.display_name())?;
        let dir = path.parent().unwrap_or(self.root.as_path());
        std::fs::create_dir_all(dir).map_err(|e| StateError::io(dir, e))?;

        let content = serde_json::to_string_pretty(&record).map_err(|e| StateError::Parse {
            path: path.display().to_string(),
            source: e,
        })?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, content).map_err(|e| StateError::io(&tmp, e))?;
        std::fs::rename(&tmp, &path).map_err(|e| StateError::io(&path, e))?;

        debug!(path = %path.display(), pod_id = %record.pod_id, "Saved pod record");
        Ok(())
    }

    /// Load the record for `name`, if any.
    ///
    /// # Errors
    /// Returns error if the name is invalid or the file cannot be read or parsed.
    pub fn load(&self, name: &str) -> std::result::Result<Option<TrackedPod>, StateError> {
        let path = self.record_path(name)?;
        read_record(&path)
    }

    /// Load every record, sorted by name.
    ///
    /// # Errors
    /// Returns error if a record cannot be read or parsed.
    pub fn list(&self) -> std::result::Result<Vec<TrackedPod>, StateError> {
        if self.mode == TrackingMode::Single {
            return Ok(read_record(&self.root.join(SINGLE_SLOT_FILE))?
                .into_iter()
                .collect());
        }

        let dir = self.pods_dir();
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StateError::io(&dir, e)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StateError::io(&dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(record) = read_record(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Delete the record for `name`. Returns whether one existed.
    ///
    /// # Errors
    /// Returns error if the name is invalid or the file cannot be removed.
    pub fn clear(&self, name: &str) -> std::result::Result<bool, StateError> {
        let path = self.record_path(name)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Cleared pod record");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StateError::io(&path, e)),
        }
    }

    /// Rebuild local records from the provider's running Ollama pods.
    ///
    /// Does nothing when local records exist. In single-slot mode, more than
    /// one candidate is reported back without writing anything. In named mode
    /// every candidate is saved under its provider name, or its ID when the
    /// pod has no usable name or another candidate already took it.
    ///
    /// # Errors
    /// Returns the provider error from the pod listing, or a state error.
    pub async fn reconcile_from_remote<P: PodProvider + ?Sized>(
        &self,
        provider: &P,
    ) -> Result<Reconciliation> {
        if !self.list()?.is_empty() {
            return Ok(Reconciliation::Skipped);
        }

        let running: Vec<Pod> = provider
            .list_pods()
            .await?
            .into_iter()
            .filter(|p| p.exposes_port(OLLAMA_PORT))
            .filter(|p| p.desired_status == Some(PodStatus::Running))
            .collect();

        info!(count = running.len(), mode = ?self.mode, "Reconciling from provider");

        if running.is_empty() {
            return Ok(Reconciliation::NoneFound);
        }

        let synced = match self.mode {
            TrackingMode::Single => {
                if running.len() > 1 {
                    warn!(count = running.len(), "Several running Ollama pods, not guessing");
                    return Ok(Reconciliation::Ambiguous(running));
                }
                vec![TrackedPod::from_remote(&running[0], None)]
            }
            TrackingMode::Named => {
                let mut taken = HashSet::new();
                running
                    .iter()
                    .map(|pod| {
                        let name = pod
                            .name
                            .clone()
                            .filter(|n| validate_name(n).is_ok() && !taken.contains(n))
                            .unwrap_or_else(|| pod.id.clone());
                        taken.insert(name.clone());
                        TrackedPod::from_remote(pod, Some(name))
                    })
                    .collect()
            }
        };

        for record in &synced {
            self.save(record)?;
            info!(pod_id = %record.pod_id, name = %record.display_name(), "Synced pod");
        }
        Ok(Reconciliation::Synced(synced))
    }
}

fn read_record(path: &Path) -> std::result::Result<Option<TrackedPod>, StateError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StateError::io(path, e)),
    };

    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| StateError::Parse {
            path: path.display().to_string(),
            source: e,
        })
}

fn validate_name(name: &str) -> std::result::Result<(), StateError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(StateError::InvalidName(name.to_string()))
    }
}
