//! Pod lifecycle: bring a pod up, tear it down, report on it.
//!
//! [`Deployer`] ties the provider, the model registry, the Ollama client and
//! the local [`PodStore`] together. A pod that was created but never became
//! usable is terminated before the error is returned, so a failed `up` does
//! not leave a billing pod behind.

use chrono::Utc;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::endpoint::resolve_endpoint;
use crate::error::{Error, Result};
use crate::ollama::{OllamaClient, OLLAMA_IMAGE};
use crate::providers::runpod::RunPod;
use crate::providers::{CloudType, Pod, PodProvider, PodProviderError};
use crate::provision::{provision, resolve_volume_datacenter, PodSpec};
use crate::readiness::{wait_ready, WaitOptions};
use crate::registry::ModelRegistry;
use crate::selection::{quote_gpus, select_gpu, GpuQuote, GpuSelection};
use crate::state::{PodStore, Reconciliation, TrackedPod, TrackingMode, DEFAULT_NAME};

/// Inputs to [`Deployer::up`].
#[derive(Debug, Clone)]
pub struct UpOptions {
    /// Ollama model, `name[:tag]`.
    pub model: String,
    /// Tracking name.
    pub name: String,
    /// VRAM requirement in GB; estimated from the registry when `None`.
    pub vram_gb: Option<f64>,
    /// GPU type ID; selected by price when `None`.
    pub gpu_type: Option<String>,
    /// Network volume to attach.
    pub volume_id: Option<String>,
    /// Cloud tier constraint.
    pub cloud_type: CloudType,
    /// Container image override.
    pub image: Option<String>,
    /// Stop after GPU selection.
    pub dry_run: bool,
}

impl UpOptions {
    /// Options for `model` with every other setting at its default.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            name: DEFAULT_NAME.to_string(),
            vram_gb: None,
            gpu_type: None,
            volume_id: None,
            cloud_type: CloudType::Any,
            image: None,
            dry_run: false,
        }
    }
}

/// What `up` decided before creating anything.
#[derive(Debug, Clone)]
pub struct UpPlan {
    pub model: String,
    pub name: String,
    pub image: String,
    /// VRAM requirement in GB.
    pub min_vram_gb: f64,
    /// Whether `min_vram_gb` came from the registry.
    pub vram_estimated: bool,
    pub selection: GpuSelection,
    pub volume_id: Option<String>,
    /// Datacenter of the network volume, when it could be resolved.
    pub volume_datacenter: Option<String>,
}

impl UpPlan {
    /// The selected GPU may still be missing from the volume's datacenter on
    /// the requested tier. Availability data is global.
    #[must_use]
    pub fn datacenter_mismatch_possible(&self) -> bool {
        self.volume_datacenter.is_some()
            && self.selection.cloud_type != CloudType::Any
            && self.selection.has_price()
    }
}

/// Result of [`Deployer::up`].
#[derive(Debug, Clone)]
pub enum UpOutcome {
    /// Dry run; nothing was created.
    Planned(UpPlan),
    /// A pod is running with the model pulled and is now tracked.
    Deployed { plan: UpPlan, record: TrackedPod },
}

/// Result of [`Deployer::down`].
#[derive(Debug, Clone)]
pub struct DownOutcome {
    /// The record that was cleared.
    pub record: TrackedPod,
    /// The provider no longer knew the pod.
    pub already_gone: bool,
}

impl DownOutcome {
    /// A network volume outlives the pod, along with the models cached on it.
    #[must_use]
    pub fn volume_preserved(&self) -> bool {
        self.record.network_volume_id.is_some()
    }
}

/// Live state of one tracked pod.
#[derive(Debug, Clone)]
pub enum PodReport {
    /// The provider still has the pod.
    Live { record: TrackedPod, pod: Pod },
    /// The provider no longer has the pod; the local record was removed.
    Stale { record: TrackedPod },
}

/// Result of [`Deployer::status`].
#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    /// Records created from the provider because none existed locally.
    pub synced: Vec<TrackedPod>,
    /// Candidates left untracked because single-slot mode cannot hold them all.
    pub ambiguous: Vec<Pod>,
    pub pods: Vec<PodReport>,
}

/// Runs the pod lifecycle against a provider.
pub struct Deployer<P: PodProvider> {
    provider: P,
    registry: ModelRegistry,
    ollama: OllamaClient,
    store: PodStore,
    wait: WaitOptions,
}

impl Deployer<RunPod> {
    /// Build a deployer talking to RunPod as described by `config`.
    ///
    /// # Errors
    /// Returns error if one of the HTTP clients cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = RunPod::with_base_url(&config.api_key, &config.provider_url)?;
        let registry = ModelRegistry::with_base_url(&config.registry_url)?;
        let store = PodStore::new(&config.state_dir, config.tracking);
        Ok(Self::new(provider, registry, OllamaClient::new()?, store))
    }
}

impl<P: PodProvider> Deployer<P> {
    /// Create a deployer with the default readiness bounds.
    pub fn new(provider: P, registry: ModelRegistry, ollama: OllamaClient, store: PodStore) -> Self {
        Self {
            provider,
            registry,
            ollama,
            store,
            wait: WaitOptions::default(),
        }
    }

    /// Override the readiness bounds.
    #[must_use]
    pub fn with_wait_options(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    /// The provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The local record store.
    pub fn store(&self) -> &PodStore {
        &self.store
    }

    /// Priced GPU offers with at least `min_vram_gb`, cheapest first.
    ///
    /// # Errors
    /// [`Error::NoCandidate`] when no GPU type has enough VRAM, or the provider error.
    pub async fn quotes(&self, min_vram_gb: f64, cloud_type: CloudType) -> Result<Vec<GpuQuote>> {
        let mut quotes = quote_gpus(&self.provider, min_vram_gb, cloud_type).await?;
        quotes.sort_by(|a, b| a.price_per_hr.total_cmp(&b.price_per_hr));
        Ok(quotes)
    }

    /// Provision a pod, wait for it, pull the model, and start tracking it.
    ///
    /// # Errors
    /// [`Error::AlreadyTracked`] when the name is taken. Selection and
    /// provisioning errors are returned as is. Readiness, pull and record
    /// write failures are returned after the pod has been terminated.
    pub async fn up(&self, options: UpOptions) -> Result<UpOutcome> {
        if let Some(existing) = self.store.load(&options.name)? {
            return Err(Error::AlreadyTracked {
                name: existing.display_name().to_string(),
                pod_id: existing.pod_id,
                endpoint: existing.endpoint,
            });
        }

        let (min_vram_gb, vram_estimated) = match options.vram_gb {
            Some(vram) => (vram, false),
            None => (self.registry.estimate_vram_gb(&options.model).await?, true),
        };

        let volume_datacenter = match &options.volume_id {
            Some(volume_id) => {
                let datacenter = resolve_volume_datacenter(&self.provider, volume_id).await?;
                match &datacenter {
                    Some(dc) => info!(volume_id = %volume_id, datacenter = %dc, "Volume datacenter"),
                    None => warn!(volume_id = %volume_id, "Could not resolve volume datacenter"),
                }
                datacenter
            }
            None => None,
        };

        let selection = match &options.gpu_type {
            Some(gpu_type) => GpuSelection::manual(gpu_type, options.cloud_type),
            None => select_gpu(&self.provider, min_vram_gb, options.cloud_type).await?,
        };

        let plan = UpPlan {
            model: options.model.clone(),
            name: options.name.clone(),
            image: options
                .image
                .clone()
                .unwrap_or_else(|| OLLAMA_IMAGE.to_string()),
            min_vram_gb,
            vram_estimated,
            selection,
            volume_id: options.volume_id.clone(),
            volume_datacenter,
        };

        if options.dry_run {
            info!(gpu_type = %plan.selection.gpu_type_id, "Dry run, not creating a pod");
            return Ok(UpOutcome::Planned(plan));
        }

        let spec = PodSpec {
            gpu_type_id: plan.selection.gpu_type_id.clone(),
            name: options.name.clone(),
            network_volume_id: options.volume_id.clone(),
            cloud_type: options.cloud_type,
            image: options.image.clone(),
        };
        let pod_id = provision(&self.provider, &spec).await?;

        let pod = match wait_ready(&self.provider, &pod_id, self.wait).await {
            Ok(pod) => pod,
            Err(e) => {
                self.abandon(&pod_id).await;
                return Err(e);
            }
        };

        let endpoint = resolve_endpoint(&pod);
        info!(pod_id = %pod_id, endpoint = %endpoint, "Pod ready");

        if let Err(e) = self.ollama.pull_model(&endpoint, &options.model).await {
            self.abandon(&pod_id).await;
            return Err(e);
        }

        let record = TrackedPod {
            name: match self.store.mode() {
                TrackingMode::Single => None,
                TrackingMode::Named => Some(options.name.clone()),
            },
            pod_id,
            model: options.model,
            endpoint,
            gpu_type: plan.selection.gpu_type_id.clone(),
            cost_per_hr: plan.selection.price_per_hr,
            network_volume_id: options.volume_id,
            created_at: Utc::now().to_rfc3339(),
        };
        if let Err(e) = self.store.save(&record) {
            self.abandon(&record.pod_id).await;
            return Err(e.into());
        }
        info!(pod_id = %record.pod_id, name = %record.display_name(), "Pod tracked");

        Ok(UpOutcome::Deployed { plan, record })
    }

    /// Terminate the pod tracked as `name` and forget it.
    ///
    /// # Errors
    /// [`Error::NotTracked`] when nothing is tracked under `name`, or the
    /// provider or state error.
    pub async fn down(&self, name: &str) -> Result<DownOutcome> {
        let Some(record) = self.store.load(name)? else {
            return Err(self.not_tracked(name)?);
        };

        info!(pod_id = %record.pod_id, name = %name, "Terminating pod");
        let already_gone = match self.provider.terminate_pod(&record.pod_id).await {
            Ok(()) => false,
            Err(PodProviderError::NotFound(_)) => {
                warn!(pod_id = %record.pod_id, "Pod already gone at provider");
                true
            }
            Err(e) => return Err(e.into()),
        };

        self.store.clear(name)?;
        Ok(DownOutcome {
            record,
            already_gone,
        })
    }

    /// Report on the pod tracked as `name`, or on every tracked pod.
    ///
    /// With no local records, running Ollama pods are first adopted from the
    /// provider. Records whose pod no longer exists are removed.
    ///
    /// # Errors
    /// [`Error::NotTracked`] for an unknown `name`, or the provider or state error.
    pub async fn status(&self, name: Option<&str>) -> Result<StatusReport> {
        let mut report = StatusReport::default();

        let records = match name {
            Some(name) => match self.store.load(name)? {
                Some(record) => vec![record],
                None => return Err(self.not_tracked(name)?),
            },
            None => match self.store.reconcile_from_remote(&self.provider).await? {
                Reconciliation::Skipped => self.store.list()?,
                Reconciliation::NoneFound => Vec::new(),
                Reconciliation::Synced(synced) => {
                    report.synced.clone_from(&synced);
                    synced
                }
                Reconciliation::Ambiguous(candidates) => {
                    report.ambiguous = candidates;
                    Vec::new()
                }
            },
        };

        for record in records {
            match self.provider.get_pod(&record.pod_id).await {
                Ok(pod) => report.pods.push(PodReport::Live { record, pod }),
                Err(PodProviderError::NotFound(_)) => {
                    warn!(pod_id = %record.pod_id, name = %record.display_name(), "Pod no longer exists, clearing record");
                    self.store.clear(record.display_name())?;
                    report.pods.push(PodReport::Stale { record });
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }

    fn not_tracked(&self, name: &str) -> Result<Error> {
        let known = self
            .store
            .list()?
            .iter()
            .map(|r| r.display_name().to_string())
            .collect();
        Ok(Error::NotTracked {
            name: name.to_string(),
            known,
        })
    }

    /// Terminate a pod that failed to start or could not be tracked. A failure
    /// here is logged, not returned, so the caller still sees the original error.
    async fn abandon(&self, pod_id: &str) {
        warn!(pod_id = %pod_id, "Pod failed to start, terminating");
        if let Err(e) = self.provider.terminate_pod(pod_id).await {
            error!(pod_id = %pod_id, error = %e, "Failed to terminate pod; terminate it manually");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fake::{gpu, pending_pod, running_pod, FakeProvider};
    use crate::providers::PodStatus;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_wait() -> WaitOptions {
        WaitOptions {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(10),
        }
    }

    fn offers() -> Vec<crate::providers::GpuTypeDetail> {
        vec![
            gpu("NVIDIA RTX A5000", 24.0, Some(0.16), Some(0.26)),
            gpu("NVIDIA RTX A6000", 48.0, Some(0.33), Some(0.49)),
        ]
    }

    fn deployer(provider: FakeProvider, server: &MockServer, dir: &TempDir) -> Deployer<FakeProvider> {
        deployer_in_mode(provider, server, dir, TrackingMode::Named)
    }

    fn deployer_in_mode(
        provider: FakeProvider,
        server: &MockServer,
        dir: &TempDir,
        mode: TrackingMode,
    ) -> Deployer<FakeProvider> {
        Deployer::new(
            provider,
            ModelRegistry::with_base_url(server.uri()).unwrap(),
            OllamaClient::with_timeout(Duration::from_secs(5)).unwrap(),
            PodStore::new(dir.path(), mode),
        )
        .with_wait_options(fast_wait())
    }

    async fn serve_pull(server: &MockServer, status: u16) {
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({ "status": "success" })))
            .mount(server)
            .await;
    }

    fn port_of(server: &MockServer) -> u16 {
        server.address().port()
    }

    fn tracked(name: &str, pod_id: &str) -> TrackedPod {
        TrackedPod {
            name: Some(name.to_string()),
            pod_id: pod_id.to_string(),
            model: "qwen2.5:7b".to_string(),
            endpoint: format!("https://{pod_id}-11434.proxy.runpod.net"),
            gpu_type: "NVIDIA RTX A5000".to_string(),
            cost_per_hr: 0.16,
            network_volume_id: None,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn with_vram(model: &str, vram: f64) -> UpOptions {
        UpOptions {
            vram_gb: Some(vram),
            ..UpOptions::new(model)
        }
    }

    #[tokio::test]
    async fn test_up_deploys_and_tracks_pod() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "success" })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();

        let provider = FakeProvider::with_gpus(offers());
        provider.script(
            "pod-123",
            vec![pending_pod("pod-123"), running_pod("pod-123", "127.0.0.1", port_of(&server))],
        );
        let deployer = deployer(provider, &server, &dir);

        let outcome = deployer.up(with_vram("qwen2.5:7b", 9.0)).await.unwrap();
        let UpOutcome::Deployed { plan, record } = outcome else {
            panic!("expected a deployment");
        };

        assert_eq!(plan.selection.gpu_type_id, "NVIDIA RTX A5000");
        assert_eq!(record.pod_id, "pod-123");
        assert_eq!(record.endpoint, format!("http://127.0.0.1:{}", port_of(&server)));
        assert!((record.cost_per_hr - 0.16).abs() < 1e-9);
        assert_eq!(deployer.store().load("default").unwrap(), Some(record));

        let created = deployer.provider().created();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].gpu_type_id, "NVIDIA RTX A5000");
        assert_eq!(created[0].cloud_type, CloudType::Any);
        assert!(deployer.provider().terminated().is_empty());
    }

    #[tokio::test]
    async fn test_up_estimates_vram_from_registry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/llama3/manifests/70b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "layers": [
                    { "mediaType": "application/vnd.ollama.image.model", "size": 30u64 * 1024 * 1024 * 1024 }
                ]
            })))
            .mount(&server)
            .await;
        let dir = TempDir::new().unwrap();
        let deployer = deployer(FakeProvider::with_gpus(offers()), &server, &dir);

        let options = UpOptions {
            dry_run: true,
            ..UpOptions::new("llama3:70b")
        };
        let UpOutcome::Planned(plan) = deployer.up(options).await.unwrap() else {
            panic!("expected a plan");
        };

        assert!(plan.vram_estimated);
        assert!((plan.min_vram_gb - 36.0).abs() < 0.01);
        assert_eq!(plan.selection.gpu_type_id, "NVIDIA RTX A6000");
    }

    #[tokio::test]
    async fn test_up_dry_run_creates_nothing() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let deployer = deployer(FakeProvider::with_gpus(offers()), &server, &dir);

        let options = UpOptions {
            dry_run: true,
            ..with_vram("qwen2.5:7b", 9.0)
        };
        let UpOutcome::Planned(plan) = deployer.up(options).await.unwrap() else {
            panic!("expected a plan");
        };

        assert_eq!(plan.image, "ollama/ollama");
        assert_eq!(plan.selection.cloud_type, CloudType::Community);
        assert!(deployer.provider().created().is_empty());
        assert!(deployer.store().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_up_manual_gpu_skips_pricing() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let deployer = deployer(FakeProvider::with_gpus(Vec::new()), &server, &dir);

        let options = UpOptions {
            gpu_type: Some("NVIDIA H100 80GB HBM3".to_string()),
            cloud_type: CloudType::Secure,
            dry_run: true,
            ..with_vram("llama3:70b", 48.0)
        };
        let UpOutcome::Planned(plan) = deployer.up(options).await.unwrap() else {
            panic!("expected a plan");
        };

        assert_eq!(plan.selection.gpu_type_id, "NVIDIA H100 80GB HBM3");
        assert_eq!(plan.selection.cloud_type, CloudType::Secure);
        assert!(!plan.selection.has_price());
    }

    #[tokio::test]
    async fn test_up_refuses_tracked_name() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let deployer = deployer(FakeProvider::with_gpus(offers()), &server, &dir);
        deployer.store().save(&tracked("default", "pod-old")).unwrap();

        let err = deployer.up(with_vram("qwen2.5:7b", 9.0)).await.unwrap_err();

        assert!(matches!(err, Error::AlreadyTracked { ref pod_id, .. } if pod_id == "pod-old"));
        assert!(deployer.provider().created().is_empty());
    }

    #[tokio::test]
    async fn test_up_readiness_timeout_terminates_pod() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::with_gpus(offers());
        provider.script("pod-123", vec![pending_pod("pod-123")]);
        let deployer = deployer(provider, &server, &dir);

        let err = deployer.up(with_vram("qwen2.5:7b", 9.0)).await.unwrap_err();

        assert!(matches!(err, Error::ReadinessTimeout { ref pod_id, .. } if pod_id == "pod-123"));
        assert_eq!(deployer.provider().terminated(), vec!["pod-123".to_string()]);
        assert!(deployer.store().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_up_pull_failure_terminates_pod() {
        let server = MockServer::start().await;
        serve_pull(&server, 500).await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::with_gpus(offers());
        provider.script(
            "pod-123",
            vec![running_pod("pod-123", "127.0.0.1", port_of(&server))],
        );
        let deployer = deployer(provider, &server, &dir);

        let err = deployer.up(with_vram("qwen2.5:7b", 9.0)).await.unwrap_err();

        assert!(matches!(err, Error::Transfer(_)));
        assert_eq!(deployer.provider().terminated(), vec!["pod-123".to_string()]);
        assert!(deployer.store().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_up_unwritable_record_terminates_pod() {
        let server = MockServer::start().await;
        serve_pull(&server, 200).await;
        let dir = TempDir::new().unwrap();
        // A directory where the temporary record file goes makes the write fail
        std::fs::create_dir_all(dir.path().join("pods/default.json.tmp")).unwrap();
        let provider = FakeProvider::with_gpus(offers());
        provider.script(
            "pod-123",
            vec![running_pod("pod-123", "127.0.0.1", port_of(&server))],
        );
        let deployer = deployer(provider, &server, &dir);

        let err = deployer.up(with_vram("qwen2.5:7b", 9.0)).await.unwrap_err();

        assert!(matches!(err, Error::State(_)));
        assert_eq!(deployer.provider().terminated(), vec!["pod-123".to_string()]);
        assert_eq!(deployer.store().load("default").unwrap(), None);
    }

    #[tokio::test]
    async fn test_up_rejection_is_diagnosed_without_terminating() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider {
            reject_with: Some(
                "There are no longer any instances available with the requested specifications."
                    .to_string(),
            ),
            ..FakeProvider::with_gpus(offers())
        };
        let deployer = deployer(provider, &server, &dir);

        let options = UpOptions {
            volume_id: Some("vol-1".to_string()),
            cloud_type: CloudType::Secure,
            ..with_vram("qwen2.5:7b", 9.0)
        };
        let err = deployer.up(options).await.unwrap_err();

        let Error::Rejected { diagnostic } = err else {
            panic!("expected a rejection, got {err:?}");
        };
        assert!(diagnostic.contains("vol-1"));
        assert!(diagnostic.contains("--cloud-type any"));
        assert!(deployer.provider().terminated().is_empty());
    }

    #[tokio::test]
    async fn test_up_resolves_volume_datacenter() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider {
            volumes: vec![crate::providers::NetworkVolume {
                id: "vol-1".to_string(),
                name: Some("models".to_string()),
                size: Some(100),
                data_center_id: Some("EU-RO-1".to_string()),
            }],
            ..FakeProvider::with_gpus(offers())
        };
        let deployer = deployer(provider, &server, &dir);

        let options = UpOptions {
            volume_id: Some("vol-1".to_string()),
            cloud_type: CloudType::Secure,
            dry_run: true,
            ..with_vram("qwen2.5:7b", 9.0)
        };
        let UpOutcome::Planned(plan) = deployer.up(options).await.unwrap() else {
            panic!("expected a plan");
        };

        assert_eq!(plan.volume_datacenter.as_deref(), Some("EU-RO-1"));
        assert!(plan.datacenter_mismatch_possible());
    }

    #[tokio::test]
    async fn test_up_single_mode_saves_unnamed_record() {
        let server = MockServer::start().await;
        serve_pull(&server, 200).await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::with_gpus(offers());
        provider.script(
            "pod-123",
            vec![running_pod("pod-123", "127.0.0.1", port_of(&server))],
        );
        let deployer = deployer_in_mode(provider, &server, &dir, TrackingMode::Single);

        let UpOutcome::Deployed { record, .. } =
            deployer.up(with_vram("qwen2.5:7b", 9.0)).await.unwrap()
        else {
            panic!("expected a deployment");
        };

        assert_eq!(record.name, None);
        assert_eq!(deployer.store().list().unwrap(), vec![record]);
    }

    #[tokio::test]
    async fn test_down_terminates_and_clears() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let deployer = deployer(FakeProvider::with_gpus(offers()), &server, &dir);
        let mut record = tracked("big", "pod-9");
        record.network_volume_id = Some("vol-1".to_string());
        deployer.store().save(&record).unwrap();

        let outcome = deployer.down("big").await.unwrap();

        assert!(!outcome.already_gone);
        assert!(outcome.volume_preserved());
        assert_eq!(deployer.provider().terminated(), vec!["pod-9".to_string()]);
        assert_eq!(deployer.store().load("big").unwrap(), None);
    }

    #[tokio::test]
    async fn test_down_pod_already_gone_still_clears() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider {
            gone: vec!["pod-9".to_string()],
            ..FakeProvider::with_gpus(offers())
        };
        let deployer = deployer(provider, &server, &dir);
        deployer.store().save(&tracked("big", "pod-9")).unwrap();

        let outcome = deployer.down("big").await.unwrap();

        assert!(outcome.already_gone);
        assert!(!outcome.volume_preserved());
        assert_eq!(deployer.store().load("big").unwrap(), None);
    }

    #[tokio::test]
    async fn test_down_unknown_name_lists_tracked() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let deployer = deployer(FakeProvider::with_gpus(offers()), &server, &dir);
        deployer.store().save(&tracked("alpha", "pod-a")).unwrap();
        deployer.store().save(&tracked("beta", "pod-b")).unwrap();

        let err = deployer.down("gamma").await.unwrap_err();

        assert!(matches!(err, Error::NotTracked { ref known, .. } if known == &["alpha", "beta"]));
        assert!(err.to_string().contains("alpha, beta"));
        assert!(deployer.provider().terminated().is_empty());
    }

    #[tokio::test]
    async fn test_status_clears_stale_records() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::with_gpus(offers());
        provider.script("pod-live", vec![running_pod("pod-live", "1.2.3.4", 40001)]);
        let deployer = deployer(provider, &server, &dir);
        deployer.store().save(&tracked("live", "pod-live")).unwrap();
        deployer.store().save(&tracked("stale", "pod-gone")).unwrap();

        let report = deployer.status(None).await.unwrap();

        assert!(report.synced.is_empty());
        assert_eq!(report.pods.len(), 2);
        assert!(matches!(&report.pods[0], PodReport::Live { pod, .. } if pod.id == "pod-live"));
        assert!(matches!(&report.pods[1], PodReport::Stale { record } if record.pod_id == "pod-gone"));

        let names: Vec<_> = deployer
            .store()
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.pod_id)
            .collect();
        assert_eq!(names, vec!["pod-live".to_string()]);
    }

    #[tokio::test]
    async fn test_status_single_name() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::with_gpus(offers());
        provider.script("pod-a", vec![running_pod("pod-a", "1.2.3.4", 40001)]);
        let deployer = deployer(provider, &server, &dir);
        deployer.store().save(&tracked("alpha", "pod-a")).unwrap();
        deployer.store().save(&tracked("beta", "pod-b")).unwrap();

        let report = deployer.status(Some("alpha")).await.unwrap();
        assert_eq!(report.pods.len(), 1);

        let err = deployer.status(Some("gamma")).await.unwrap_err();
        assert!(matches!(err, Error::NotTracked { .. }));
    }

    #[tokio::test]
    async fn test_status_adopts_remote_pods_when_untracked() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let remote = Pod {
            name: Some("adopted".to_string()),
            gpu_display_name: Some("RTX 4090".to_string()),
            ..running_pod("pod-r", "1.2.3.4", 40001)
        };
        let provider = FakeProvider {
            listed: vec![remote.clone()],
            ..FakeProvider::with_gpus(offers())
        };
        provider.script("pod-r", vec![remote]);
        let deployer = deployer(provider, &server, &dir);

        let report = deployer.status(None).await.unwrap();

        assert_eq!(report.synced.len(), 1);
        assert_eq!(report.synced[0].model, "unknown");
        assert_eq!(report.pods.len(), 1);
        assert!(deployer.store().load("adopted").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_status_single_mode_ambiguous() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider {
            listed: vec![
                running_pod("pod-1", "1.2.3.4", 40001),
                running_pod("pod-2", "1.2.3.5", 40002),
                Pod {
                    desired_status: Some(PodStatus::Exited),
                    ..running_pod("pod-3", "1.2.3.6", 40003)
                },
            ],
            ..FakeProvider::with_gpus(offers())
        };
        let deployer = deployer_in_mode(provider, &server, &dir, TrackingMode::Single);

        let report = deployer.status(None).await.unwrap();

        assert_eq!(report.ambiguous.len(), 2);
        assert!(report.pods.is_empty());
        assert!(deployer.store().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_quotes_sorted_by_price() {
        let server = MockServer::start().await;
        let dir = TempDir::new().unwrap();
        let provider = FakeProvider::with_gpus(vec![
            gpu("NVIDIA RTX A6000", 48.0, Some(0.33), None),
            gpu("NVIDIA RTX A5000", 24.0, Some(0.16), None),
            gpu("NVIDIA RTX 2000 Ada", 16.0, Some(0.10), None),
        ]);
        let deployer = deployer(provider, &server, &dir);

        let quotes = deployer.quotes(20.0, CloudType::Community).await.unwrap();
        let ids: Vec<_> = quotes.iter().map(|q| q.gpu_type_id.as_str()).collect();
        assert_eq!(ids, vec!["NVIDIA RTX A5000", "NVIDIA RTX A6000"]);
    }
}
