//! ollama-pod CLI - run Ollama on the cheapest RunPod GPU that fits a model.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use ollama_pod::readiness::{WaitOptions, DEFAULT_TIMEOUT_SECS};
use ollama_pod::state::DEFAULT_NAME;
use ollama_pod::{
    CloudType, Config, Deployer, PodReport, PodStatus, TrackingMode, UpOptions, UpOutcome, UpPlan,
};

/// ollama-pod - Ollama on rented RunPod GPUs.
#[derive(Parser)]
#[command(name = "ollama-pod")]
#[command(about = "Spin up Ollama on the cheapest RunPod GPU that fits a model")]
struct Cli {
    /// RunPod API key (or set `RUNPOD_API_KEY` env var).
    #[arg(long, env = "RUNPOD_API_KEY", default_value = "", hide_env_values = true)]
    api_key: String,

    /// Directory for local pod records (default: ~/.ollama-pod).
    #[arg(long, env = "OLLAMA_POD_HOME")]
    home: Option<PathBuf>,

    /// Track one pod, or many pods by name.
    #[arg(long, env = "OLLAMA_POD_TRACKING", value_enum, default_value = "named")]
    tracking: TrackingMode,

    /// Enable verbose logging.
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a pod and pull a model onto it.
    Up {
        /// Ollama model to pull (e.g. qwen2.5:7b).
        model: String,

        /// Name for this pod.
        #[arg(long, default_value = DEFAULT_NAME)]
        name: String,

        /// Override the VRAM estimate, in GB.
        #[arg(long)]
        vram: Option<f64>,

        /// Use this RunPod GPU type ID instead of the cheapest match.
        #[arg(long)]
        gpu_type: Option<String>,

        /// RunPod network volume to mount at /root/.ollama.
        #[arg(long)]
        volume_id: Option<String>,

        /// Cloud tier: any, community, or secure.
        #[arg(long, value_enum, default_value = "any")]
        cloud_type: CloudType,

        /// Container image (default: ollama/ollama).
        #[arg(long)]
        image: Option<String>,

        /// Seconds to wait for the pod to come up.
        #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
        timeout: u64,

        /// Show the GPU and cost without creating a pod.
        #[arg(long, default_value = "false")]
        dry_run: bool,
    },

    /// Terminate a tracked pod.
    Down {
        /// Name of the pod to terminate.
        #[arg(long, default_value = DEFAULT_NAME)]
        name: String,
    },

    /// Show tracked pods.
    Status {
        /// Only show this pod.
        #[arg(long)]
        name: Option<String>,
    },

    /// List GPU offers with enough VRAM, cheapest first.
    Gpus {
        /// Minimum VRAM in GB.
        #[arg(long, default_value = "0")]
        vram: f64,

        /// Cloud tier: any, community, or secure.
        #[arg(long, value_enum, default_value = "any")]
        cloud_type: CloudType,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::new(&cli.api_key, cli.home.clone(), cli.tracking)?;
    debug!(state_dir = %config.state_dir.display(), tracking = ?config.tracking, "Loaded configuration");

    let deployer = Deployer::from_config(&config).context("Failed to create RunPod client")?;

    match cli.command {
        Commands::Up {
            model,
            name,
            vram,
            gpu_type,
            volume_id,
            cloud_type,
            image,
            timeout,
            dry_run,
        } => {
            let deployer = deployer.with_wait_options(WaitOptions::with_timeout_secs(timeout));
            let options = UpOptions {
                model,
                name: name.clone(),
                vram_gb: vram,
                gpu_type,
                volume_id,
                cloud_type,
                image,
                dry_run,
            };

            println!("🚀 Starting Ollama pod '{name}'...");
            match deployer.up(options).await? {
                UpOutcome::Planned(plan) => {
                    print_plan(&plan);
                }
                UpOutcome::Deployed { plan, record } => {
                    print_plan(&plan);
                    println!("\n✅ Pod is ready!");
                    println!("   Name:     {}", record.display_name());
                    println!("   Pod:      {}", record.pod_id);
                    println!("   Endpoint: {}", record.endpoint);
                    println!("   Model:    {}", record.model);
                    println!("   GPU:      {}", record.gpu_type);
                    if record.cost_per_hr > 0.0 {
                        println!("   💰 ${:.2}/hr", record.cost_per_hr);
                    }
                    println!(
                        "\n💡 Run `ollama-pod down --name {}` when you are done",
                        record.display_name()
                    );
                }
            }
        }

        Commands::Down { name } => {
            let outcome = deployer.down(&name).await?;
            if outcome.already_gone {
                println!("⚠️  Pod {} was already gone at RunPod", outcome.record.pod_id);
            }
            println!(
                "\n✅ Pod '{}' ({}) terminated",
                outcome.record.display_name(),
                outcome.record.pod_id
            );
            if outcome.volume_preserved() {
                println!("   💾 Network volume preserved, models cached for next run");
            }
        }

        Commands::Status { name } => {
            let report = deployer.status(name.as_deref()).await?;

            for record in &report.synced {
                println!(
                    "🔄 Adopted running pod {} as '{}'",
                    record.pod_id,
                    record.display_name()
                );
            }
            if !report.ambiguous.is_empty() {
                println!("⚠️  Several running Ollama pods found, none tracked:");
                for pod in &report.ambiguous {
                    println!(
                        "   {} {}",
                        pod.id,
                        pod.name.as_deref().unwrap_or_default()
                    );
                }
                println!("   Switch to --tracking named to track them all.");
            }
            if report.pods.is_empty() {
                println!("No tracked pods found.");
                return Ok(());
            }

            println!(
                "\n{:<16} {:<16} {:<14} {:<22} {:<8} {:<10} ENDPOINT",
                "NAME", "POD", "STATUS", "GPU", "UPTIME", "COST"
            );
            println!("{}", "-".repeat(120));

            for entry in &report.pods {
                match entry {
                    PodReport::Live { record, pod } => {
                        let status = pod.desired_status.unwrap_or(PodStatus::Unknown);
                        let status_emoji = match status {
                            PodStatus::Running if pod.is_ready() => "🟢",
                            PodStatus::Running | PodStatus::Created | PodStatus::Restarting => {
                                "🟡"
                            }
                            PodStatus::Exited | PodStatus::Dead | PodStatus::Terminated => "🔴",
                            _ => "⚪",
                        };
                        let uptime = pod
                            .runtime
                            .as_ref()
                            .and_then(|r| r.uptime_in_seconds)
                            .map_or_else(|| "-".to_string(), format_uptime);
                        let cost = if pod.cost_per_hr > 0.0 {
                            pod.cost_per_hr
                        } else {
                            record.cost_per_hr
                        };

                        println!(
                            "{:<16} {:<16} {} {:<11} {:<22} {:<8} ${:<9.2} {}",
                            record.display_name(),
                            record.pod_id,
                            status_emoji,
                            status.to_string(),
                            record.gpu_type,
                            uptime,
                            cost,
                            record.endpoint
                        );
                    }
                    PodReport::Stale { record } => {
                        println!(
                            "{:<16} {:<16} ⚫ gone (record cleared)",
                            record.display_name(),
                            record.pod_id
                        );
                    }
                }
            }
            println!();
        }

        Commands::Gpus { vram, cloud_type } => {
            let quotes = deployer.quotes(vram, cloud_type).await?;

            println!("\n🎮 GPUs with >= {vram:.1} GB VRAM ({cloud_type} cloud)");
            println!("{}", "=".repeat(70));

            if quotes.is_empty() {
                println!("\n🔴 None available right now");
            }
            for quote in quotes {
                println!(
                    "{:<36} {:>6.0} GB   💰 ${:.2}/hr   {}",
                    quote.gpu_type_id, quote.memory_in_gb, quote.price_per_hr, quote.cloud_type
                );
            }
            println!();
        }
    }

    Ok(())
}

fn print_plan(plan: &UpPlan) {
    println!("\n📋 Plan");
    println!("   Model: {}", plan.model);
    println!("   Image: {}", plan.image);
    println!("   Name:  {}", plan.name);
    println!(
        "   VRAM:  {:.1} GB{}",
        plan.min_vram_gb,
        if plan.vram_estimated { " (estimated)" } else { "" }
    );
    println!(
        "   GPU:   {} ({} cloud)",
        plan.selection.gpu_type_id, plan.selection.cloud_type
    );
    if plan.selection.has_price() {
        println!("   Cost:  ${:.2}/hr", plan.selection.price_per_hr);
    }
    if let Some(volume_id) = &plan.volume_id {
        match &plan.volume_datacenter {
            Some(dc) => println!("   📍 Volume {volume_id} pinned to datacenter {dc}"),
            None => println!("   ⚠️  Could not resolve datacenter for volume {volume_id}"),
        }
    }
    if plan.datacenter_mismatch_possible() {
        if let Some(dc) = &plan.volume_datacenter {
            println!(
                "   ⚠️  GPU availability is global; {} may not exist as {} cloud in {dc}. \
                 Creation will fail fast if so.",
                plan.selection.gpu_type_id, plan.selection.cloud_type
            );
        }
    }
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{hours}h{minutes:02}m")
    } else {
        format!("{minutes}m")
    }
}
