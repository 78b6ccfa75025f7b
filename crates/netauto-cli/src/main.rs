//! netauto - GenAI network automation CLI
//!
//! ## Commands
//!
//! - `devices`: list the device catalog
//! - `deploy`: generate, validate, and deploy an intent to a device
//! - `retrieve`: pull the running configuration from a device
//! - `check`: probe the generation backend

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netauto_core::{
    AutomationPipeline, DeviceRegistry, OllamaConfig, OllamaGenerator, PipelineConfig,
    PipelineResult, RuleValidator, TransportSelector,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "netauto")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "GenAI-driven network configuration automation", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Device catalog file (JSON array); defaults to the built-in lab
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    /// Ollama server URL
    #[arg(long, global = true, env = "NETAUTO_OLLAMA_URL", default_value = "http://localhost:11434")]
    ollama_url: String,

    /// Ollama model name
    #[arg(long, global = true, env = "NETAUTO_OLLAMA_MODEL", default_value = "llama3.2:1b")]
    model: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the device catalog
    Devices,

    /// Generate, validate, and deploy configuration for an intent
    Deploy {
        /// Target device name, e.g. Dummy-RT1
        #[arg(short, long)]
        device: String,

        /// Natural-language change intent
        #[arg(short, long)]
        intent: String,

        /// Print the step log after the run
        #[arg(long)]
        steps: bool,
    },

    /// Retrieve the running configuration from a device
    Retrieve {
        /// Target device name
        #[arg(short, long)]
        device: String,

        /// Print the step log after the run
        #[arg(long)]
        steps: bool,
    },

    /// Probe the generation backend
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = load_registry(cli.catalog.as_deref())?;
    let ollama = OllamaConfig {
        base_url: cli.ollama_url.clone(),
        model: cli.model.clone(),
        ..OllamaConfig::default()
    };

    match cli.command {
        Commands::Devices => {
            for device in registry.devices() {
                println!(
                    "{:<12} {:<20} {:<12} {}",
                    device.name,
                    device.address,
                    device.device_class,
                    if device.simulated { "simulated" } else { "real" }
                );
            }
            Ok(())
        }

        Commands::Deploy {
            device,
            intent,
            steps,
        } => {
            let pipeline = build_pipeline(registry, ollama)?;
            let result = pipeline.run(&intent, &device).await;
            report(&result, steps);
            exit_for(&result)
        }

        Commands::Retrieve { device, steps } => {
            let pipeline = build_pipeline(registry, ollama)?;
            let result = pipeline.retrieve(&device).await;
            report(&result, steps);
            exit_for(&result)
        }

        Commands::Check => {
            let generator =
                OllamaGenerator::new(ollama).context("initializing the generation backend")?;
            if generator.health().await {
                println!("generation backend is reachable");
                Ok(())
            } else {
                anyhow::bail!("generation backend is not reachable at {}", cli.ollama_url)
            }
        }
    }
}

fn load_registry(catalog: Option<&std::path::Path>) -> Result<DeviceRegistry> {
    match catalog {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading catalog {}", path.display()))?;
            DeviceRegistry::from_json(&json)
                .with_context(|| format!("parsing catalog {}", path.display()))
        }
        None => Ok(DeviceRegistry::builtin()),
    }
}

fn build_pipeline(registry: DeviceRegistry, ollama: OllamaConfig) -> Result<AutomationPipeline> {
    let generator = OllamaGenerator::new(ollama).context("initializing the generation backend")?;
    Ok(AutomationPipeline::new(
        Arc::new(registry),
        Arc::new(generator),
        Arc::new(RuleValidator::new()),
        Arc::new(TransportSelector::new()),
        PipelineConfig::default(),
    ))
}

fn report(result: &PipelineResult, steps: bool) {
    if steps {
        for entry in &result.steps {
            println!("{entry}");
        }
        println!();
    }

    if let Some(commands) = &result.commands {
        println!("commands:\n{commands}\n");
    }
    if let Some(verdict) = &result.verdict {
        println!("verdict: {}\n", verdict.summary());
    }

    if result.success() {
        println!("{}", result.deployment.output);
    } else if let Some(error) = &result.deployment.error {
        eprintln!("Error: {error}");
    }
}

fn exit_for(result: &PipelineResult) -> Result<()> {
    if result.success() {
        Ok(())
    } else {
        // Failure was already reported; surface a non-zero exit.
        std::process::exit(1);
    }
}
