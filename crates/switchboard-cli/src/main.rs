use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::SwitchboardConfig;
use switchboard_core::{ChatMessage, InferenceOptions, InferenceRequest};
use switchboard_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(version)]
#[command(about = "Switchboard — a multi-provider AI inference router")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the inference gateway
    Serve {
        /// Bind address, overriding the config file
        #[arg(short, long)]
        bind: Option<SocketAddr>,
    },

    /// Run a one-shot inference from the command line
    Infer {
        /// The user message to send
        message: String,

        /// Provider selector (openai, anthropic, huggingface, core)
        #[arg(short, long)]
        provider: Option<String>,

        /// Model override
        #[arg(short, long)]
        model: Option<String>,

        /// Sampling temperature in [0, 2]
        #[arg(short, long)]
        temperature: Option<f32>,
    },

    /// List adapters and their configuration state
    Providers,

    /// Initialize the config directory with a default config
    Init,

    /// Show the effective configuration (secrets masked)
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Serve { bind } => cmd_serve(&cli.config, bind).await,
        Commands::Infer {
            message,
            provider,
            model,
            temperature,
        } => cmd_infer(&cli.config, message, provider, model, temperature).await,
        Commands::Providers => cmd_providers(&cli.config),
        Commands::Init => cmd_init(),
        Commands::Config => cmd_config(&cli.config),
    }
}

async fn cmd_serve(config_path: &Option<PathBuf>, bind: Option<SocketAddr>) -> Result<()> {
    let config = SwitchboardConfig::load(config_path.as_ref())?;
    let router = config.build_router()?;

    if !router.providers().iter().any(|p| p.configured) {
        warn!("No provider has a credential configured; every inference call will fail");
    }

    let bind = match bind {
        Some(addr) => addr,
        None => config
            .gateway
            .bind
            .parse()
            .with_context(|| format!("Invalid bind address: {}", config.gateway.bind))?,
    };

    info!("Default provider: {}", router.default_provider());
    GatewayServer::new(bind, router).run().await
}

async fn cmd_infer(
    config_path: &Option<PathBuf>,
    message: String,
    provider: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
) -> Result<()> {
    let config = SwitchboardConfig::load(config_path.as_ref())?;
    let router = config.build_router()?;

    let request = InferenceRequest {
        messages: vec![ChatMessage::user(message)],
        provider,
        options: InferenceOptions { model, temperature },
    };

    let result = router.infer(&request).await?;
    info!("Served by {} ({})", result.provider, result.model);
    println!("{}", result.content);
    Ok(())
}

fn cmd_providers(config_path: &Option<PathBuf>) -> Result<()> {
    let config = SwitchboardConfig::load(config_path.as_ref())?;
    let router = config.build_router()?;

    for status in router.providers() {
        let state = if status.configured {
            "configured"
        } else {
            "not configured"
        };
        let default = if status.name == router.default_provider() {
            " (default)"
        } else {
            ""
        };
        println!("{:<14} {:<40} {}{}", status.name, status.model, state, default);
    }
    Ok(())
}

fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        std::fs::write(&config_path, default_config)?;
        info!("Created default config at {}", config_path.display());
    }

    println!("Switchboard initialized at {}", config_dir.display());
    println!(
        "Edit {} to configure your provider API keys.",
        config_path.display()
    );
    Ok(())
}

fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let config = SwitchboardConfig::load(config_path.as_ref())?;
    println!("{:#?}", config);
    Ok(())
}
