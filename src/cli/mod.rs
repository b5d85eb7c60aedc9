
use crate::channels::whatsapp::WhatsAppChannel;
use crate::config::credentials::{CREDENTIAL_ENV_VARS, is_credential_set};
use crate::config::{Config, get_config_path, load_config, save_config};
use crate::gateway::{self, GatewayState};
use crate::providers::gemini::GeminiProvider;
use crate::relay::ReplyResolver;
use anyhow::Result;
use clap::{Parser, Subcommand};
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "chatrelay")]
#[command(about = "WhatsApp to Gemini reply relay")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Onboard,
    /// Run the webhook gateway
    Serve {
        /// Override gateway.port
        #[arg(long)]
        port: Option<u16>,
        /// Override gemini.model
        #[arg(long)]
        model: Option<String>,
    },
    /// Show configuration and credential status
    Status,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => onboard()?,
        Commands::Serve { port, model } => serve(port, model).await?,
        Commands::Status => status()?,
    }

    Ok(())
}

fn onboard() -> Result<()> {
    let config_path = get_config_path()?;
    if write_default_config(&config_path)? {
        println!("\u{2713} Created config at {}", config_path.display());
        println!("\nNext steps:");
        println!("  1. Fill in whatsapp.* and gemini.apiKey in the config file");
        println!("     (or set the CHATRELAY_* environment variables)");
        println!("  2. Run: chatrelay serve");
    } else {
        println!(
            "\u{26a0}\u{fe0f}  Config already exists at {}, leaving it untouched",
            config_path.display()
        );
    }
    Ok(())
}

/// Write a default config at `path` unless one exists. Returns whether a file was written.
fn write_default_config(path: &Path) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    save_config(&Config::default(), Some(path))?;
    Ok(true)
}

/// Wire the Gemini provider and WhatsApp channel into a resolver.
pub fn build_resolver(config: &Config) -> ReplyResolver {
    let provider = Arc::new(GeminiProvider::new(&config.gemini));
    let channel = Arc::new(WhatsAppChannel::new(&config.whatsapp));
    ReplyResolver::from_config(config, provider, channel)
}

async fn serve(port: Option<u16>, model: Option<String>) -> Result<()> {
    info!("Loading configuration...");
    let mut config = load_config(None)?;
    if let Some(port) = port {
        config.gateway.port = port;
    }
    if let Some(model) = model {
        config.gemini.model = model;
    }
    config.validate()?;
    config.require_credentials()?;
    info!(
        "Configuration loaded. Using model: {} (cooldown {}ms, quota block {}s)",
        config.gemini.model,
        config.admission.cooldown_ms,
        config.circuit_breaker.quota_cooldown_secs
    );
    if config.whatsapp.app_secret.is_empty() {
        info!("whatsapp.appSecret not set, webhook payload signatures are not checked");
    }

    let resolver = Arc::new(build_resolver(&config));
    let state = GatewayState::new(resolver, &config.whatsapp);
    let server = gateway::start(&config.gateway.host, config.gateway.port, state).await?;

    println!(
        "chatrelay listening on {}:{} (webhook path /webhook)",
        config.gateway.host, config.gateway.port
    );

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
        _ = server => {}
    }

    Ok(())
}

fn status() -> Result<()> {
    let config_path = get_config_path()?;
    let config = load_config(None)?;
    print!("{}", render_status(&config, &config_path));
    Ok(())
}

fn render_status(config: &Config, config_path: &Path) -> String {
    let mark = |ok: bool| if ok { "\u{2713}" } else { "\u{2717}" };
    let mut out = String::new();

    let _ = writeln!(out, "chatrelay {}\n", crate::VERSION);
    let _ = writeln!(
        out,
        "Config: {} {}",
        config_path.display(),
        mark(config_path.exists())
    );

    let _ = writeln!(out, "\nCredentials:");
    for (name, env) in CREDENTIAL_ENV_VARS {
        let state = if is_credential_set(config, name) {
            "\u{2713}"
        } else {
            "not set"
        };
        let _ = writeln!(out, "  {:<16} {:<8} ({})", name, state, env);
    }
    let missing = config.missing_credentials();
    if !missing.is_empty() {
        let _ = writeln!(out, "  missing for serve: {}", missing.join(", "));
    }

    let _ = writeln!(out, "\nGateway: {}:{}", config.gateway.host, config.gateway.port);
    let _ = writeln!(
        out,
        "Gemini: {} (temperature {}, maxOutputTokens {}, timeout {}s)",
        config.gemini.model,
        config.gemini.temperature,
        config.gemini.max_output_tokens,
        config.gemini.timeout_secs
    );
    let _ = writeln!(
        out,
        "Admission: cooldown {}ms, dedup {} ids / {}s",
        config.admission.cooldown_ms,
        config.admission.dedup_capacity,
        config.admission.dedup_ttl_secs
    );
    let _ = writeln!(
        out,
        "Circuit breaker: quota block {}s",
        config.circuit_breaker.quota_cooldown_secs
    );
    let _ = writeln!(
        out,
        "Payload signatures: {}",
        if config.whatsapp.app_secret.is_empty() {
            "off"
        } else {
            "on"
        }
    );
    out
}
