//! TLSA Sync
//!
//! Publishes `3 1 1` TLSA records for the current and next certificate keys
//! of a service in Cloudflare DNS. Meant to run from an ACME renewal hook
//! or a scheduler; concurrent runs against the same name are not guarded.
//!
//! # Usage
//! ```bash
//! export CLOUDFLARE_API_TOKEN=...
//! tlsa-sync --zone-id 023e105f4ecef8ad9ca31a8372d0c353 \
//!     --domain mail.example.com \
//!     --current-key /etc/ssl/private/current.key \
//!     --next-key /etc/ssl/private/next.key
//!
//! # Show what would change
//! tlsa-sync --dry-run ...
//! ```

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

use tlsa_sync::config::{CLOUDFLARE_API_BASE, DEFAULT_PORT, DEFAULT_PROTOCOL};
use tlsa_sync::{derive, CloudflareClient, Config, Reconciler};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "tlsa-sync")]
#[command(about = "Sync Cloudflare TLSA records with current and next certificate keys", long_about = None)]
#[command(version)]
struct Cli {
    /// Private key of the certificate currently in service
    #[arg(long, env = "TLSA_CURRENT_KEY")]
    current_key: PathBuf,

    /// Private key of the certificate that will replace it
    #[arg(long, env = "TLSA_NEXT_KEY")]
    next_key: PathBuf,

    /// Cloudflare Zone ID
    #[arg(long, env = "CLOUDFLARE_ZONE_ID")]
    zone_id: String,

    /// Cloudflare API token with DNS edit permission
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: String,

    /// Service domain (e.g., mail.example.com)
    #[arg(long, env = "TLSA_DOMAIN")]
    domain: String,

    /// Service port
    #[arg(long, env = "TLSA_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Service transport protocol
    #[arg(long, env = "TLSA_PROTOCOL", default_value = DEFAULT_PROTOCOL)]
    protocol: String,

    /// Cloudflare API base URL
    #[arg(long, env = "CLOUDFLARE_API_BASE", default_value = CLOUDFLARE_API_BASE)]
    api_base: String,

    /// Log planned changes without applying them
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config {
            current_key: self.current_key.clone(),
            next_key: self.next_key.clone(),
            zone_id: self.zone_id.clone(),
            api_token: self.api_token.clone(),
            domain: self.domain.clone(),
            port: self.port,
            protocol: self.protocol.clone(),
            api_base: self.api_base.clone(),
        }
    }
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.verbose, cli.log_json) {
        eprintln!("Failed to initialize logging: {e:#}");
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Timestamped logs; WARN and ERROR go to stderr, the rest to stdout
fn init_logging(verbose: bool, json: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let writer = std::io::stderr
        .with_max_level(Level::WARN)
        .or_else(std::io::stdout);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(writer);

    if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    }
    .map_err(|e| anyhow!(e))
}

async fn run(cli: &Cli) -> Result<()> {
    let config = cli.config();
    config.validate().context("Configuration check failed")?;

    info!(
        name = %config.record_name(),
        zone_id = %config.zone_id,
        dry_run = cli.dry_run,
        "🚀 TLSA sync starting"
    );

    let current = derive(&config.current_key).context("Failed to fingerprint current key")?;
    let next = derive(&config.next_key).context("Failed to fingerprint next key")?;

    info!(current = %current, next = %next, "🔐 Key fingerprints derived");
    if current == next {
        warn!("Current and next keys have the same fingerprint");
    }

    let client = CloudflareClient::new(&config).context("Failed to initialize Cloudflare client")?;
    let reconciler = Reconciler::new(client);

    if cli.dry_run {
        let operations = reconciler
            .plan(&current, &next)
            .await
            .context("Failed to fetch TLSA records")?;

        info!("DRY RUN - would apply {} operations", operations.len());
        for op in &operations {
            info!(operation = %op, "Would apply");
        }
        return Ok(());
    }

    let report = reconciler
        .sync(&current, &next)
        .await
        .context("Failed to reconcile TLSA records")?;

    info!(
        created = report.created,
        updated = report.updated,
        deleted = report.deleted,
        "✅ TLSA records in sync"
    );

    Ok(())
}
