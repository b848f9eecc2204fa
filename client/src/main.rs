//! ratesync command-line client.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ratesync_client::{ClientConfig, RateClient, SyncOutcome};
use ratesync_common::CurrencyCode;
use ratesync_fx::{format_amount, format_rate, NumberLocale};

#[derive(Parser)]
#[command(name = "ratesync", version, about = "Local-first exchange-rate cache")]
struct Cli {
    /// SQLite database file.
    #[arg(long, global = true, env = "RATESYNC_DB_PATH")]
    db: Option<PathBuf>,

    /// Root URL of the pricing service.
    #[arg(long, global = true, env = "RATESYNC_BASE_URL")]
    base_url: Option<String>,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch the latest rates and store them.
    Sync,
    /// Print the stored rates.
    List {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Convert an amount between two currencies.
    Convert {
        amount: f64,
        from: String,
        to: String,
    },
    /// Delete every stored rate.
    Clear,
}

fn init_tracing(level: &str, json: bool) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| level.to_string()),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = ClientConfig::from_env();
    if let Some(db) = cli.db {
        config.database_path = db;
    }
    if let Some(url) = cli.base_url {
        config.gateway.base_url = url;
    }

    init_tracing(&config.log_level, cli.json_logs);

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    let locale = config.locale;
    let client = RateClient::open(config)
        .await
        .context("failed to open rate client")?;
    client.load().await;

    let result = run(&client, cli.command, locale).await;

    let outcome = client.shutdown().await;
    info!(?outcome, "Telemetry drained");
    result
}

async fn run(client: &RateClient, command: Command, locale: NumberLocale) -> anyhow::Result<()> {
    match command {
        Command::Sync => match client.sync_now().await {
            SyncOutcome::Completed { rates } => {
                println!("Synced {} rates", rates.len());
                Ok(())
            }
            SyncOutcome::Failed(kind) => Err(anyhow::anyhow!("{}: {}", kind, kind.user_message())),
            SyncOutcome::Skipped => Ok(()),
        },
        Command::List { json } => {
            let rates = client.current_rates();
            if json {
                println!("{}", serde_json::to_string_pretty(&*rates)?);
                return Ok(());
            }

            let base = client.base_currency();
            for rate in rates.iter() {
                println!(
                    "{:<6} {:>14} {}  {}",
                    rate.code,
                    format_rate(rate.units_per_base, locale),
                    base,
                    rate.display_name,
                );
            }
            if client.is_using_defaults() {
                println!("using built-in defaults (never synced)");
            } else if let Some(at) = client.last_synced_at() {
                println!("updated {}", at.to_rfc3339());
            }
            Ok(())
        }
        Command::Convert { amount, from, to } => {
            let from = CurrencyCode::new(from);
            let to = CurrencyCode::new(to);
            let value = client.convert(amount, &from, &to)?;
            println!("{} {} = {} {}", amount, from, format_amount(value, &to, locale), to);
            Ok(())
        }
        Command::Clear => {
            let removed = client.clear_cache().await?;
            println!("Removed {removed} rates");
            Ok(())
        }
    }
}
