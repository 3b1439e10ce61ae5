//! central - runs the worker service in a single process.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;

use central_core::config::AppConfig;
use central_core::impls::{SiakadPictureSource, TelegramGateway};
use central_core::observability::init_logging;
use central_core::policy::PolicyTable;
use central_core::ports::SystemClock;
use central_core::service::CentralService;

#[derive(Parser, Debug)]
#[command(name = "central", version, about = "Central worker service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the worker pool, scheduler and health probe until Ctrl-C.
    Worker {
        /// TOML configuration file. Defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Also long-poll the Telegram bot for updates.
        #[arg(long)]
        bot: bool,
    },
    /// Print the effective per-task policies.
    Policies {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(AppConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Worker { config, bot } => {
            let config = load_config(config.as_ref())?;
            init_logging(&config.log.level);
            run_worker(config, bot).await
        }
        Commands::Policies { config } => {
            let config = load_config(config.as_ref())?;
            print_policies(&PolicyTable::from_config(&config)?);
            Ok(())
        }
    }
}

async fn run_worker(config: AppConfig, with_bot: bool) -> anyhow::Result<()> {
    if with_bot && config.telegram.bot_token.is_empty() {
        anyhow::bail!("--bot needs telegram.bot_token in the config");
    }
    let gateway = Arc::new(TelegramGateway::new(&config.telegram)?);
    let pictures = Arc::new(SiakadPictureSource::new(&config.siakad)?);
    let service = CentralService::in_memory(
        config,
        gateway.clone(),
        pictures,
        Arc::new(SystemClock),
    )?;

    let handle = service.worker_server()?.start();
    let (stop_tx, stop_rx) = watch::channel(false);
    let poller = with_bot.then(|| tokio::spawn(poll_bot(gateway, service.bot.clone(), stop_rx)));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for Ctrl-C")?;
    tracing::info!("Ctrl-C received");

    let _ = stop_tx.send(true);
    if let Some(poller) = poller {
        let _ = poller.await;
    }
    handle.stop().await;
    Ok(())
}

async fn poll_bot(
    gateway: Arc<TelegramGateway>,
    bot: Arc<central_core::secret::BotCommands>,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut offset = 0;
    tracing::info!("telegram polling started");
    loop {
        let polled = tokio::select! {
            _ = stop_rx.changed() => break,
            polled = gateway.get_updates(offset) => polled,
        };
        match polled {
            Ok((next, updates)) => {
                offset = next;
                for update in updates {
                    if let Err(e) = bot.handle_update(update).await {
                        tracing::error!(error = %e, "failed to handle bot update");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "telegram polling failed");
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
    tracing::info!("telegram polling stopped");
}

fn print_policies(table: &PolicyTable) {
    println!(
        "{:<56} {:>9} {:>8} {:>8}  backoff",
        "kind", "max_retry", "timeout", "lane"
    );
    for (kind, policy) in table.iter() {
        println!(
            "{:<56} {:>9} {:>7}s {:>8}  {:?}",
            kind.as_str(),
            policy.max_retry,
            policy.timeout.as_secs(),
            policy.priority.as_str(),
            policy.backoff,
        );
    }
}
