//! # Broadcast — resumable campaign runner
//!
//! Sends one of several message variants to every group (or friend) on a
//! OneBot backend, one recipient at a time, and records progress so an
//! interrupted campaign can be resumed with the same save name.
//!
//! Usage:
//!   broadcast -s spring -w "hello||hi there"          # all groups from the backend
//!   broadcast -s spring -w promo.txt -p targets -d 30  # ids from targets.txt
//!   broadcast -s dm -f -w "notice" -c 50 -r            # half of all friends, shuffled

mod launcher;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use broadcast_channels::{OneBotChannel, OneBotConfig};
use broadcast_core::{BroadcastConfig, TargetKind, Transport};
use broadcast_scheduler::{
    DispatchLoop, DispatchSettings, ProgressLedger, RecipientMode, TextAssetStore,
    resolve_messages, resolve_recipients,
};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "broadcast",
    version,
    about = "Resumable, rate-limited broadcast campaigns over a OneBot HTTP API"
)]
struct Cli {
    /// HTTP API base address, e.g. http://localhost:5700
    #[arg(short = 'a', long = "api")]
    api: Option<String>,

    /// Recipient list asset (one id per line, `.txt` optional); omit to fetch the roster
    #[arg(short = 'p', long = "list")]
    list: Option<String>,

    /// Message content; `name.txt` reads variants from an asset, otherwise split on `||`
    #[arg(short = 'w', long = "message")]
    message: String,

    /// Seconds to wait between recipients
    #[arg(short = 'd', long = "delay")]
    delay: Option<u64>,

    /// Percent chance that each pending recipient is messaged this run
    #[arg(short = 'c', long = "chance", value_parser = clap::value_parser!(u8).range(0..=100))]
    chance: Option<u8>,

    /// Save name identifying the campaign; reuse it to resume
    #[arg(short = 's', long = "save")]
    save: String,

    /// Keep only the first sub-channel of each channel
    #[arg(short = 'g', long = "filter-channels")]
    filter_channels: bool,

    /// Message friends (private messages) instead of groups
    #[arg(short = 'f', long = "friends")]
    friends: bool,

    /// access_token for the HTTP API
    #[arg(short = 't', long = "token")]
    token: Option<String>,

    /// Shuffle the recipient order
    #[arg(short = 'r', long = "shuffle")]
    shuffle: bool,

    /// Config file (default: ~/.broadcast/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Flags that reproduce this invocation, for the resume launcher.
    fn launcher_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        let mut push = |flag: &str, value: String| {
            args.push(flag.to_string());
            args.push(value);
        };
        if let Some(api) = &self.api {
            push("-a", api.clone());
        }
        push("-w", self.message.clone());
        if let Some(list) = &self.list {
            push("-p", list.clone());
        }
        if let Some(delay) = self.delay {
            push("-d", delay.to_string());
        }
        if let Some(chance) = self.chance {
            push("-c", chance.to_string());
        }
        push("-s", self.save.clone());
        if let Some(token) = &self.token {
            push("-t", token.clone());
        }
        if let Some(config) = &self.config {
            push("--config", config.display().to_string());
        }
        for (set, flag) in [
            (self.filter_channels, "-g"),
            (self.friends, "-f"),
            (self.shuffle, "-r"),
        ] {
            if set {
                args.push(flag.to_string());
            }
        }
        args
    }

    /// File config with command line overrides applied.
    fn resolve_config(&self) -> Result<BroadcastConfig> {
        let mut config = match &self.config {
            Some(path) => BroadcastConfig::load_from(path)?,
            None => BroadcastConfig::load()?,
        };
        if let Some(api) = &self.api {
            config.api_base = api.clone();
        }
        if let Some(token) = &self.token {
            config.access_token = token.clone();
        }
        if let Some(delay) = self.delay {
            config.delay_secs = delay;
        }
        if let Some(chance) = self.chance {
            config.chance_percent = chance;
        }
        config.assets_dir = shellexpand::tilde(&config.assets_dir).to_string();
        config.normalize();
        Ok(config)
    }

    fn target(&self) -> TargetKind {
        if self.friends {
            TargetKind::Direct
        } else {
            TargetKind::Group
        }
    }

    fn recipient_mode(&self) -> RecipientMode {
        match &self.list {
            Some(name) => RecipientMode::Asset { name: name.clone() },
            None => RecipientMode::Backend {
                kind: self.target(),
                filter_channels: self.filter_channels,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "broadcast=debug,broadcast_scheduler=debug,broadcast_channels=debug,broadcast_core=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    run(cli).await.inspect_err(|e| tracing::error!("Campaign aborted: {e:#}"))
}

async fn run(cli: Cli) -> Result<()> {
    let config = cli.resolve_config()?;
    let shutdown = CancellationToken::new();
    spawn_signal_listener(shutdown.clone());

    let assets = Arc::new(
        TextAssetStore::open(&config.assets_dir)
            .with_context(|| format!("opening assets dir {}", config.assets_dir))?,
    );
    let refresh = assets.spawn_refresh(config.asset_refresh_interval(), shutdown.clone());

    let line = launcher::command_line(&launcher::executable_name(), &cli.launcher_args());
    match launcher::write_launcher(assets.dir(), &cli.save, &line) {
        Ok(path) => tracing::info!(launcher = %path.display(), "Resume command saved"),
        Err(e) => tracing::warn!("Failed to write resume launcher: {e}"),
    }

    let transport: Arc<dyn Transport> = Arc::new(OneBotChannel::new(
        OneBotConfig::new(config.api_base.clone()).with_token(config.access_token.clone()),
    )?);
    let mut rng = StdRng::from_entropy();

    let variants = resolve_messages(&assets, &cli.message).context("resolving message content")?;
    let recipients = resolve_recipients(
        transport.as_ref(),
        &assets,
        &cli.save,
        &cli.recipient_mode(),
        cli.shuffle,
        &mut rng,
    )
    .await
    .context("resolving recipients")?;

    let ledger = ProgressLedger::new(assets.dir(), cli.save.clone());
    match ledger.summary() {
        Ok(summary) if summary.total > 0 => tracing::info!(
            ledger = %ledger.path().display(),
            settled = summary.settled,
            pending = summary.pending(),
            "Resuming campaign"
        ),
        Ok(_) => tracing::info!(campaign = %cli.save, "Starting new campaign"),
        Err(e) => tracing::warn!(ledger = %ledger.path().display(), "Failed to read ledger: {e}"),
    }

    let settings = DispatchSettings {
        delay: config.delay(),
        chance_percent: config.chance_percent,
        target: cli.target(),
    };
    let dispatcher = DispatchLoop::new(transport, ledger, settings, shutdown.clone());
    let report = dispatcher
        .run(&recipients.original_list, &recipients.ids, &variants, &mut rng)
        .await?;

    if report.cancelled {
        tracing::warn!(
            campaign = %cli.save,
            "Campaign interrupted; rerun with the same save name to resume"
        );
    }

    shutdown.cancel();
    let _ = refresh.await;
    Ok(())
}

/// Trip `shutdown` on SIGINT or SIGTERM.
fn spawn_signal_listener(shutdown: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let (Ok(mut sigint), Ok(mut sigterm)) = (
                signal(SignalKind::interrupt()),
                signal(SignalKind::terminate()),
            ) else {
                tracing::warn!("Failed to install signal handlers");
                return;
            };
            tokio::select! {
                _ = sigint.recv() => tracing::warn!("SIGINT received, stopping after the current recipient"),
                _ = sigterm.recv() => tracing::warn!("SIGTERM received, stopping after the current recipient"),
                _ = shutdown.cancelled() => return,
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => tracing::warn!("Ctrl+C received, stopping after the current recipient"),
                _ = shutdown.cancelled() => return,
            }
        }

        shutdown.cancel();
    });
}
