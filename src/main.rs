use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use giftwatch::config::Config;
use giftwatch::fetch::{AxeetechSource, BoostbotSource, HttpFetcher, Source};
use giftwatch::models::ChannelRef;
use giftwatch::notify::{AnnouncementSource, BridgeSink, NotificationSink};
use giftwatch::reconcile::Reconciler;
use giftwatch::scheduler::{
    parse_time_of_day, ReminderScheduler, SystemClock, Sweeper,
};
use giftwatch::store::{CodeStore, GuildRegistry};
use giftwatch::sync::{SyncEngine, SyncError};
use giftwatch::verify::VerificationEngine;

#[derive(Parser)]
#[command(
    name = "giftwatch",
    version,
    about = "Gift-code tracker and event reminder scheduler for KingShot communities",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the daemon: reminder timers plus the sync/reconcile sweep
    Run,

    /// Run one sync pass against the configured sources
    Sync,

    /// Manually add a gift code (7-day default validity)
    Add {
        /// The code itself, case-sensitive
        code: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,

        /// Optional reward text
        #[arg(short, long)]
        rewards: Option<String>,
    },

    /// Verify a single code against the store
    Verify {
        /// The code to check
        code: String,
    },

    /// List known codes
    Codes {
        /// Include expired codes
        #[arg(long)]
        all: bool,
    },

    /// Reconcile every configured guild channel now
    Reconcile,

    /// Inspect or change per-guild reminder configuration
    Guild {
        #[command(subcommand)]
        command: GuildCommands,
    },
}

#[derive(Subcommand)]
enum GuildCommands {
    /// Show one guild's configuration
    Show { guild_id: String },

    /// Update one guild's configuration
    Set {
        guild_id: String,

        /// Channel for code announcements
        #[arg(long)]
        code_channel: Option<String>,

        /// Channel for event reminders
        #[arg(long)]
        reminder_channel: Option<String>,

        /// Bear Trap time as HH:MM UTC
        #[arg(long)]
        bear_trap_time: Option<String>,

        /// Days between Bear Trap reminders
        #[arg(long)]
        bear_trap_interval: Option<u32>,

        /// Enable or disable Arena reminders
        #[arg(long)]
        arena: Option<bool>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    config.validate()?;

    match cli.command {
        Commands::Run => run(config).await?,
        Commands::Sync => sync(config).await?,
        Commands::Add {
            code,
            description,
            rewards,
        } => add(config, &code, description.as_deref(), rewards.as_deref()).await?,
        Commands::Verify { code } => verify(config, &code).await?,
        Commands::Codes { all } => codes(config, all).await?,
        Commands::Reconcile => reconcile(config).await?,
        Commands::Guild { command } => guild(config, command).await?,
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("giftwatch=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("giftwatch=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

/// Everything the subcommands assemble from configuration
struct Services {
    store: Arc<CodeStore>,
    registry: Arc<GuildRegistry>,
    sync: Arc<SyncEngine>,
    engine: Arc<VerificationEngine>,
    reconciler: Arc<Reconciler>,
    sink: Arc<dyn NotificationSink>,
}

fn build_services(config: &Config) -> Result<Services> {
    let store = Arc::new(CodeStore::open(&config.store.codes_path));
    let registry = Arc::new(GuildRegistry::open(&config.store.guilds_path));

    let fetcher = Arc::new(HttpFetcher::with_config(
        config.fetch.requests_per_second,
        config.fetch.max_retries,
        config.request_timeout(),
    )?);
    let sources: Vec<Arc<dyn Source>> = vec![
        Arc::new(AxeetechSource::with_url(
            Arc::clone(&fetcher),
            config.sources.axeetech_url.clone(),
        )),
        Arc::new(BoostbotSource::with_url(
            Arc::clone(&fetcher),
            config.sources.boostbot_url.clone(),
        )),
    ];
    let sync = Arc::new(SyncEngine::new(Arc::clone(&store), sources));

    let clock = Arc::new(SystemClock);
    let engine = Arc::new(VerificationEngine::new(Arc::clone(&store), clock));

    let bridge = Arc::new(BridgeSink::new(config.bridge.clone())?);
    let sink: Arc<dyn NotificationSink> = bridge.clone();
    let announcements: Arc<dyn AnnouncementSource> = bridge;

    let reconciler = Arc::new(
        Reconciler::new(
            Arc::clone(&engine),
            announcements,
            Arc::clone(&sink),
        )
        .with_scan_limit(config.sweep.announcement_scan_limit),
    );

    Ok(Services {
        store,
        registry,
        sync,
        engine,
        reconciler,
        sink,
    })
}

async fn run(config: Config) -> Result<()> {
    tracing::info!("giftwatch daemon starting");
    let services = build_services(&config)?;

    let arena_time = parse_time_of_day(&config.reminders.arena_time)?;
    let scheduler = ReminderScheduler::new(
        Arc::clone(&services.registry),
        Arc::clone(&services.sink),
        Arc::new(SystemClock),
        arena_time,
    );
    scheduler.start().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = Arc::new(
        Sweeper::new(
            Arc::clone(&services.registry),
            Arc::clone(&services.sync),
            Arc::clone(&services.reconciler),
            Arc::clone(&services.sink),
            Arc::new(SystemClock),
        )
        .with_interval(config.sweep_interval()),
    );
    let sweep_task = sweeper.spawn(shutdown_rx);

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    // Let an in-flight sweep pass finish, then stop the timers
    shutdown_tx.send(true).ok();
    let _ = sweep_task.await;
    scheduler.shutdown();

    tracing::info!("giftwatch daemon stopped");
    Ok(())
}

async fn sync(config: Config) -> Result<()> {
    let services = build_services(&config)?;

    match services.sync.sync_once().await {
        Ok(outcome) => {
            println!(
                "Sync completed: {} new of {} candidates",
                outcome.added, outcome.total_candidates
            );
            for code in &outcome.new_codes {
                println!(
                    "  {}  (valid until {})",
                    code.code,
                    code.valid_until.format("%Y-%m-%d")
                );
            }
        }
        Err(SyncError::NoCodesFound) => {
            println!("No codes found on any source");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}

async fn add(
    config: Config,
    code: &str,
    description: Option<&str>,
    rewards: Option<&str>,
) -> Result<()> {
    let services = build_services(&config)?;

    let added = services.store.add(code, description, rewards).await?;
    println!(
        "Added {} (valid until {})",
        added.code,
        added.valid_until.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

async fn verify(config: Config, code: &str) -> Result<()> {
    let services = build_services(&config)?;

    let verification = services.engine.verify(code).await;
    match (verification.valid, verification.code) {
        (true, Some(stored)) => println!(
            "{} is valid until {} - rewards: {}",
            stored.code,
            stored.valid_until.format("%Y-%m-%d %H:%M UTC"),
            stored.rewards
        ),
        (_, stored) => {
            let reason = verification
                .reason
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("{code} is not valid: {reason}");
            if let Some(stored) = stored {
                println!("  was valid until {}", stored.valid_until.format("%Y-%m-%d %H:%M UTC"));
            }
        }
    }
    Ok(())
}

async fn codes(config: Config, all: bool) -> Result<()> {
    let services = build_services(&config)?;

    let mut listed = services.store.all().await;
    listed.sort_by(|a, b| a.valid_until.cmp(&b.valid_until));

    let mut active = 0usize;
    let mut expired = 0usize;
    for code in &listed {
        if code.is_expired() {
            expired += 1;
            if !all {
                continue;
            }
        } else {
            active += 1;
        }

        let status = if code.is_expired() { "expired" } else { "active" };
        println!(
            "{:<16} {:>8}  until {}  {}",
            code.code,
            status,
            code.valid_until.format("%Y-%m-%d"),
            code.rewards
        );
    }

    println!("{active} active, {expired} expired");
    Ok(())
}

async fn reconcile(config: Config) -> Result<()> {
    let services = build_services(&config)?;

    for (guild, guild_config) in services.registry.all().await {
        let Some(channel) = guild_config.code_channel else {
            continue;
        };

        match services.reconciler.reconcile_channel(&channel).await {
            Ok(report) => println!(
                "{guild}: {} verified, {} expired",
                report.verified, report.expired
            ),
            Err(e) => println!("{guild}: scan failed ({e})"),
        }
    }
    Ok(())
}

async fn guild(config: Config, command: GuildCommands) -> Result<()> {
    let services = build_services(&config)?;

    match command {
        GuildCommands::Show { guild_id } => {
            match services.registry.get(&guild_id).await {
                Some(guild_config) => {
                    println!("code channel:       {}", display_opt(&guild_config.code_channel));
                    println!("reminder channel:   {}", display_opt(&guild_config.reminder_channel));
                    println!(
                        "bear trap:          {} every {} days",
                        guild_config.bear_trap_time.as_deref().unwrap_or("-"),
                        guild_config.bear_trap_interval_days
                    );
                    println!(
                        "arena reminders:    {}",
                        if guild_config.arena_reminders_enabled { "on" } else { "off" }
                    );
                    if let Some(last) = guild_config.last_check {
                        println!("last check:         {}", last.format("%Y-%m-%d %H:%M UTC"));
                    }
                }
                None => println!("guild {guild_id} is not configured"),
            }
        }
        GuildCommands::Set {
            guild_id,
            code_channel,
            reminder_channel,
            bear_trap_time,
            bear_trap_interval,
            arena,
        } => {
            if let Some(time) = &bear_trap_time {
                parse_time_of_day(time)?;
            }
            if bear_trap_interval == Some(0) {
                anyhow::bail!("bear trap interval must be at least 1 day");
            }

            let updated = services
                .registry
                .update(&guild_id, |guild_config| {
                    if let Some(channel) = code_channel {
                        guild_config.code_channel = Some(ChannelRef::new(channel));
                    }
                    if let Some(channel) = reminder_channel {
                        guild_config.reminder_channel = Some(ChannelRef::new(channel));
                    }
                    if let Some(time) = bear_trap_time {
                        guild_config.bear_trap_time = Some(time);
                    }
                    if let Some(interval) = bear_trap_interval {
                        guild_config.bear_trap_interval_days = interval;
                    }
                    if let Some(enabled) = arena {
                        guild_config.arena_reminders_enabled = enabled;
                    }
                })
                .await?;

            println!("guild {guild_id} updated");
            if updated.bear_trap_configured() {
                println!("bear trap reminders re-derive from this config at next daemon start");
            }
        }
    }
    Ok(())
}

fn display_opt(channel: &Option<ChannelRef>) -> String {
    channel
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "-".to_string())
}
