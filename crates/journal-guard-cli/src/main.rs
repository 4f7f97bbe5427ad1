//! Journal Guard CLI - Unlock and write to the protected journal from a terminal

mod console;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use journal_guard_core::{
    config::CONFIG_ENV_VAR, daily_thoughts, DeviceAuthenticator, Journal, LockConfig, LockEvent,
    LockHandle, LockSessionController, LockState, Route, SimulatedAuthenticator,
    SimulatedOutcome, UnlockOutcome,
};

use console::{ConsoleAuthenticator, ConsoleNavigator, ConsoleNotifier};

#[derive(Parser)]
#[command(name = "journal-guard")]
#[command(about = "Biometric lock for your private journal")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $JOURNAL_GUARD_CONFIG or the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unlock the journal and wait for it to lock again
    Unlock {
        #[command(flatten)]
        unlock: UnlockArgs,
    },

    /// Unlock the journal, save an entry and lock again
    Write {
        /// Entry text
        text: String,

        #[command(flatten)]
        unlock: UnlockArgs,
    },

    /// Show the thoughts of the day
    Thoughts,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(clap::Args)]
struct UnlockArgs {
    /// Use a simulated sensor (success, cancel, no-hardware, not-enrolled, error)
    #[arg(short, long)]
    simulate: Option<SimulatedOutcome>,

    /// Extra attempts after a failed unlock
    #[arg(short, long, default_value = "0")]
    retries: u32,

    /// Override the re-lock delay (milliseconds)
    #[arg(long)]
    relock_ms: Option<u64>,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write the default configuration
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("journal_guard_core=info,journal_guard_cli=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(LockConfig::config_file_path);

    match cli.command {
        Commands::Unlock { unlock } => handle_unlock_command(config_path, unlock).await,
        Commands::Write { text, unlock } => {
            handle_write_command(config_path, unlock, &text).await
        }
        Commands::Thoughts => {
            println!("Thoughts of the day:");
            for thought in daily_thoughts() {
                println!("  • {}", thought);
            }
            Ok(())
        }
        Commands::Config { action } => handle_config_command(config_path, action),
    }
}

/// A running controller plus the task echoing its events
struct Session {
    handle: LockHandle,
    task: JoinHandle<()>,
    printer: JoinHandle<()>,
}

impl Session {
    fn start(config_path: Option<PathBuf>, args: &UnlockArgs) -> Result<Self> {
        let mut config = match &config_path {
            Some(path) => LockConfig::load_or_default(path),
            None => LockConfig::default(),
        };
        if let Some(ms) = args.relock_ms {
            config = config.with_relock_delay(Duration::from_millis(ms));
        }

        let device: Arc<dyn DeviceAuthenticator> = match args.simulate {
            Some(outcome) => Arc::new(
                SimulatedAuthenticator::new(outcome).with_latency(Duration::from_millis(300)),
            ),
            None => Arc::new(ConsoleAuthenticator),
        };

        let (handle, task) = LockSessionController::spawn(
            config,
            device,
            Arc::new(ConsoleNavigator::new(Route::JournalCover)),
            Arc::new(ConsoleNotifier),
        )?;
        let printer = tokio::spawn(print_events(handle.events()));

        Ok(Self {
            handle,
            task,
            printer,
        })
    }

    /// Try to unlock, allowing `retries` further attempts after a failure
    ///
    /// An attempt already started by `unlock_on_start` is joined, not replaced.
    async fn unlock(&self, retries: u32) -> Result<bool> {
        for attempt in 0..=retries {
            match self.handle.unlock().await? {
                UnlockOutcome::Unlocked => return Ok(true),
                UnlockOutcome::Failed(failure) => {
                    if attempt < retries {
                        println!("✗ {} Trying again...", failure.user_message());
                    } else {
                        println!("✗ {}", failure.user_message());
                    }
                }
                UnlockOutcome::Ignored(state) => {
                    println!("Unlock ignored while {}", state);
                    return Ok(state.is_unlocked());
                }
            }
        }
        Ok(false)
    }

    /// Block until the re-lock timer closes the journal
    async fn wait_for_relock(&self) -> Result<()> {
        let mut state = self.handle.subscribe();
        state
            .wait_for(|s| *s == LockState::Locked)
            .await
            .context("Lock controller stopped unexpectedly")?;
        Ok(())
    }

    async fn finish(self) -> Result<()> {
        self.handle.teardown().await?;
        self.task.await.context("Lock controller task panicked")?;
        // Let the last events reach the terminal
        tokio::task::yield_now().await;
        self.printer.abort();
        Ok(())
    }
}

async fn print_events(mut events: broadcast::Receiver<LockEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => println!("  {}", event.to_audit_string()),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!("Event printer skipped {} events", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

async fn handle_unlock_command(config_path: Option<PathBuf>, args: UnlockArgs) -> Result<()> {
    let session = Session::start(config_path, &args)?;

    if session.unlock(args.retries).await? {
        println!("✓ Journal unlocked");
        session.wait_for_relock().await?;
        println!("✓ Journal locked again");
    }

    session.finish().await
}

async fn handle_write_command(
    config_path: Option<PathBuf>,
    args: UnlockArgs,
    text: &str,
) -> Result<()> {
    let session = Session::start(config_path, &args)?;

    if !session.unlock(args.retries).await? {
        session.finish().await?;
        bail!("Journal is locked; entry not saved");
    }

    let mut journal = Journal::new();
    let saved = journal
        .save_entry(&session.handle, text)
        .map(|entry| (entry.id, entry.written_at));

    session.finish().await?;

    let (id, written_at) = saved?;
    println!("✓ Entry saved");
    println!("  ID:      {}", id);
    println!("  Written: {}", written_at.format("%Y-%m-%d %H:%M:%S UTC"));
    Ok(())
}

fn handle_config_command(config_path: Option<PathBuf>, action: ConfigCommands) -> Result<()> {
    let Some(path) = config_path else {
        bail!(
            "No config location available; pass --config or set {}",
            CONFIG_ENV_VAR
        );
    };

    match action {
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config already exists at {} (use --force to overwrite)",
                    path.display()
                );
            }
            LockConfig::default().save(&path)?;
            println!("✓ Config written to {}", path.display());
        }
        ConfigCommands::Show => {
            let config = LockConfig::load_or_default(&path);
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
