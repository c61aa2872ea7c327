//! Ambrogio CLI - Command-line client for Ambrogio robotic mowers
//!
//! Every command goes through the per-mower command queue, so commands
//! issued by one invocation (or one script) reach the mower strictly in
//! order, with session refresh and retries handled by the queue.

mod logging;
mod output;
mod settings;

use ambrogio_core::application::{
    CoalescingReauthenticator, CommandQueue, KeepOut, MowerAction, MowerCommands,
};
use ambrogio_core::domain::MowerState;
use ambrogio_core::port::Reauthenticator;
use ambrogio_infra_tr50::{Tr50Client, Tr50Reauthenticator};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use output::StepOutcome;
use settings::AppConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "ambrogio")]
#[command(about = "Ambrogio robotic mower command-line client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, env = "AMBROGIO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Mower IMEI (overrides the configuration)
    #[arg(long, env = "AMBROGIO_IMEI", global = true)]
    imei: Option<String>,

    /// Print raw JSON responses
    #[arg(long, global = true)]
    json: bool,

    /// Also write JSON logs to this file
    #[arg(long, env = "AMBROGIO_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Queue commands without waiting for their results
    #[arg(long, global = true)]
    no_wait: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start mowing now
    WorkNow,

    /// Cut along the border wire
    BorderCut,

    /// Return to the base and charge
    ChargeNow,

    /// Charge until the given time
    ChargeUntil {
        /// Hour (0-23)
        #[arg(long)]
        hours: u8,

        /// Minute (0-59)
        #[arg(long)]
        minutes: u8,

        /// Weekday (1 = Monday, 7 = Sunday)
        #[arg(long)]
        weekday: u8,
    },

    /// Switch the working profile
    SetProfile {
        /// Profile number (1-3)
        profile: u8,
    },

    /// Ask the mower for a fresh GPS fix
    TracePosition,

    /// Keep the mower out of an area
    KeepOut {
        #[arg(long, allow_hyphen_values = true)]
        latitude: f64,

        #[arg(long, allow_hyphen_values = true)]
        longitude: f64,

        /// Radius in meters
        #[arg(long)]
        radius: Option<i64>,

        /// Until hour (0-23)
        #[arg(long)]
        hours: Option<u8>,

        /// Until minute (0-59)
        #[arg(long)]
        minutes: Option<u8>,

        /// Zone slot
        #[arg(long)]
        index: Option<i64>,
    },

    /// Wake the mower up via SMS
    WakeUp,

    /// Look up the mower (thing.find) and show its state
    Find,

    /// List the mower (thing.list) and show its state
    List,

    /// Send any TR50 command
    Raw {
        /// TR50 command name (e.g., alarm.history)
        command: String,

        /// Params as JSON string
        #[arg(long)]
        params: Option<String>,
    },

    /// Run a JSON array of actions in order
    Script {
        /// Path to the script file
        file: PathBuf,
    },
}

impl Commands {
    fn actions(&self) -> Result<Vec<MowerAction>> {
        let action = match self {
            Commands::WorkNow => MowerAction::WorkNow,
            Commands::BorderCut => MowerAction::BorderCut,
            Commands::ChargeNow => MowerAction::ChargeNow,
            Commands::ChargeUntil {
                hours,
                minutes,
                weekday,
            } => MowerAction::ChargeUntil {
                hours: *hours,
                minutes: *minutes,
                weekday: *weekday,
            },
            Commands::SetProfile { profile } => MowerAction::SetProfile { profile: *profile },
            Commands::TracePosition => MowerAction::TracePosition,
            Commands::KeepOut {
                latitude,
                longitude,
                radius,
                hours,
                minutes,
                index,
            } => MowerAction::KeepOut(KeepOut {
                latitude: *latitude,
                longitude: *longitude,
                radius: *radius,
                hours: *hours,
                minutes: *minutes,
                index: *index,
            }),
            Commands::WakeUp => MowerAction::WakeUp,
            Commands::Find => MowerAction::ThingFind,
            Commands::List => MowerAction::ThingList,
            Commands::Raw { command, params } => {
                let params = match params {
                    Some(raw) => serde_json::from_str(raw).context("Invalid JSON params")?,
                    None => serde_json::Value::Null,
                };
                MowerAction::Raw {
                    command: command.clone(),
                    params,
                }
            }
            Commands::Script { file } => return load_script(file),
        };
        Ok(vec![action])
    }

    fn is_script(&self) -> bool {
        matches!(self, Commands::Script { .. })
    }
}

fn load_script(path: &Path) -> Result<Vec<MowerAction>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let actions: Vec<MowerAction> =
        serde_json::from_str(&contents).context("Invalid script: expected a JSON array of actions")?;
    if actions.is_empty() {
        anyhow::bail!("Script {} contains no actions", path.display());
    }
    Ok(actions)
}

/// Run `actions` in order; returns one outcome per action
async fn run_actions(mower: &MowerCommands, actions: &[MowerAction]) -> Vec<StepOutcome> {
    let mut outcomes = Vec::with_capacity(actions.len());
    for action in actions {
        let result = mower.execute(action).await.map_err(|e| e.to_string());
        if let Err(e) = &result {
            warn!(action = %action.name(), error = %e, "Action failed");
        }
        outcomes.push(StepOutcome {
            action: action.name().to_string(),
            result,
        });
    }
    outcomes
}

/// Queue `actions` without waiting; they are drained when the queue stops
async fn enqueue_actions(mower: &MowerCommands, actions: &[MowerAction]) -> Result<Vec<String>> {
    let mut queued = Vec::with_capacity(actions.len());
    for action in actions {
        mower
            .enqueue(action)
            .await
            .with_context(|| format!("Failed to queue {}", action.name()))?;
        queued.push(action.name().to_string());
    }
    Ok(queued)
}

fn report(cli: &Cli, actions: &[MowerAction], outcomes: &[StepOutcome]) -> Result<()> {
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

    if cli.command.is_script() {
        output::print_steps(outcomes, cli.json);
    } else {
        for (action, outcome) in actions.iter().zip(outcomes) {
            match &outcome.result {
                Ok(value) => {
                    output::print_result(&outcome.action, value, cli.json);
                    if !cli.json {
                        print_state_if_lookup(action, value);
                    }
                }
                Err(e) => output::print_error(&format!("{} failed: {}", outcome.action, e)),
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} action(s) failed", failed, outcomes.len());
    }
    Ok(())
}

fn print_state_if_lookup(action: &MowerAction, value: &serde_json::Value) {
    let mut state = MowerState::default();
    let changed = match action {
        MowerAction::ThingFind => state.apply_find(value),
        MowerAction::ThingList => state.apply_list(value),
        _ => return,
    };
    if changed {
        println!();
        output::print_state(&state);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Logging (guard flushes the file writer on exit)
    let _log_guard = logging::init(cli.log_file.as_deref())?;
    info!("Ambrogio CLI v{} starting...", VERSION);

    // 2. Configuration
    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(imei) = &cli.imei {
        config.imei = Some(imei.clone());
    }
    config.validate().context("Invalid configuration")?;
    let identity = config.identity()?.to_string();
    let credentials = config.credentials()?;

    let actions = cli.command.actions()?;

    // 3. Authenticate
    let client = Arc::new(Tr50Client::new(config.tr50_config()).context("Failed to create TR50 client")?);
    client
        .authenticate(&credentials)
        .await
        .context("Authentication failed")?;
    info!(client_name = %config.client_name, imei = %identity, "Session established");

    // 4. Queue wiring (DI)
    let reauth: Arc<dyn Reauthenticator> = Arc::new(CoalescingReauthenticator::new(
        Tr50Reauthenticator::new(client.clone(), credentials),
    ));
    let queue = Arc::new(CommandQueue::new(client, Some(reauth), config.queue_config()));
    let mower = MowerCommands::new(queue.clone(), identity).with_ack_timeout(config.ack_timeout_secs);

    // 5. Run until done or interrupted
    let outcome = tokio::select! {
        result = async {
            if cli.no_wait {
                enqueue_actions(&mower, &actions).await.map(|queued| {
                    output::print_queued(&queued);
                    None
                })
            } else {
                Ok(Some(run_actions(&mower, &actions).await))
            }
        } => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, stopping command queue");
            Ok(None)
        }
    };

    // 6. Graceful shutdown: drain whatever is still queued
    queue.stop().await;
    info!("Shutdown complete");

    match outcome? {
        Some(outcomes) => report(&cli, &actions, &outcomes),
        None => Ok(()),
    }
}
