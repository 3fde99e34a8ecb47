//! Nuveen - command-line front end for the NFC alarm core
//!
//! Manages alarms and settings in the data directory, runs ringing
//! sessions with tag identifiers read from stdin, and waits for scheduled
//! alarms to ring.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{ArgAction, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nuveen::app::{self, AppState};
use nuveen::config::AppConfig;
use nuveen::database::{
    AlarmTime, CreateAlarmRequest, GradientStyle, GradientTheme, RepeatDays, Theme,
    UpdateAlarmRequest,
};
use nuveen::error::AppError;
use nuveen::platform::{ChannelTagReader, LogAlert, NfcCapability, TagFeed};
use nuveen::services::{
    checksum, format_repeat_days, validate, AlarmEvent, MatchMode, RingingSession, ScanOutcome,
};

/// Command-line arguments for nuveen
#[derive(Parser, Debug)]
#[command(name = "nuveen")]
#[command(about = "Alarm clock that only stops when you scan your NFC tag")]
#[command(version)]
struct Args {
    /// Directory holding the alarm database
    #[arg(long, default_value = "nuveen-data", env = "NUVEEN_DATA_DIR")]
    data_dir: PathBuf,

    /// Tag matching: strict (exact identifier) or lenient (checksum too)
    #[arg(long, default_value = "strict", env = "NUVEEN_TAG_MATCH_MODE")]
    match_mode: MatchMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List alarms
    List,
    /// Create an alarm
    Add {
        /// Time as HH:MM (24h)
        #[arg(long)]
        time: AlarmTime,
        #[arg(long)]
        name: Option<String>,
        /// Weekdays to repeat on, 0 = Sunday (e.g. 1,2,3,4,5)
        #[arg(long, value_delimiter = ',')]
        repeat: Vec<u8>,
        #[arg(long)]
        theme: Option<GradientTheme>,
        /// Allow dismissing without a tag
        #[arg(long)]
        no_nfc: bool,
    },
    /// Change an alarm
    Edit {
        id: String,
        #[arg(long)]
        time: Option<AlarmTime>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, value_delimiter = ',')]
        repeat: Option<Vec<u8>>,
        #[arg(long)]
        theme: Option<GradientTheme>,
    },
    /// Enable or disable an alarm
    Toggle { id: String },
    /// Delete an alarm
    Delete { id: String },
    /// Show the next alarm and its countdown
    Next,
    /// Manage the dismissal tag
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Show or change preferences
    Settings {
        #[command(subcommand)]
        action: Option<SettingsAction>,
    },
    /// Show or complete onboarding
    Onboarding {
        #[arg(long)]
        complete: bool,
    },
    /// Check a scanned tag against a configured one
    Validate {
        scanned: String,
        #[arg(long)]
        configured: Option<String>,
        #[arg(long)]
        mode: Option<MatchMode>,
    },
    /// Print the checksum of an identifier
    Checksum { value: String },
    /// Ring an alarm; tag identifiers are read line by line from stdin
    Ring {
        alarm_id: String,
        /// Behave as if the device had no NFC hardware
        #[arg(long)]
        no_nfc: bool,
    },
    /// List wake logs
    Logs,
    /// Schedule all alarms and wait for them to ring
    Run,
}

#[derive(Subcommand, Debug)]
enum TagAction {
    /// Scan a tag from stdin and register it
    Register,
    /// Forget the registered tag
    Remove,
    /// Show the registered tag
    Show,
}

#[derive(Subcommand, Debug)]
enum SettingsAction {
    Vibration {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
    Theme { theme: Theme },
    Style { style: GradientStyle },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nuveen=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    // Stateless commands need no database
    match &args.command {
        Command::Validate {
            scanned,
            configured,
            mode,
        } => {
            let mode = mode.unwrap_or(args.match_mode);
            let validation = validate(Some(scanned.as_str()), configured.as_deref(), mode);
            println!(
                "{} ({})",
                if validation.valid { "valid" } else { "invalid" },
                validation.reason
            );
            return Ok(());
        }
        Command::Checksum { value } => {
            println!("{}", checksum(value));
            return Ok(());
        }
        _ => {}
    }

    info!("Starting Nuveen");
    info!("Data directory: {}", args.data_dir.display());

    let no_nfc = matches!(args.command, Command::Ring { no_nfc: true, .. });
    let (capability, feed) = if no_nfc {
        (NfcCapability::Unavailable, None)
    } else {
        let (reader, feed) = ChannelTagReader::new(8);
        (NfcCapability::available(reader), Some(feed))
    };

    let config = AppConfig::new(args.data_dir.clone(), args.match_mode);
    let state = app::setup(config, capability, Arc::new(LogAlert::new()))
        .await
        .context("Failed to initialize application")?;

    match args.command {
        Command::List => list(&state),
        Command::Add {
            time,
            name,
            repeat,
            theme,
            no_nfc,
        } => {
            let mut req = CreateAlarmRequest::new(time);
            req.name = name.unwrap_or_default();
            req.repeat_days = RepeatDays::new(repeat)?;
            req.gradient_theme = theme.unwrap_or_default();
            req.nfc_required = !no_nfc;

            let alarm = state.alarms.create_alarm(req).await?;
            println!("Created {} ({}) at {}", alarm.id, alarm.display_name(), alarm.time);
        }
        Command::Edit {
            id,
            time,
            name,
            repeat,
            theme,
        } => {
            let repeat_days = repeat.map(RepeatDays::new).transpose()?;
            let alarm = state
                .alarms
                .update_alarm(UpdateAlarmRequest {
                    id,
                    name,
                    time,
                    repeat_days,
                    gradient_theme: theme,
                    ..Default::default()
                })
                .await?;
            println!("Updated {} ({}) at {}", alarm.id, alarm.display_name(), alarm.time);
        }
        Command::Toggle { id } => {
            let alarm = state.alarms.toggle_alarm(&id).await?;
            println!(
                "{} is now {}",
                alarm.display_name(),
                if alarm.enabled { "on" } else { "off" }
            );
        }
        Command::Delete { id } => {
            state.alarms.delete_alarm(&id).await?;
            println!("Deleted {}", id);
        }
        Command::Next => match state.alarms.next_alarm(Local::now().naive_local()) {
            Some(next) => println!(
                "{} at {} ({})",
                next.alarm.display_name(),
                next.alarm.time,
                next.countdown()
            ),
            None => println!("No alarms set"),
        },
        Command::Tag { action } => tag(&state, action, feed).await?,
        Command::Settings { action } => settings(&state, action).await?,
        Command::Onboarding { complete } => {
            if complete {
                state.settings.complete_onboarding().await?;
            }
            println!(
                "Onboarding {}",
                if state.settings.is_onboarding_complete().await {
                    "complete"
                } else {
                    "not complete"
                }
            );
        }
        Command::Ring { alarm_id, .. } => ring(&state, &alarm_id, feed).await?,
        Command::Logs => {
            for log in state.settings.wake_logs().await? {
                println!("{}  {}  alarm {}", log.date.to_rfc3339(), log.wake_time, log.alarm_id);
            }
        }
        Command::Run => run(&state).await?,
        Command::Validate { .. } | Command::Checksum { .. } => {}
    }

    Ok(())
}

fn list(state: &AppState) {
    let alarms = state.alarms.alarms();
    if alarms.is_empty() {
        println!("No alarms set");
        return;
    }

    for alarm in alarms {
        println!(
            "{}  {}  {:<16} {:<24} {}{}",
            alarm.id,
            alarm.time,
            alarm.display_name(),
            format_repeat_days(&alarm.repeat_days),
            if alarm.enabled { "on" } else { "off" },
            if alarm.nfc_required { "" } else { " (no NFC)" }
        );
    }
}

async fn tag(state: &AppState, action: TagAction, feed: Option<TagFeed>) -> Result<()> {
    match action {
        TagAction::Register => {
            let feed = feed.context("NFC reader not available")?;
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            println!("Scan your tag...");

            let registered = with_stdin_tag(
                state.settings.register_tag(&state.capability),
                &feed,
                &mut lines,
            )
            .await?;

            match registered {
                Some(result) => println!("Registered tag {}", result?),
                None => println!("No tag presented"),
            }
        }
        TagAction::Remove => {
            state.settings.remove_tag().await?;
            println!("Tag removed; any tag will dismiss alarms");
        }
        TagAction::Show => match state.settings.load().await?.nfc_tag_id {
            Some(tag) => println!("{}", tag),
            None => println!("No tag registered"),
        },
    }
    Ok(())
}

async fn settings(state: &AppState, action: Option<SettingsAction>) -> Result<()> {
    let settings = match action {
        None => state.settings.load().await?,
        Some(SettingsAction::Vibration { enabled }) => state.settings.set_vibration(enabled).await?,
        Some(SettingsAction::Theme { theme }) => state.settings.set_theme(theme).await?,
        Some(SettingsAction::Style { style }) => state.settings.set_gradient_style(style).await?,
    };

    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}

/// Run `op` while presenting the next stdin line as a tag.
///
/// `op` is polled once before stdin is read so the reader is already
/// listening. Returns `None` when stdin ends first.
async fn with_stdin_tag<F: Future>(
    op: F,
    feed: &TagFeed,
    lines: &mut Lines<BufReader<Stdin>>,
) -> Result<Option<F::Output>> {
    tokio::pin!(op);

    let line = tokio::select! {
        biased;
        output = &mut op => return Ok(Some(output)),
        line = lines.next_line() => line.context("Failed to read stdin")?,
    };

    let Some(line) = line else {
        return Ok(None);
    };

    let tag = line.trim();
    feed.present((!tag.is_empty()).then(|| tag.to_string())).await?;

    Ok(Some(op.await))
}

async fn ring(state: &AppState, alarm_id: &str, feed: Option<TagFeed>) -> Result<()> {
    let session = state.start_ringing(alarm_id).await?;
    println!("{} is ringing", session.alarm().display_name());

    let Some(feed) = feed else {
        return match session.scan().await {
            Err(AppError::HardwareUnavailable) => dismiss_manually(&session).await,
            Err(e) => Err(e.into()),
            Ok(_) => Ok(()),
        };
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("Scan your tag to stop the alarm...");

        let Some(outcome) = with_stdin_tag(session.scan(), &feed, &mut lines).await? else {
            session.abandon().await;
            println!("No more tags, alarm left unacknowledged");
            return Ok(());
        };

        match outcome {
            Ok(ScanOutcome::Dismissed(log)) => {
                println!("Good morning! Dismissed at {}", log.wake_time);
                return Ok(());
            }
            Ok(ScanOutcome::Rejected(validation)) => {
                println!("Wrong tag ({}), try again", validation.reason);
            }
            Err(AppError::ScanTimeout) => println!("No tag detected, try again"),
            Err(AppError::HardwareUnavailable) => return dismiss_manually(&session).await,
            Err(e) => return Err(e.into()),
        }
    }
}

async fn dismiss_manually(session: &RingingSession) -> Result<()> {
    println!("NFC is not available on this device");
    let log = session.bypass().await?;
    println!("Alarm dismissed manually at {}", log.wake_time);
    Ok(())
}

async fn run(state: &AppState) -> Result<()> {
    let mut events = state.scheduler.subscribe();
    let rearm = state.scheduler.spawn_rearm();

    state
        .scheduler
        .start()
        .await
        .context("Failed to start alarm scheduler")?;
    let armed = state.alarms.schedule_all().await?;
    println!("{} alarms scheduled, waiting (Ctrl+C to stop)", armed);

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(AlarmEvent::Ringing { alarm, occurrence, .. }) => {
                    println!(
                        "{} is ringing ({}); stop it with: nuveen ring {}",
                        alarm.display_name(),
                        occurrence,
                        alarm.id
                    );
                }
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!("Missed {} ring events", missed);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = &mut shutdown => break,
        }
    }

    rearm.abort();
    state
        .scheduler
        .shutdown()
        .await
        .context("Failed to stop alarm scheduler")?;

    info!("Shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
