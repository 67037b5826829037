use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use focusdaily_core::{
    AudioCue, DailyAggregate, Notifier, Session, SessionController, SessionStatus, SessionStore,
    SessionType, Settings, DEFAULT_RECENT_LIMIT,
};
use serde::Serialize;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Run a focus session to completion
    Focus {
        /// Override the configured length in minutes
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Run a long break to completion
    LongBreak {
        /// Override the configured length in minutes
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Run a micro break to completion
    MicroBreak {
        /// Override the configured length in seconds
        #[arg(long)]
        seconds: Option<u32>,
    },
    /// Print the controller state as JSON
    Status,
    /// Print stored sessions as JSON, newest first
    List {
        /// Maximum number of sessions
        #[arg(long, default_value_t = DEFAULT_RECENT_LIMIT)]
        limit: usize,
    },
    /// Delete a stored session by id
    Delete {
        /// Session id
        id: String,
    },
}

/// Completion report printed after a session runs to the end.
#[derive(Serialize)]
struct SessionOutcome {
    completed: Session,
    today: DailyAggregate,
}

/// Notification sink that prints to stderr and rings the terminal bell
/// in place of a real audio backend.
struct TerminalNotifier {
    enabled: bool,
    sound: bool,
}

impl Notifier for TerminalNotifier {
    fn session_started(&self, session_type: SessionType) -> Result<(), Box<dyn std::error::Error>> {
        if !self.enabled {
            return Ok(());
        }
        eprintln!("{} started", session_type.label());
        if self.sound {
            ring(AudioCue::for_session_start(session_type));
        }
        Ok(())
    }

    fn session_completed(&self, session: &Session) -> Result<(), Box<dyn std::error::Error>> {
        if !self.enabled {
            return Ok(());
        }
        eprintln!("\n{} complete", session.session_type.label());
        if self.sound {
            ring(AudioCue::for_session_end(session.session_type));
        }
        Ok(())
    }
}

fn ring(cue: Option<AudioCue>) {
    if let Some(cue) = cue {
        tracing::debug!("audio cue: {}", cue.as_str());
        eprint!("\x07");
        let _ = std::io::stderr().flush();
    }
}

fn build_controller() -> Result<SessionController, Box<dyn std::error::Error>> {
    let settings = Settings::load_or_default();
    let store = SessionStore::open()?;
    let notifier = Arc::new(TerminalNotifier {
        enabled: settings.notifications.enabled,
        sound: settings.notifications.sound,
    });
    Ok(SessionController::with_notifier(store, settings, notifier))
}

/// Sample the controller once a second until the session leaves
/// `Running`, printing a progress line and the occasional micro-break
/// nudge during focus.
async fn drive(
    controller: &SessionController,
    session_type: SessionType,
) -> Result<Session, Box<dyn std::error::Error>> {
    let settings = controller.settings();
    let mut rng = rand::thread_rng();
    let mut next_nudge = settings.micro_break_gap_secs(&mut rng);
    let mut elapsed: u64 = 0;

    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        elapsed += 1;

        let snapshot = controller.snapshot();
        if snapshot.status != SessionStatus::Running {
            break;
        }
        if snapshot.remaining_seconds == 0 {
            // Completion failed at expiry; the error is already recorded.
            let message = snapshot
                .last_error
                .unwrap_or_else(|| "completion failed".to_string());
            return Err(message.into());
        }

        eprint!(
            "\r{} {} {:>3}%",
            snapshot.session_label.unwrap_or(""),
            snapshot.remaining_display,
            snapshot.progress_percent
        );
        let _ = std::io::stderr().flush();

        if session_type == SessionType::Focus
            && settings.notifications.enabled
            && elapsed >= next_nudge
        {
            eprintln!("\ntime for a micro break");
            next_nudge = elapsed + settings.micro_break_gap_secs(&mut rng);
        }
    }

    controller
        .history()
        .first()
        .cloned()
        .ok_or_else(|| "session ended without a completion record".into())
}

async fn run_to_completion(
    controller: &SessionController,
    session_type: SessionType,
    seconds: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.start(session_type, seconds)?;

    let completed = tokio::select! {
        result = drive(controller, session_type) => result?,
        _ = tokio::signal::ctrl_c() => {
            controller.stop()?;
            eprintln!();
            return Err("session abandoned".into());
        }
    };

    let outcome = SessionOutcome {
        completed,
        today: controller.today(),
    };
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

pub async fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SessionAction::Focus { minutes } => {
            let controller = build_controller()?;
            let settings = controller.settings();
            let seconds = minutes.map(|m| m * 60).unwrap_or_else(|| settings.focus_seconds());
            run_to_completion(&controller, SessionType::Focus, seconds).await?;
            if settings.auto_start {
                eprintln!("auto-starting long break");
                let seconds = settings.long_break_seconds();
                run_to_completion(&controller, SessionType::LongBreak, seconds).await?;
            }
        }
        SessionAction::LongBreak { minutes } => {
            let controller = build_controller()?;
            let seconds = minutes
                .map(|m| m * 60)
                .unwrap_or_else(|| controller.settings().long_break_seconds());
            run_to_completion(&controller, SessionType::LongBreak, seconds).await?;
        }
        SessionAction::MicroBreak { seconds } => {
            let controller = build_controller()?;
            let seconds = seconds.unwrap_or_else(|| controller.settings().micro_break_seconds());
            run_to_completion(&controller, SessionType::MicroBreak, seconds).await?;
        }
        SessionAction::Status => {
            let controller = build_controller()?;
            controller.load_history()?;
            controller.refresh_today()?;
            println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
        }
        SessionAction::List { limit } => {
            let store = SessionStore::open()?;
            let sessions = store.recent_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        SessionAction::Delete { id } => {
            let store = SessionStore::open()?;
            store.delete_session(&id)?;
            println!("deleted {id}");
        }
    }
    Ok(())
}
