//! Session lifecycle state machine.
//!
//! [`SessionController`] owns the single current session, the countdown,
//! and the rules for starting, pausing, resuming, completing, and
//! abandoning it. All lifecycle state sits behind one mutex; the
//! per-second tick and every explicit transition run under it, so a tick
//! can never interleave with a command and `mark_completed` fires exactly
//! once per session however the completion was triggered.
//!
//! ## State transitions
//!
//! ```text
//! Idle -> Running <-> Paused
//!          |    \       |
//!          |     \      v
//!          |     complete() / expiry -> (Completed) -> Idle
//!          v
//!        stop() -> Idle   (record left incomplete)
//! ```
//!
//! Storage success gates every in-memory transition: a failed write
//! leaves the machine in its pre-call state so the caller can retry.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::Local;
use serde::Serialize;

use crate::error::{Result, ValidationError};
use crate::notify::{Notifier, NullNotifier};
use crate::session::{
    format_mm_ss, progress_percent, DailyAggregate, Session, SessionStatus, SessionType,
};
use crate::storage::{SessionStore, Settings, DEFAULT_RECENT_LIMIT};

use super::clock::CountdownClock;

/// Sessions kept in the in-memory history view.
const HISTORY_LIMIT: usize = DEFAULT_RECENT_LIMIT;

struct Inner {
    store: SessionStore,
    settings: Settings,
    status: SessionStatus,
    current: Option<Session>,
    remaining_seconds: u32,
    history: Vec<Session>,
    today: DailyAggregate,
    last_error: Option<String>,
    /// Bumped whenever the clock is armed or disarmed. A tick task whose
    /// epoch no longer matches must not consume a tick.
    clock_epoch: u64,
}

impl Inner {
    /// Record a collaborator failure in the last-error observable.
    /// Validation errors never pass through here.
    fn note<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        result
    }
}

/// Full state snapshot with derived display values.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerSnapshot {
    pub status: SessionStatus,
    pub current: Option<Session>,
    pub session_label: Option<&'static str>,
    pub remaining_seconds: u32,
    pub remaining_display: String,
    pub progress_percent: u8,
    pub history: Vec<Session>,
    pub today: DailyAggregate,
    pub loading: bool,
    pub last_error: Option<String>,
}

/// Lifecycle controller over a session store.
///
/// Cheap to clone; clones share the same state. Methods that arm the
/// countdown (`start`, the preset starters, `resume`) must be called
/// from within a Tokio runtime.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Mutex<Inner>>,
    clock: Arc<CountdownClock>,
    notifier: Arc<dyn Notifier>,
    loading: Arc<AtomicBool>,
}

impl SessionController {
    /// Build a controller over the given store and settings with no
    /// notification sink.
    pub fn new(store: SessionStore, settings: Settings) -> Self {
        Self::with_notifier(store, settings, Arc::new(NullNotifier))
    }

    pub fn with_notifier(
        store: SessionStore,
        settings: Settings,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                store,
                settings,
                status: SessionStatus::Idle,
                current: None,
                remaining_seconds: 0,
                history: Vec::new(),
                today: DailyAggregate::default(),
                last_error: None,
                clock_epoch: 0,
            })),
            clock: Arc::new(CountdownClock::default()),
            notifier,
            loading: Arc::new(AtomicBool::new(false)),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> SessionStatus {
        self.lock().status
    }

    pub fn current_session(&self) -> Option<Session> {
        self.lock().current.clone()
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.lock().remaining_seconds
    }

    pub fn history(&self) -> Vec<Session> {
        self.lock().history.clone()
    }

    pub fn today(&self) -> DailyAggregate {
        self.lock().today
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    pub fn settings(&self) -> Settings {
        self.lock().settings.clone()
    }

    /// Build a full state snapshot.
    pub fn snapshot(&self) -> ControllerSnapshot {
        let inner = self.lock();
        let planned = inner
            .current
            .as_ref()
            .map(|s| s.planned_seconds)
            .unwrap_or(0);
        ControllerSnapshot {
            status: inner.status,
            current: inner.current.clone(),
            session_label: inner.current.as_ref().map(|s| s.session_type.label()),
            remaining_seconds: inner.remaining_seconds,
            remaining_display: format_mm_ss(inner.remaining_seconds),
            progress_percent: progress_percent(planned, inner.remaining_seconds),
            history: inner.history.clone(),
            today: inner.today,
            loading: self.is_loading(),
            last_error: inner.last_error.clone(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a session of the given type.
    ///
    /// Legal only from `Idle`. The record is created in storage first;
    /// in-memory state changes only after the write succeeds, then the
    /// countdown is armed.
    pub fn start(&self, session_type: SessionType, planned_seconds: u32) -> Result<Session> {
        let mut inner = self.lock();
        if let Some(current) = &inner.current {
            return Err(ValidationError::SessionAlreadyActive {
                id: current.id.clone(),
            }
            .into());
        }
        if inner.status != SessionStatus::Idle {
            return Err(ValidationError::IllegalTransition {
                action: "start",
                status: inner.status,
            }
            .into());
        }
        if planned_seconds == 0 {
            return Err(ValidationError::InvalidDuration {
                seconds: planned_seconds,
            }
            .into());
        }
        inner.last_error = None;

        let _busy = self.busy();
        let created = inner.store.create_session(session_type, planned_seconds);
        let session = inner.note(created)?;

        inner.status = SessionStatus::Running;
        inner.current = Some(session.clone());
        inner.remaining_seconds = planned_seconds;
        inner.clock_epoch += 1;
        self.arm_clock(inner.clock_epoch);

        if let Err(e) = self.notifier.session_started(session_type) {
            tracing::warn!("start notification failed: {e}");
        }
        Ok(session)
    }

    /// Start a focus session with the configured default length.
    pub fn start_focus(&self) -> Result<Session> {
        let seconds = self.lock().settings.focus_seconds();
        self.start(SessionType::Focus, seconds)
    }

    /// Start a long break with the configured default length.
    pub fn start_long_break(&self) -> Result<Session> {
        let seconds = self.lock().settings.long_break_seconds();
        self.start(SessionType::LongBreak, seconds)
    }

    /// Start a micro break with the configured default length.
    pub fn start_micro_break(&self) -> Result<Session> {
        let seconds = self.lock().settings.micro_break_seconds();
        self.start(SessionType::MicroBreak, seconds)
    }

    /// Freeze the countdown. Legal only from `Running`.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.status != SessionStatus::Running {
            return Err(ValidationError::IllegalTransition {
                action: "pause",
                status: inner.status,
            }
            .into());
        }
        inner.clock_epoch += 1;
        self.clock.disarm();
        inner.status = SessionStatus::Paused;
        Ok(())
    }

    /// Re-arm the countdown from the current remaining seconds. Legal
    /// only from `Paused`.
    pub fn resume(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.status != SessionStatus::Paused {
            return Err(ValidationError::IllegalTransition {
                action: "resume",
                status: inner.status,
            }
            .into());
        }
        inner.status = SessionStatus::Running;
        inner.clock_epoch += 1;
        self.arm_clock(inner.clock_epoch);
        Ok(())
    }

    /// Complete the current session. Legal from `Running` or `Paused`.
    ///
    /// The countdown is disarmed before the storage write. On failure
    /// the machine keeps its pre-call status and current session so the
    /// same transition can be retried; the countdown stays disarmed.
    pub fn complete(&self) -> Result<Session> {
        let mut inner = self.lock();
        inner.clock_epoch += 1;
        self.clock.disarm();
        self.complete_locked(&mut inner)
    }

    /// Abandon the current session. Legal from any non-`Idle` state.
    ///
    /// The stored record is left incomplete: abandoned time stays
    /// visible in history but never counts toward focus totals.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.status == SessionStatus::Idle {
            return Err(ValidationError::IllegalTransition {
                action: "stop",
                status: inner.status,
            }
            .into());
        }
        inner.clock_epoch += 1;
        self.clock.disarm();
        inner.status = SessionStatus::Idle;
        inner.current = None;
        inner.remaining_seconds = 0;
        Ok(())
    }

    /// Delete a stored session and refresh history and today's
    /// aggregate. The active session cannot be deleted.
    pub fn delete_session(&self, id: &str) -> Result<()> {
        let mut inner = self.lock();
        if let Some(current) = &inner.current {
            if current.id == id {
                return Err(ValidationError::ActiveSessionDelete { id: id.to_string() }.into());
            }
        }
        inner.last_error = None;

        let _busy = self.busy();
        let deleted = inner.store.delete_session(id);
        inner.note(deleted)?;
        let reloaded = inner.store.recent_sessions(HISTORY_LIMIT);
        inner.history = inner.note(reloaded)?;
        let refreshed = self.refresh_today_locked(&mut inner);
        inner.note(refreshed)?;
        Ok(())
    }

    /// Reload the bounded in-memory history from storage, newest first.
    pub fn load_history(&self) -> Result<Vec<Session>> {
        let mut inner = self.lock();
        inner.last_error = None;

        let _busy = self.busy();
        let loaded = inner.store.recent_sessions(HISTORY_LIMIT);
        let sessions = inner.note(loaded)?;
        inner.history = sessions.clone();
        Ok(sessions)
    }

    /// Recompute today's aggregate from storage and cache it.
    pub fn refresh_today(&self) -> Result<DailyAggregate> {
        let mut inner = self.lock();
        inner.last_error = None;

        let _busy = self.busy();
        let refreshed = self.refresh_today_locked(&mut inner);
        inner.note(refreshed)?;
        Ok(inner.today)
    }

    /// Replace the settings consulted by the preset starters. The
    /// controller never writes settings back.
    pub fn update_settings(&self, settings: Settings) {
        self.lock().settings = settings;
    }

    /// Clear the last-error observable.
    pub fn clear_error(&self) {
        self.lock().last_error = None;
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn busy(&self) -> LoadingGuard<'_> {
        self.loading.store(true, Ordering::SeqCst);
        LoadingGuard(&self.loading)
    }

    /// Spawn the repeating one-second tick task for the given epoch.
    /// Callers hold the state lock, which serializes arming against any
    /// in-flight tick.
    fn arm_clock(&self, epoch: u64) {
        let controller = self.clone();
        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            // A fresh interval yields immediately; consume that tick so
            // the first decrement lands a full second after arming.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !controller.tick_once(epoch) {
                    break;
                }
            }
        });
        self.clock.arm(task);
    }

    /// One countdown step. Returns false when the tick task must stop.
    fn tick_once(&self, epoch: u64) -> bool {
        let mut inner = self.lock();
        if inner.clock_epoch != epoch {
            // A task from a superseded arm must not consume a tick.
            return false;
        }
        if inner.status != SessionStatus::Running {
            return false;
        }
        inner.remaining_seconds = inner.remaining_seconds.saturating_sub(1);
        if inner.remaining_seconds > 0 {
            return true;
        }
        // Expiry funnels through the same transition as an explicit
        // complete(), so mark_completed still fires exactly once.
        inner.clock_epoch += 1;
        self.clock.disarm();
        if let Err(e) = self.complete_locked(&mut inner) {
            tracing::warn!("automatic completion at expiry failed: {e}");
        }
        false
    }

    /// The completion transition, shared by `complete()` and clock
    /// expiry. Runs with the state lock held and the countdown already
    /// disarmed.
    fn complete_locked(&self, inner: &mut Inner) -> Result<Session> {
        let current_id = match &inner.current {
            Some(session) => session.id.clone(),
            None => {
                return Err(ValidationError::IllegalTransition {
                    action: "complete",
                    status: inner.status,
                }
                .into())
            }
        };
        inner.last_error = None;

        let _busy = self.busy();
        let marked = inner.store.mark_completed(&current_id);
        let completed = inner.note(marked)?;

        // Completed is transient; the machine rests at Idle.
        inner.status = SessionStatus::Idle;
        inner.current = None;
        inner.remaining_seconds = 0;
        push_history(&mut inner.history, completed.clone());

        let refreshed = self.refresh_today_locked(inner);
        if let Err(e) = inner.note(refreshed) {
            tracing::warn!("today aggregate refresh failed after completion: {e}");
        }
        if let Err(e) = self.notifier.session_completed(&completed) {
            tracing::warn!("completion notification failed: {e}");
        }
        Ok(completed)
    }

    fn refresh_today_locked(&self, inner: &mut Inner) -> Result<()> {
        inner.today = inner.store.daily_aggregate(Local::now().date_naive())?;
        Ok(())
    }
}

struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

fn push_history(history: &mut Vec<Session>, session: Session) {
    history.insert(0, session);
    history.truncate(HISTORY_LIMIT);
}
