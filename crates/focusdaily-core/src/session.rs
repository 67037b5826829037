//! Session domain model.
//!
//! A [`Session`] is one timed interval of focus or break activity,
//! persisted as a record. [`SessionStatus`] is the in-memory lifecycle
//! state attached to at most one current session; it is never persisted,
//! so a process restart leaves the stored record behind as an incomplete
//! session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of session being timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionType {
    Focus,
    LongBreak,
    MicroBreak,
}

impl SessionType {
    /// Stable string form used in storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionType::Focus => "Focus",
            SessionType::LongBreak => "LongBreak",
            SessionType::MicroBreak => "MicroBreak",
        }
    }

    /// Parse the stored string form. Unknown values fall back to `Focus`.
    pub fn parse(s: &str) -> SessionType {
        match s {
            "LongBreak" => SessionType::LongBreak,
            "MicroBreak" => SessionType::MicroBreak,
            _ => SessionType::Focus,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SessionType::Focus => "Focus",
            SessionType::LongBreak => "Long break",
            SessionType::MicroBreak => "Micro break",
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, SessionType::LongBreak | SessionType::MicroBreak)
    }
}

/// In-memory lifecycle state of the controller.
///
/// `Completed` is transient: a successful completion passes through it
/// and the machine rests at `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    Idle,
    Running,
    Paused,
    Completed,
}

/// One timed interval, as persisted.
///
/// `end_time` is present if and only if `completed` is true.
/// `planned_seconds` is the target length fixed at creation, not the
/// elapsed length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub session_type: SessionType,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub planned_seconds: u32,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Derived per-day summary. Recomputed from storage on demand, never
/// persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAggregate {
    /// Focus sessions created on the day, completed or not.
    pub focus_count: u32,
    /// Long- and micro-break sessions created on the day.
    pub break_count: u32,
    /// Planned seconds of the day's completed focus sessions.
    pub total_focus_seconds: u64,
}

/// Format a second count as zero-padded `MM:SS`.
///
/// Minutes widen past two digits rather than wrapping.
pub fn format_mm_ss(seconds: u32) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Elapsed share of a session as a whole percentage, clamped to 0..=100.
pub fn progress_percent(planned_seconds: u32, remaining_seconds: u32) -> u8 {
    if planned_seconds == 0 {
        return 0;
    }
    let elapsed = planned_seconds.saturating_sub(remaining_seconds) as f64;
    let pct = (elapsed / planned_seconds as f64 * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}
