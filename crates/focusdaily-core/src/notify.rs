//! Notification hooks for lifecycle transitions.
//!
//! The controller reports session milestones through [`Notifier`] after
//! the transition has committed; implementations decide how to surface
//! them. Notifier failures are logged by the controller and never fail
//! or roll back the transition that triggered them.

use crate::session::{Session, SessionType};

/// Audio cue attached to a lifecycle transition.
///
/// Micro-breaks have a start cue only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioCue {
    FocusStart,
    FocusEnd,
    LongBreakStart,
    LongBreakEnd,
    MicroBreakStart,
}

impl AudioCue {
    /// Stable string form, matching the stored audio configuration keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            AudioCue::FocusStart => "FocusStart",
            AudioCue::FocusEnd => "FocusEnd",
            AudioCue::LongBreakStart => "LongBreakStart",
            AudioCue::LongBreakEnd => "LongBreakEnd",
            AudioCue::MicroBreakStart => "MicroBreakStart",
        }
    }

    /// Cue for the start of a session of the given type.
    pub fn for_session_start(session_type: SessionType) -> Option<AudioCue> {
        match session_type {
            SessionType::Focus => Some(AudioCue::FocusStart),
            SessionType::LongBreak => Some(AudioCue::LongBreakStart),
            SessionType::MicroBreak => Some(AudioCue::MicroBreakStart),
        }
    }

    /// Cue for the completion of a session of the given type.
    pub fn for_session_end(session_type: SessionType) -> Option<AudioCue> {
        match session_type {
            SessionType::Focus => Some(AudioCue::FocusEnd),
            SessionType::LongBreak => Some(AudioCue::LongBreakEnd),
            SessionType::MicroBreak => None,
        }
    }
}

/// Receiver for session lifecycle notifications.
///
/// All methods are fire-and-forget from the controller's point of view
/// and default to no-ops, so implementations override only what they
/// surface.
pub trait Notifier: Send + Sync {
    /// Called when a session starts.
    fn session_started(
        &self,
        _session_type: SessionType,
    ) -> Result<(), Box<dyn std::error::Error>> {
        Ok(()) // default no-op
    }

    /// Called when a session completes.
    fn session_completed(&self, _session: &Session) -> Result<(), Box<dyn std::error::Error>> {
        Ok(()) // default no-op
    }
}

/// Notifier that drops every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {}
