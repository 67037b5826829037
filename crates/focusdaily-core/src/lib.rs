//! # Focus Daily Core Library
//!
//! This library provides the core business logic for the Focus Daily
//! session timer. It implements a CLI-first philosophy where all
//! operations are available via a standalone CLI binary, with any GUI
//! being a thin layer over the same core library.
//!
//! ## Architecture
//!
//! - **Lifecycle**: A mutex-guarded state machine driving one session at
//!   a time through Idle, Running, Paused, and completion, with a
//!   Tokio-owned one-second countdown task
//! - **Storage**: SQLite-based session storage and TOML-based settings
//! - **Notify**: Trait seam for end-of-session notification and audio
//!   cue sinks
//!
//! ## Key Components
//!
//! - [`SessionController`]: Lifecycle state machine and countdown owner
//! - [`SessionStore`]: Session persistence and per-day aggregates
//! - [`Settings`]: User-tunable durations and notification switches
//! - [`Notifier`]: Trait for notification sinks

pub mod error;
pub mod lifecycle;
pub mod notify;
pub mod session;
pub mod storage;

pub use error::{CoreError, Result, SettingsError, StorageError, ValidationError};
pub use lifecycle::{ControllerSnapshot, SessionController};
pub use notify::{AudioCue, Notifier, NullNotifier};
pub use session::{DailyAggregate, Session, SessionStatus, SessionType};
pub use storage::{SessionStore, Settings, DEFAULT_RECENT_LIMIT};
