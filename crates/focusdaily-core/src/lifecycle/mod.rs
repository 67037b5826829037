//! Session lifecycle: the controller state machine and its countdown.

mod clock;
mod controller;

pub use controller::{ControllerSnapshot, SessionController};
