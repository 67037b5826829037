//! Countdown tick task handle.

use std::sync::Mutex;

use tokio::task::JoinHandle;

/// Owner of the repeating one-second tick task.
///
/// At most one task is armed at a time; arming replaces and aborts any
/// previous task. Disarming is synchronous and idempotent, so both a
/// user action and an expiring tick can disarm without coordinating.
#[derive(Default)]
pub struct CountdownClock {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CountdownClock {
    /// Install a new tick task, aborting any previous one.
    pub fn arm(&self, task: JoinHandle<()>) {
        let mut slot = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = slot.replace(task) {
            old.abort();
        }
    }

    /// Abort the tick task if one is armed. No-op when disarmed.
    pub fn disarm(&self) {
        let mut slot = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(task) = slot.take() {
            task.abort();
        }
    }

    #[cfg(test)]
    pub fn is_armed(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}
