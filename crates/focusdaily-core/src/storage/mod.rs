mod settings;
pub mod store;

pub use settings::Settings;
pub use store::{SessionStore, DEFAULT_RECENT_LIMIT};

use std::path::PathBuf;

/// Returns the data directory, `~/.config/focusdaily[-dev]/` based on
/// FOCUSDAILY_ENV.
///
/// Set FOCUSDAILY_ENV=dev to use the development data directory, or
/// FOCUSDAILY_DATA_DIR to point at an explicit directory (tests use this
/// to stay hermetic).
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let dir = match std::env::var("FOCUSDAILY_DATA_DIR") {
        Ok(explicit) if !explicit.is_empty() => PathBuf::from(explicit),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env =
                std::env::var("FOCUSDAILY_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("focusdaily-dev")
            } else {
                base_dir.join("focusdaily")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
