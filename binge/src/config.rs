use serde::{Deserialize, Serialize};
use tracing::warn;

/// Service tunables. Defaults match the shipped player behavior: controls
/// hide after 5 s, the discrete seek buttons step 10 s, and the player is
/// asked for a status tick every 500 ms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hide_delay_ms: u64,
    pub seek_step_ms: u64,
    pub progress_interval_ms: u64,
    /// Transport headers passed through opaquely to every load
    /// (referer, user-agent, ...).
    pub headers: Vec<(String, String)>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            hide_delay_ms: 5_000,
            seek_step_ms: 10_000,
            progress_interval_ms: 500,
            headers: Vec::new(),
        }
    }
}

impl ServiceConfig {
    /// Defaults overridden by `BINGE_*` environment variables where present.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = env_u64("BINGE_HIDE_DELAY_MS") {
            config.hide_delay_ms = value;
        }
        if let Some(value) = env_u64("BINGE_SEEK_STEP_MS") {
            config.seek_step_ms = value;
        }
        if let Some(value) = env_u64("BINGE_PROGRESS_INTERVAL_MS") {
            config.progress_interval_ms = value;
        }
        if let Ok(referer) = std::env::var("BINGE_REFERER") {
            config.headers.push(("referer".to_string(), referer));
        }
        if let Ok(user_agent) = std::env::var("BINGE_USER_AGENT") {
            config.headers.push(("user-agent".to_string(), user_agent));
        }
        config
    }
}

fn env_u64(name: &str) -> Option<u64> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {name}={raw}: not a number of milliseconds");
            None
        }
    }
}
