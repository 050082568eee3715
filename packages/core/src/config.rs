use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Tunable behavior loaded from environment variables.
///
/// Store credentials are owned by the app shell; nothing here is secret.
#[derive(Debug, Clone)]
pub struct Config {
    /// Lifetime of a "change the creator?" poll, in seconds.
    pub poll_duration_secs: i64,
    /// Lifetime of a creator election, in seconds.
    pub election_duration_secs: i64,
    /// Attempts for the optimistic balance update before giving up with Conflict.
    pub ledger_cas_retries: u32,
    /// Cron expression for the poll expiry sweep.
    pub expiry_sweep_schedule: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_duration_secs: 3 * 60 * 60,
            election_duration_secs: 4 * 60 * 60,
            ledger_cas_retries: 4,
            expiry_sweep_schedule: "0 * * * * *".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let mut config = Self::default();

        if let Ok(value) = env::var("AURA_POLL_DURATION_SECS") {
            config.poll_duration_secs = value
                .parse()
                .context("AURA_POLL_DURATION_SECS must be a number of seconds")?;
        }
        if let Ok(value) = env::var("AURA_ELECTION_DURATION_SECS") {
            config.election_duration_secs = value
                .parse()
                .context("AURA_ELECTION_DURATION_SECS must be a number of seconds")?;
        }
        if let Ok(value) = env::var("AURA_LEDGER_CAS_RETRIES") {
            config.ledger_cas_retries = value
                .parse()
                .context("AURA_LEDGER_CAS_RETRIES must be a number")?;
        }
        if let Ok(value) = env::var("AURA_EXPIRY_SWEEP_SCHEDULE") {
            config.expiry_sweep_schedule = value;
        }

        Ok(config)
    }
}
