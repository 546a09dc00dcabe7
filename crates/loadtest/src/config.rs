use std::time::Duration;

/// Errors raised while reading the harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("LOADTEST_MIN_WAIT_MS ({min}) exceeds LOADTEST_MAX_WAIT_MS ({max})")]
    WaitRange { min: u64, max: u64 },

    #[error("LOADTEST_USERS must be at least 1")]
    NoUsers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTestConfig {
    /// URL every simulated user requests.
    pub host: String,
    pub min_wait: Duration,
    pub max_wait: Duration,
    pub users: usize,
    /// Total wall-clock duration of the run.
    pub run_for: Duration,
}

impl LoadTestConfig {
    /// Build from a key lookup (normally `std::env::var`).
    ///
    /// | Key                     | Default                    |
    /// |-------------------------|----------------------------|
    /// | `LOADTEST_HOST`         | `https://127.0.0.1:5000/`  |
    /// | `LOADTEST_MIN_WAIT_MS`  | `5000`                     |
    /// | `LOADTEST_MAX_WAIT_MS`  | `15000`                    |
    /// | `LOADTEST_USERS`        | `1`                        |
    /// | `LOADTEST_RUN_SECS`     | `60`                       |
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let number = |key: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(key) {
                None => Ok(default),
                Some(value) => value
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidNumber { key, value }),
            }
        };

        let min = number("LOADTEST_MIN_WAIT_MS", 5000)?;
        let max = number("LOADTEST_MAX_WAIT_MS", 15000)?;
        if min > max {
            return Err(ConfigError::WaitRange { min, max });
        }
        let users = number("LOADTEST_USERS", 1)? as usize;
        if users == 0 {
            return Err(ConfigError::NoUsers);
        }

        Ok(Self {
            host: lookup("LOADTEST_HOST").unwrap_or_else(|| "https://127.0.0.1:5000/".into()),
            min_wait: Duration::from_millis(min),
            max_wait: Duration::from_millis(max),
            users,
            run_for: Duration::from_secs(number("LOADTEST_RUN_SECS", 60)?),
        })
    }
}
