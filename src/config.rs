//! Environment-sourced configuration. Every field falls back to a
//! documented default on a missing or unparsable variable — nothing here
//! ever aborts startup.

use std::time::Duration;

use tracing::warn;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_WORKER_COUNT: usize = 10;
const DEFAULT_QUEUE_CAPACITY: usize = 100;
const DEFAULT_SWEEPER_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub worker_count: usize,
    pub queue_capacity: usize,
    pub sweeper_interval: Duration,
}

impl Config {
    /// Loads configuration from the process environment. `.env` is loaded
    /// best-effort beforehand by the caller; this function itself never
    /// fails.
    pub fn from_env() -> Self {
        Self {
            port: parse_env("PORT", DEFAULT_PORT),
            worker_count: parse_env("WORKER_COUNT", DEFAULT_WORKER_COUNT),
            queue_capacity: parse_env("JOB_QUEUE_CAPACITY", DEFAULT_QUEUE_CAPACITY),
            sweeper_interval: parse_duration_env("SWEEPER_INTERVAL", DEFAULT_SWEEPER_INTERVAL),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, %raw, "invalid value, falling back to default");
            default
        }),
        Err(_) => default,
    }
}

/// Accepts a plain integer (seconds) or a `<number><unit>` suffix where
/// unit is `s` or `ms` — the only two forms the worked examples use.
fn parse_duration_env(key: &str, default: Duration) -> Duration {
    let Ok(raw) = std::env::var(key) else {
        return default;
    };

    let parsed = if let Some(ms) = raw.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = raw.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else {
        raw.trim().parse::<u64>().ok().map(Duration::from_secs)
    };

    parsed.unwrap_or_else(|| {
        warn!(key, %raw, "invalid duration, falling back to default");
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_seconds_suffix() {
        assert_eq!(parse_duration_env("__NOT_SET_A__", Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn parse_env_falls_back_on_garbage() {
        std::env::set_var("JOBQUEUE_TEST_PORT", "not-a-number");
        let value: u16 = parse_env("JOBQUEUE_TEST_PORT", 8080);
        assert_eq!(value, 8080);
        std::env::remove_var("JOBQUEUE_TEST_PORT");
    }

    #[test]
    fn duration_parses_ms_and_s_suffixes() {
        std::env::set_var("JOBQUEUE_TEST_INTERVAL", "500ms");
        assert_eq!(
            parse_duration_env("JOBQUEUE_TEST_INTERVAL", Duration::from_secs(10)),
            Duration::from_millis(500)
        );
        std::env::set_var("JOBQUEUE_TEST_INTERVAL", "7s");
        assert_eq!(
            parse_duration_env("JOBQUEUE_TEST_INTERVAL", Duration::from_secs(10)),
            Duration::from_secs(7)
        );
        std::env::remove_var("JOBQUEUE_TEST_INTERVAL");
    }
}
