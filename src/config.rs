//! Bridge configuration
//!
//! `mcpgate` takes exactly one required input, the upstream URL (spec §6);
//! everything else is a compiled-in default that can be nudged via
//! environment variables. This is intentionally much smaller than a
//! general-purpose agent config layer: there is no config file, no
//! per-provider section, nothing to validate beyond parsing the URL.

use std::time::Duration;

use url::Url;

/// Immutable bridge configuration, created once from argv + env at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// The upstream SSE URL, `U` in spec §3.
    pub url: Url,
    /// Base reconnect delay `D₀`. Default 1000 ms.
    pub base_delay: Duration,
    /// Reconnect delay cap. Default 10 000 ms.
    pub max_delay: Duration,
    /// Max consecutive reconnect attempts `M` before entering RECOVERY.
    /// Default 5.
    pub max_reconnect_attempts: u32,
    /// Recovery interval `R` after which a new inbound frame re-arms a
    /// connect attempt from RECOVERY. Default 30 000 ms.
    pub recovery_interval: Duration,
    /// Debug logging is always enabled per spec §4.1; this flag is kept so
    /// callers have a single place to check it, though `RUST_LOG` is the
    /// actual filter knob.
    pub debug: bool,
}

impl Config {
    /// Build a `Config` for `url`, applying the `MCPGATE_*` environment
    /// overlay documented in `SPEC_FULL.md` §A.3. Malformed env values are
    /// logged and ignored; only the URL argument itself is fatal (spec §6).
    pub fn from_env(url: Url) -> Self {
        let mut config = Self {
            url,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            max_reconnect_attempts: 5,
            recovery_interval: Duration::from_millis(30_000),
            debug: true,
        };

        if let Some(ms) = read_env_millis("MCPGATE_BASE_DELAY_MS") {
            config.base_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env_millis("MCPGATE_MAX_DELAY_MS") {
            config.max_delay = Duration::from_millis(ms);
        }
        if let Some(n) = read_env_u32("MCPGATE_MAX_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts = n;
        }
        if let Some(ms) = read_env_millis("MCPGATE_RECOVERY_INTERVAL_MS") {
            config.recovery_interval = Duration::from_millis(ms);
        }

        config
    }
}

fn read_env_millis(name: &str) -> Option<u64> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u64>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(target: "mcpgate", "[mcpgate] ignoring malformed {name}={raw}");
                None
            }
        },
        Err(_) => None,
    }
}

fn read_env_u32(name: &str) -> Option<u32> {
    match std::env::var(name) {
        Ok(raw) => match raw.parse::<u32>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(target: "mcpgate", "[mcpgate] ignoring malformed {name}={raw}");
                None
            }
        },
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = Config::from_env(Url::parse("http://localhost:3000/sse").unwrap());
        assert_eq!(cfg.base_delay, Duration::from_millis(1000));
        assert_eq!(cfg.max_delay, Duration::from_millis(10_000));
        assert_eq!(cfg.max_reconnect_attempts, 5);
        assert_eq!(cfg.recovery_interval, Duration::from_millis(30_000));
    }
}
