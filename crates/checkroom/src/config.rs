//! Server configuration.

use std::time::Duration;

use checkroom_session::ReconnectMode;

use crate::CheckroomError;

/// Everything the server can be tuned with.
///
/// Defaults match a public deployment: sessions are reaped after a day
/// of silence, the reaper looks once an hour, and reconnection accepts a
/// previous connection id as proof of identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,

    /// How long a session may go without activity before it is evicted.
    pub idle_threshold: Duration,

    /// Time between reaper sweeps. `None` turns the reaper off.
    pub sweep_interval: Option<Duration>,

    pub reconnect_mode: ReconnectMode,

    /// A connection that sends nothing for this long is dropped.
    pub connection_timeout: Duration,

    /// Capacity of the dispatch command queue.
    pub channel_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            idle_threshold: Duration::from_secs(24 * 60 * 60),
            sweep_interval: Some(Duration::from_secs(60 * 60)),
            reconnect_mode: ReconnectMode::Lenient,
            connection_timeout: Duration::from_secs(60),
            channel_size: 256,
        }
    }
}

impl ServerConfig {
    pub const ENV_BIND: &'static str = "CHECKROOM_BIND";
    pub const ENV_IDLE_SECS: &'static str = "CHECKROOM_IDLE_SECS";
    pub const ENV_SWEEP_SECS: &'static str = "CHECKROOM_SWEEP_SECS";
    pub const ENV_STRICT_RECONNECT: &'static str = "CHECKROOM_STRICT_RECONNECT";
    pub const ENV_CONNECTION_TIMEOUT_SECS: &'static str = "CHECKROOM_CONNECTION_TIMEOUT_SECS";

    /// Defaults overridden by whatever `CHECKROOM_*` variables are set.
    ///
    /// # Errors
    /// Returns [`CheckroomError::Config`] when a variable is set but
    /// cannot be parsed.
    pub fn from_env() -> Result<Self, CheckroomError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading through `lookup`.
    ///
    /// `CHECKROOM_SWEEP_SECS=0` disables the reaper.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CheckroomError> {
        let mut config = Self::default();

        if let Some(addr) = lookup(Self::ENV_BIND) {
            config.bind_addr = addr;
        }
        if let Some(raw) = lookup(Self::ENV_IDLE_SECS) {
            config.idle_threshold = Duration::from_secs(parse_secs(Self::ENV_IDLE_SECS, &raw)?);
        }
        if let Some(raw) = lookup(Self::ENV_SWEEP_SECS) {
            config.sweep_interval = match parse_secs(Self::ENV_SWEEP_SECS, &raw)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            };
        }
        if let Some(raw) = lookup(Self::ENV_STRICT_RECONNECT) {
            config.reconnect_mode = if parse_flag(Self::ENV_STRICT_RECONNECT, &raw)? {
                ReconnectMode::Strict
            } else {
                ReconnectMode::Lenient
            };
        }
        if let Some(raw) = lookup(Self::ENV_CONNECTION_TIMEOUT_SECS) {
            let secs = parse_secs(Self::ENV_CONNECTION_TIMEOUT_SECS, &raw)?;
            if secs == 0 {
                return Err(CheckroomError::Config(format!(
                    "{}: must be at least 1",
                    Self::ENV_CONNECTION_TIMEOUT_SECS
                )));
            }
            config.connection_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    // -- Builder-style setters ---------------------------------------------

    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    pub fn sweep_interval(mut self, interval: Option<Duration>) -> Self {
        self.sweep_interval = interval;
        self
    }

    pub fn reconnect_mode(mut self, mode: ReconnectMode) -> Self {
        self.reconnect_mode = mode;
        self
    }

    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, CheckroomError> {
    raw.trim()
        .parse()
        .map_err(|_| CheckroomError::Config(format!("{key}: expected whole seconds, got {raw:?}")))
}

fn parse_flag(key: &str, raw: &str) -> Result<bool, CheckroomError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(CheckroomError::Config(format!(
            "{key}: expected a boolean, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.idle_threshold, Duration::from_secs(86_400));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(3_600)));
        assert_eq!(config.reconnect_mode, ReconnectMode::Lenient);
    }

    #[test]
    fn test_from_lookup_empty_env_gives_defaults() {
        let config = ServerConfig::from_lookup(env(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides_every_field() {
        let config = ServerConfig::from_lookup(env(&[
            ("CHECKROOM_BIND", "127.0.0.1:9000"),
            ("CHECKROOM_IDLE_SECS", "600"),
            ("CHECKROOM_SWEEP_SECS", "30"),
            ("CHECKROOM_STRICT_RECONNECT", "true"),
            ("CHECKROOM_CONNECTION_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.idle_threshold, Duration::from_secs(600));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(30)));
        assert_eq!(config.reconnect_mode, ReconnectMode::Strict);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_from_lookup_zero_sweep_disables_reaper() {
        let config = ServerConfig::from_lookup(env(&[("CHECKROOM_SWEEP_SECS", "0")])).unwrap();
        assert_eq!(config.sweep_interval, None);
    }

    #[test]
    fn test_from_lookup_malformed_number_is_config_error() {
        let err = ServerConfig::from_lookup(env(&[("CHECKROOM_IDLE_SECS", "a day")])).unwrap_err();
        assert!(matches!(err, CheckroomError::Config(_)));
        assert!(err.to_string().contains("CHECKROOM_IDLE_SECS"));
    }

    #[test]
    fn test_from_lookup_malformed_flag_is_config_error() {
        let err =
            ServerConfig::from_lookup(env(&[("CHECKROOM_STRICT_RECONNECT", "maybe")])).unwrap_err();
        assert!(matches!(err, CheckroomError::Config(_)));
    }

    #[test]
    fn test_from_lookup_zero_timeout_rejected() {
        let err = ServerConfig::from_lookup(env(&[("CHECKROOM_CONNECTION_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }

    #[test]
    fn test_builder_setters_chain() {
        let config = ServerConfig::default()
            .bind("127.0.0.1:0")
            .idle_threshold(Duration::from_secs(1))
            .sweep_interval(None)
            .reconnect_mode(ReconnectMode::Strict)
            .connection_timeout(Duration::from_secs(2));

        assert_eq!(config.bind_addr, "127.0.0.1:0");
        assert_eq!(config.sweep_interval, None);
        assert_eq!(config.reconnect_mode, ReconnectMode::Strict);
    }
}
