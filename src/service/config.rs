//! Service Configuration - passed from the host layer

use std::time::Duration;

use crate::core::paths::text;

/// How `start_timer` keeps the user informed while waiting for the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandbyStrategy {
    /// Render the standby notification once, register a wake, let the CPU sleep.
    DeferredWake,
    /// Stay resident and tick every second until the target.
    LiveCountdown,
}

impl Default for StandbyStrategy {
    fn default() -> Self { Self::DeferredWake }
}

impl StandbyStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandbyStrategy::DeferredWake => "deferred",
            StandbyStrategy::LiveCountdown => "live",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "deferred" | "wake" | "alarm" => Some(StandbyStrategy::DeferredWake),
            "live" | "countdown" | "tick" => Some(StandbyStrategy::LiveCountdown),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Service configuration. The host constructs this.
#[derive(Debug, Clone)]
pub struct AdzanConfig {
    /// Countdown tick interval in milliseconds
    pub tick_interval_ms: u64,
    /// Ceiling on the CPU hold taken when a wake fires
    pub cpu_hold_max_ms: u64,
    pub default_label: String,
    pub standby: StandbyStrategy,
    /// Battery percentage at or below which live countdown is avoided
    pub low_battery_percent: u8,
    /// Fixed offset for HH:mm rendering. `None` uses the host's local zone.
    pub utc_offset_minutes: Option<i32>,
    pub port: u16,
}

impl Default for AdzanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            cpu_hold_max_ms: 10_000,
            default_label: text::DEFAULT_LABEL.into(),
            standby: StandbyStrategy::default(),
            low_battery_percent: 15,
            utc_offset_minutes: None,
            port: 8080,
        }
    }
}

impl AdzanConfig {
    pub fn new() -> Self { Self::default() }
    pub fn with_tick_interval_ms(mut self, ms: u64) -> Self { self.tick_interval_ms = ms; self }
    pub fn with_cpu_hold_max_ms(mut self, ms: u64) -> Self { self.cpu_hold_max_ms = ms; self }
    pub fn with_default_label(mut self, label: impl Into<String>) -> Self { self.default_label = label.into(); self }
    pub fn with_standby(mut self, strategy: StandbyStrategy) -> Self { self.standby = strategy; self }
    pub fn with_low_battery_percent(mut self, percent: u8) -> Self { self.low_battery_percent = percent; self }
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self { self.utc_offset_minutes = Some(minutes); self }
    pub fn with_port(mut self, port: u16) -> Self { self.port = port; self }

    pub fn tick_interval(&self) -> Duration { Duration::from_millis(self.tick_interval_ms) }
    pub fn cpu_hold_max(&self) -> Duration { Duration::from_millis(self.cpu_hold_max_ms) }

    /// Build from `ADZAN_*` environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(v) = env_parse::<u64>("ADZAN_TICK_MS")? { config.tick_interval_ms = v; }
        if let Some(v) = env_parse::<u64>("ADZAN_CPU_HOLD_MS")? { config.cpu_hold_max_ms = v; }
        if let Some(v) = env_parse::<u8>("ADZAN_LOW_BATTERY_PERCENT")? { config.low_battery_percent = v; }
        if let Some(v) = env_parse::<i32>("ADZAN_UTC_OFFSET_MINUTES")? { config.utc_offset_minutes = Some(v); }
        if let Some(v) = env_parse::<u16>("ADZAN_PORT")? { config.port = v; }
        if let Ok(label) = std::env::var("ADZAN_DEFAULT_LABEL") {
            if !label.trim().is_empty() { config.default_label = label.trim().to_string(); }
        }
        if let Ok(raw) = std::env::var("ADZAN_STANDBY") {
            config.standby = StandbyStrategy::from_str(&raw)
                .ok_or(ConfigError::Invalid { key: "ADZAN_STANDBY", value: raw })?;
        }
        if config.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid { key: "ADZAN_TICK_MS", value: "0".into() });
        }
        Ok(config)
    }
}

fn env_parse<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use once_cell::sync::Lazy;
    use std::sync::Mutex;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const KEYS: &[&str] = &[
        "ADZAN_TICK_MS",
        "ADZAN_CPU_HOLD_MS",
        "ADZAN_LOW_BATTERY_PERCENT",
        "ADZAN_UTC_OFFSET_MINUTES",
        "ADZAN_PORT",
        "ADZAN_DEFAULT_LABEL",
        "ADZAN_STANDBY",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_match_host_contract() {
        let config = AdzanConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.cpu_hold_max(), Duration::from_secs(10));
        assert_eq!(config.default_label, "Sholat");
        assert_eq!(config.standby, StandbyStrategy::DeferredWake);
        assert_eq!(config.low_battery_percent, 15);
    }

    #[test]
    fn builder_overrides() {
        let config = AdzanConfig::new()
            .with_tick_interval_ms(250)
            .with_standby(StandbyStrategy::LiveCountdown)
            .with_utc_offset_minutes(420);
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.standby, StandbyStrategy::LiveCountdown);
        assert_eq!(config.utc_offset_minutes, Some(420));
    }

    #[test]
    fn strategy_parsing() {
        assert_eq!(StandbyStrategy::from_str(" Live "), Some(StandbyStrategy::LiveCountdown));
        assert_eq!(StandbyStrategy::from_str("alarm"), Some(StandbyStrategy::DeferredWake));
        assert_eq!(StandbyStrategy::from_str("sometimes"), None);
    }

    #[test]
    fn from_env_reads_overrides() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();
        std::env::set_var("ADZAN_TICK_MS", "500");
        std::env::set_var("ADZAN_STANDBY", "live");
        std::env::set_var("ADZAN_DEFAULT_LABEL", "Isya");
        let config = AdzanConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.tick_interval_ms, 500);
        assert_eq!(config.standby, StandbyStrategy::LiveCountdown);
        assert_eq!(config.default_label, "Isya");
        assert_eq!(config.cpu_hold_max_ms, 10_000);
    }

    #[test]
    fn from_env_rejects_garbage() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();
        std::env::set_var("ADZAN_CPU_HOLD_MS", "ten seconds");
        let result = AdzanConfig::from_env();
        clear_env();

        assert!(matches!(result, Err(ConfigError::Invalid { key: "ADZAN_CPU_HOLD_MS", .. })));
    }

    #[test]
    fn from_env_rejects_zero_tick() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|p| p.into_inner());
        clear_env();
        std::env::set_var("ADZAN_TICK_MS", "0");
        let result = AdzanConfig::from_env();
        clear_env();

        assert!(result.is_err());
    }
}
