use std::str::FromStr;

use crate::error::DashboardError;

pub const DEFAULT_WINDOW: usize = 7;
pub const DEFAULT_TARGET_MULTIPLIER: f64 = 1.2;
pub const DEFAULT_SOURCE: &str = "data.json";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 15;

/// Knobs for the derived-metrics engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub window_size: usize,
    pub target_multiplier: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW,
            target_multiplier: DEFAULT_TARGET_MULTIPLIER,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, DashboardError> {
        let defaults = Self::default();
        Ok(Self {
            window_size: env_value("DASHBOARD_WINDOW", defaults.window_size)?,
            target_multiplier: env_value(
                "DASHBOARD_TARGET_MULTIPLIER",
                defaults.target_multiplier,
            )?,
        })
    }

    pub fn with_overrides(mut self, window: Option<usize>, multiplier: Option<f64>) -> Self {
        if let Some(window) = window {
            self.window_size = window;
        }
        if let Some(multiplier) = multiplier {
            self.target_multiplier = multiplier;
        }
        self
    }

    pub fn validate(self) -> Result<Self, DashboardError> {
        if self.window_size == 0 {
            return Err(DashboardError::InvalidConfig(
                "window size must be at least 1".to_string(),
            ));
        }
        if !self.target_multiplier.is_finite() || self.target_multiplier <= 0.0 {
            return Err(DashboardError::InvalidConfig(format!(
                "target multiplier must be a positive number, got {}",
                self.target_multiplier
            )));
        }
        Ok(self)
    }
}

pub fn resolve_source(cli_value: Option<String>) -> String {
    cli_value
        .or_else(|| std::env::var("DASHBOARD_SOURCE").ok())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string())
}

pub fn http_timeout_secs() -> Result<u64, DashboardError> {
    env_value("DASHBOARD_HTTP_TIMEOUT_SECS", DEFAULT_HTTP_TIMEOUT_SECS)
}

/// Unset falls back to `default`; a value that does not parse is an error naming the variable.
fn env_value<T: FromStr>(name: &str, default: T) -> Result<T, DashboardError> {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| {
            DashboardError::InvalidConfig(format!("{name} must be a number, got {raw:?}"))
        }),
        Err(std::env::VarError::NotPresent) => Ok(default),
        Err(std::env::VarError::NotUnicode(_)) => Err(DashboardError::InvalidConfig(format!(
            "{name} is not valid unicode"
        ))),
    }
}
