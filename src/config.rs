use crate::error::{ScrollTimingError, StResult};
use clap::{parser::ValueSource, ArgMatches, Args};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    // === REFRESH RATE ===
    /// Rate assumed until a measurement completes (Hz).
    #[arg(long, default_value_t = 60.0)]
    pub default_refresh_rate: f64,
    /// Frame callbacks per measurement cycle.
    #[arg(long, default_value_t = 60)]
    pub refresh_rate_samples: usize,
    #[arg(long, default_value_t = 10)]
    pub min_samples_for_calculation: usize,

    // Accepted inter-frame delta range, exclusive on both ends.
    // (0, 100) ms keeps everything between 10 and 1000 Hz.
    #[arg(long, default_value_t = 0.0)]
    pub frame_time_min_ms: f64,
    #[arg(long, default_value_t = 100.0)]
    pub frame_time_max_ms: f64,

    // === GESTURES ===
    #[arg(long, default_value_t = 250.0)]
    pub input_hint_timeout_ms: f64,
    #[arg(long, default_value_t = 150.0)]
    pub scroll_end_timeout_ms: f64,

    // === DIAGNOSTICS ===
    /// Relative shortfall of the main-thread rate against the baseline
    /// above which a jank warning is logged.
    #[arg(long, default_value_t = 0.1)]
    pub divergence_warn_ratio: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            default_refresh_rate: 60.0,
            refresh_rate_samples: 60,
            min_samples_for_calculation: 10,
            frame_time_min_ms: 0.0,
            frame_time_max_ms: 100.0,
            input_hint_timeout_ms: 250.0,
            scroll_end_timeout_ms: 150.0,
            divergence_warn_ratio: 0.1,
        }
    }
}

impl TimingConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> StResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Copies every flag the user typed explicitly on top of `self`.
    /// Values that came from clap defaults leave the file values alone.
    pub fn merge_from_cli(&mut self, cli: &TimingConfig, matches: &ArgMatches) {
        macro_rules! update_if_present {
            ($field:ident) => {
                if matches.value_source(stringify!($field)) == Some(ValueSource::CommandLine) {
                    self.$field = cli.$field;
                }
            };
        }

        update_if_present!(default_refresh_rate);
        update_if_present!(refresh_rate_samples);
        update_if_present!(min_samples_for_calculation);
        update_if_present!(frame_time_min_ms);
        update_if_present!(frame_time_max_ms);
        update_if_present!(input_hint_timeout_ms);
        update_if_present!(scroll_end_timeout_ms);
        update_if_present!(divergence_warn_ratio);
    }

    pub fn validate(&self) -> StResult<()> {
        if !(self.default_refresh_rate.is_finite() && self.default_refresh_rate > 0.0) {
            return Err(ScrollTimingError::Config(format!(
                "default_refresh_rate must be positive, got {}",
                self.default_refresh_rate
            )));
        }
        if self.refresh_rate_samples < 2 {
            return Err(ScrollTimingError::Config(
                "refresh_rate_samples must be at least 2".to_string(),
            ));
        }
        if self.min_samples_for_calculation == 0
            || self.min_samples_for_calculation >= self.refresh_rate_samples
        {
            return Err(ScrollTimingError::Config(format!(
                "min_samples_for_calculation must be in 1..{}",
                self.refresh_rate_samples
            )));
        }
        if self.frame_time_min_ms < 0.0 || self.frame_time_min_ms >= self.frame_time_max_ms {
            return Err(ScrollTimingError::Config(format!(
                "invalid frame time range ({}, {})",
                self.frame_time_min_ms, self.frame_time_max_ms
            )));
        }
        if self.input_hint_timeout_ms <= 0.0 || self.scroll_end_timeout_ms <= 0.0 {
            return Err(ScrollTimingError::Config(
                "timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
