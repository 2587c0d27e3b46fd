use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{OptimizeError, Result};
use crate::types::{BAR_LENGTH, DEFAULT_TRIALS};

/// Search parameters shared by every classification of a run.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OptimizerConfig {
    /// Stock bar length in meters.
    #[serde(default = "default_bar_length")]
    pub bar_length: f64,

    /// Randomized greedy trials per classification.
    #[serde(default = "default_trials")]
    pub trials: u32,

    /// Seed for reproducible runs. A fresh one is drawn when absent.
    #[serde(default)]
    pub seed: Option<u64>,

    /// Wall-clock bound for the trials of one classification.
    #[serde(default)]
    pub time_limit_ms: Option<u64>,
}

fn default_bar_length() -> f64 {
    BAR_LENGTH
}

fn default_trials() -> u32 {
    DEFAULT_TRIALS
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            bar_length: BAR_LENGTH,
            trials: DEFAULT_TRIALS,
            seed: None,
            time_limit_ms: None,
        }
    }
}

impl OptimizerConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_trials(mut self, trials: u32) -> Self {
        self.trials = trials;
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bar_length.is_finite() || self.bar_length <= 0.0 {
            return Err(OptimizeError::Config(format!(
                "bar length must be positive, got {}",
                self.bar_length
            )));
        }
        if self.trials == 0 {
            return Err(OptimizeError::Config(
                "trial budget must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let config: OptimizerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, OptimizerConfig::default());
        assert_eq!(config.bar_length, 12.0);
        assert_eq!(config.trials, 3000);
        assert!(config.time_limit().is_none());
    }

    #[test]
    fn test_rejects_bad_values() {
        let zero_trials = OptimizerConfig::default().with_trials(0);
        assert!(matches!(zero_trials.validate(), Err(OptimizeError::Config(_))));

        let short = OptimizerConfig {
            bar_length: 0.0,
            ..Default::default()
        };
        assert!(matches!(short.validate(), Err(OptimizeError::Config(_))));

        let nan = OptimizerConfig {
            bar_length: f64::NAN,
            ..Default::default()
        };
        assert!(nan.validate().is_err());

        assert!(OptimizerConfig::default().validate().is_ok());
    }
}
