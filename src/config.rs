use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::constants::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Timing and capacity settings for the monitor and the infusion trainer.
///
/// Every section falls back to the built-in defaults, so a file only needs the
/// keys it overrides.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub nibp: NibpConfig,
    pub interventions: InterventionConfig,
    pub alarms: AlarmConfig,
    pub infusion: InfusionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub tick_interval_ms: u64,
    pub waveform_capacity: usize,
    pub event_log_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NibpConfig {
    pub step_interval_ms: u64,
    pub settle_delay_ms: u64,
    /// Delay before the first reading after auto-cycling is switched on.
    pub first_auto_delay_ms: u64,
    pub initial_cuff_mmhg: u32,
    pub cuff_step_mmhg: u32,
    pub cuff_ceiling_mmhg: u32,
    /// Half-width of the symmetric noise added to each reading.
    pub reading_noise_mmhg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterventionConfig {
    pub duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmConfig {
    pub silence_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InfusionConfig {
    pub tick_interval_ms: u64,
    pub kvo_rate_ml_per_hour: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            waveform_capacity: WAVEFORM_CAPACITY,
            event_log_capacity: EVENT_LOG_CAPACITY,
        }
    }
}

impl Default for NibpConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: NIBP_STEP_INTERVAL_MS,
            settle_delay_ms: NIBP_SETTLE_DELAY_MS,
            first_auto_delay_ms: NIBP_FIRST_AUTO_DELAY_MS,
            initial_cuff_mmhg: NIBP_INITIAL_CUFF,
            cuff_step_mmhg: NIBP_CUFF_STEP,
            cuff_ceiling_mmhg: NIBP_CUFF_CEILING,
            reading_noise_mmhg: NIBP_READING_NOISE,
        }
    }
}

impl Default for InterventionConfig {
    fn default() -> Self {
        Self {
            duration_ms: INTERVENTION_DURATION_MS,
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            silence_ms: ALARM_SILENCE_MS,
        }
    }
}

impl Default for InfusionConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: INFUSION_TICK_INTERVAL_MS,
            kvo_rate_ml_per_hour: KVO_RATE_ML_PER_HOUR,
        }
    }
}

impl SimConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it is given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let non_zero = [
            ("simulation.tick_interval_ms", self.simulation.tick_interval_ms),
            ("nibp.step_interval_ms", self.nibp.step_interval_ms),
            ("interventions.duration_ms", self.interventions.duration_ms),
            ("alarms.silence_ms", self.alarms.silence_ms),
            ("infusion.tick_interval_ms", self.infusion.tick_interval_ms),
        ];
        for (key, value) in non_zero {
            if value == 0 {
                return Err(ConfigError::Validation(format!("{} must be > 0", key)));
            }
        }
        if self.simulation.waveform_capacity == 0 {
            return Err(ConfigError::Validation(
                "simulation.waveform_capacity must be > 0".to_string(),
            ));
        }
        if self.simulation.event_log_capacity == 0 {
            return Err(ConfigError::Validation(
                "simulation.event_log_capacity must be > 0".to_string(),
            ));
        }
        if self.nibp.cuff_step_mmhg == 0 {
            return Err(ConfigError::Validation(
                "nibp.cuff_step_mmhg must be > 0".to_string(),
            ));
        }
        if self.nibp.cuff_ceiling_mmhg <= self.nibp.initial_cuff_mmhg {
            return Err(ConfigError::Validation(
                "nibp.cuff_ceiling_mmhg must be above nibp.initial_cuff_mmhg".to_string(),
            ));
        }
        if !(self.nibp.reading_noise_mmhg >= 0.0) {
            return Err(ConfigError::Validation(
                "nibp.reading_noise_mmhg must be >= 0".to_string(),
            ));
        }
        if !(self.infusion.kvo_rate_ml_per_hour > 0.0) {
            return Err(ConfigError::Validation(
                "infusion.kvo_rate_ml_per_hour must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Export configuration to TOML string
    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.simulation.tick_interval_ms, 100);
        assert_eq!(config.simulation.waveform_capacity, 150);
        assert_eq!(config.nibp.cuff_ceiling_mmhg, 160);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            [nibp]
            settle_delay_ms = 2000

            [alarms]
            silence_ms = 30000
            "#,
        )
        .unwrap();
        assert_eq!(config.nibp.settle_delay_ms, 2000);
        assert_eq!(config.nibp.step_interval_ms, NIBP_STEP_INTERVAL_MS);
        assert_eq!(config.alarms.silence_ms, 30_000);
        assert_eq!(config.simulation, SimulationConfig::default());
    }

    #[test]
    fn rejects_zero_tick() {
        let err = SimConfig::from_toml_str("[simulation]\ntick_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_ceiling_below_initial_cuff() {
        let mut config = SimConfig::default();
        config.nibp.cuff_ceiling_mmhg = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn toml_round_trip_through_file() {
        let config = SimConfig::default();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_toml_string().unwrap().as_bytes())
            .unwrap();
        let loaded = SimConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SimConfig::load(Some(Path::new("/nonexistent/vitals.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
