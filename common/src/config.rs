use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Settings of the logger.
///
/// There are no command line flags. A build can bake in overrides with the
/// `DHT_LOGGER_CONFIG` (JSON object, any subset of the fields) and
/// `DHT_LOGGER_PORT` environment variables, see [`LoggerConfig::from_build_env`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggerConfig {
    /// Device path of the microcontroller's serial port.
    pub port_path: String,
    pub baud_rate: u32,
    /// Time the peer needs to reset after the port was opened.
    pub settle_ms: u64,
    /// Delay before checking the port again when no data is waiting.
    pub poll_interval_ms: u64,
    /// Delay after each processed line, caps the sample rate.
    pub sample_interval_ms: u64,
    /// Upper bound for a single read from the port.
    pub read_timeout_ms: u64,
    /// The chart is redrawn on every n-th recorded sample.
    pub chart_redraw_every: usize,
    pub title: String,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            port_path: "/dev/cu.usbserial-110".into(),
            baud_rate: 9600,
            settle_ms: 2000,
            poll_interval_ms: 100,
            sample_interval_ms: 5000,
            read_timeout_ms: 100,
            chart_redraw_every: 2,
            title: "DHT11 Data Logger".into(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "invalid logger configuration JSON: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid logger configuration: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Json(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

/// The loop timing derived from a [`LoggerConfig`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    poll_interval: Duration,
    sample_interval: Duration,
    chart_redraw_every: NonZeroUsize,
}

impl Timing {
    pub fn new(
        poll_interval: Duration,
        sample_interval: Duration,
        chart_redraw_every: NonZeroUsize,
    ) -> Self {
        Self {
            poll_interval,
            sample_interval,
            chart_redraw_every,
        }
    }

    /// Delay before checking an idle port again.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Delay after each processed line.
    pub fn sample_interval(&self) -> Duration {
        self.sample_interval
    }

    pub fn chart_redraw_every(&self) -> NonZeroUsize {
        self.chart_redraw_every
    }
}

impl Default for Timing {
    fn default() -> Self {
        LoggerConfig::default().timing()
    }
}

impl LoggerConfig {
    /// Defaults, overridden by whatever was baked in at compile time.
    pub fn from_build_env() -> Result<Self, ConfigError> {
        let mut config = match option_env!("DHT_LOGGER_CONFIG") {
            Some(json) => Self::from_json(json)?,
            None => Self::default(),
        };

        if let Some(port_path) = option_env!("DHT_LOGGER_PORT") {
            config.port_path = port_path.into();
        }

        config.validate()?;
        Ok(config)
    }

    /// True if this binary was built to replay canned data instead of opening the port.
    pub fn demo_build() -> bool {
        option_env!("DHT_LOGGER_DEMO").is_some()
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config = serde_json::from_str::<Self>(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port_path.is_empty() {
            return Err(ConfigError::Invalid("port_path must not be empty".into()));
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::Invalid("baud_rate must be positive".into()));
        }
        if self.chart_redraw_every == 0 {
            return Err(ConfigError::Invalid(
                "chart_redraw_every must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("poll_interval_ms", self.poll_interval_ms),
            ("sample_interval_ms", self.sample_interval_ms),
            ("read_timeout_ms", self.read_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid(format!("{name} must be positive")));
            }
        }
        Ok(())
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// An unvalidated `chart_redraw_every` of 0 redraws on every sample.
    pub fn timing(&self) -> Timing {
        Timing::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.sample_interval_ms),
            NonZeroUsize::new(self.chart_redraw_every).unwrap_or(NonZeroUsize::MIN),
        )
    }
}

#[test]
fn test_default_config() {
    let config = LoggerConfig::default();
    assert_eq!(config.baud_rate, 9600);
    assert!(config.validate().is_ok());

    let timing = config.timing();
    assert_eq!(timing.poll_interval(), Duration::from_millis(100));
    assert_eq!(timing.sample_interval(), Duration::from_secs(5));
    assert_eq!(timing.chart_redraw_every().get(), 2);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config =
        LoggerConfig::from_json(r#"{ "port_path": "/dev/ttyACM0", "sample_interval_ms": 1000 }"#)
            .unwrap();

    assert_eq!(config.port_path, "/dev/ttyACM0");
    assert_eq!(config.sample_interval_ms, 1000);
    assert_eq!(config.baud_rate, 9600);
    assert_eq!(config.settle(), Duration::from_secs(2));
}

#[test]
fn test_invalid_config_is_rejected() {
    assert!(matches!(
        LoggerConfig::from_json(r#"{ "chart_redraw_every": 0 }"#),
        Err(ConfigError::Invalid(_))
    ));
    assert!(matches!(
        LoggerConfig::from_json(r#"{ "baud_rate": "fast" }"#),
        Err(ConfigError::Json(_))
    ));
}

#[test]
fn test_unvalidated_zero_redraw_cadence_redraws_every_sample() {
    let config = LoggerConfig {
        chart_redraw_every: 0,
        ..LoggerConfig::default()
    };

    assert!(config.validate().is_err());
    assert_eq!(config.timing().chart_redraw_every().get(), 1);
}
