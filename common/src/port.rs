use std::time::Duration;

use crate::clock::Sleeper;
use crate::config::LoggerConfig;
use crate::source::LineSource;

/// The serial port could not be opened. Fatal for the run, never retried.
#[derive(Clone, Debug, PartialEq)]
pub struct PortOpenError {
    pub path: String,
    pub baud_rate: u32,
    pub reason: String,
}

impl PortOpenError {
    pub fn new(config: &LoggerConfig, reason: impl Into<String>) -> Self {
        Self {
            path: config.port_path.clone(),
            baud_rate: config.baud_rate,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for PortOpenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not open {} at {} baud: {}",
            self.path, self.baud_rate, self.reason
        )
    }
}

impl std::error::Error for PortOpenError {}

/// Open a line source and give the peer `settle` to finish resetting.
///
/// Whatever the peer printed while booting is discarded afterwards.
pub fn acquire<S, F>(open: F, settle: Duration, sleeper: &mut dyn Sleeper) -> Result<S, PortOpenError>
where
    S: LineSource,
    F: FnOnce() -> Result<S, PortOpenError>,
{
    let mut source = match open() {
        Ok(source) => source,
        Err(e) => {
            log::error!("Error: {e}");
            return Err(e);
        }
    };

    log::info!("Port open, waiting {settle:?} for the device to settle");
    sleeper.sleep(settle);

    if let Err(e) = source.discard_input() {
        log::warn!("Could not discard boot output: {e}");
    }

    Ok(source)
}

/// Open the configured serial port.
#[cfg(feature = "serial")]
pub fn acquire_serial(
    config: &LoggerConfig,
    sleeper: &mut dyn Sleeper,
) -> Result<crate::serial::SerialLineSource, PortOpenError> {
    log::info!(
        "Opening serial port {} at {} baud",
        config.port_path,
        config.baud_rate
    );
    acquire(
        || crate::serial::SerialLineSource::open(config),
        config.settle(),
        sleeper,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DummyLineSource;

    #[derive(Default)]
    struct RecordingSleeper(Vec<Duration>);

    impl Sleeper for RecordingSleeper {
        fn sleep(&mut self, duration: Duration) {
            self.0.push(duration);
        }
    }

    #[test]
    fn settles_after_opening() {
        let mut sleeper = RecordingSleeper::default();
        let source = acquire(
            || Ok(DummyLineSource::from_lines(["22.0,55.0"])),
            Duration::from_secs(2),
            &mut sleeper,
        )
        .unwrap();

        assert_eq!(sleeper.0, vec![Duration::from_secs(2)]);
        assert_eq!(source.remaining(), 1);
    }

    #[test]
    fn failure_is_reported_without_waiting() {
        let config = LoggerConfig::default();
        let mut sleeper = RecordingSleeper::default();
        let result = acquire(
            || Err::<DummyLineSource, _>(PortOpenError::new(&config, "No such file or directory")),
            Duration::from_secs(2),
            &mut sleeper,
        );

        let error = result.unwrap_err();
        assert!(sleeper.0.is_empty());
        assert_eq!(error.path, "/dev/cu.usbserial-110");
        assert_eq!(
            error.to_string(),
            "could not open /dev/cu.usbserial-110 at 9600 baud: No such file or directory"
        );
    }

    #[cfg(feature = "serial")]
    #[test]
    fn missing_device_fails_to_open() {
        let config = LoggerConfig {
            port_path: "/dev/this-port-does-not-exist".into(),
            ..LoggerConfig::default()
        };
        let mut sleeper = RecordingSleeper::default();

        let error = acquire_serial(&config, &mut sleeper).err().unwrap();
        assert_eq!(error.path, "/dev/this-port-does-not-exist");
        assert!(sleeper.0.is_empty());
    }
}
