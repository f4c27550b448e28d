mod history;
mod parser;

pub use history::History;
pub use parser::{parse_line, MalformedReason, MalformedSampleError};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One temperature/humidity pair as sent by the sensor, before it is timestamped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
}

impl Reading {
    pub fn new(temperature_celsius: f64, humidity_percent: f64) -> Self {
        Self {
            temperature_celsius,
            humidity_percent,
        }
    }

    /// Stamp the reading with the time it was received.
    pub fn at(self, timestamp: DateTime<Local>) -> Sample {
        Sample {
            timestamp,
            temperature_celsius: self.temperature_celsius,
            humidity_percent: self.humidity_percent,
        }
    }
}

/// A parsed reading together with its wall-clock arrival time.
///
/// Samples are only handed out by shared reference once they are in a [`History`],
/// so they never change after being recorded.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Local>,
    pub temperature_celsius: f64,
    pub humidity_percent: f64,
}

impl std::fmt::Display for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} temperature: {} °C, humidity: {} %",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.temperature_celsius,
            self.humidity_percent
        )
    }
}
