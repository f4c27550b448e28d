use chrono::{DateTime, Local};
use std::fmt::Write;

use dht_logger_model::{History, Sample};

pub const VIEWBOX_WIDTH: f32 = 1000.0;
pub const VIEWBOX_HEIGHT: f32 = 400.0;

/// Vertical space kept free above and below each line.
const MARGIN: f32 = VIEWBOX_HEIGHT * 0.05;

/// The trend chart of a history as path commands (`M x y L x y ...`) in a
/// [`VIEWBOX_WIDTH`] x [`VIEWBOX_HEIGHT`] view box.
///
/// Both series are scaled to their own range. x follows the timestamps.
#[derive(Clone, Debug, PartialEq)]
pub struct ChartPaths {
    pub temperature: String,
    pub humidity: String,
    pub temperature_range: (f64, f64),
    pub humidity_range: (f64, f64),
    pub first: DateTime<Local>,
    pub last: DateTime<Local>,
    pub samples: usize,
}

impl ChartPaths {
    /// `None` for an empty history.
    pub fn from_history(history: &History) -> Option<Self> {
        let samples = history.samples();
        let first = samples.first()?;
        let last = samples.last()?;

        let xs = x_positions(samples);
        let temperatures: Vec<f64> = samples.iter().map(|s| s.temperature_celsius).collect();
        let humidities: Vec<f64> = samples.iter().map(|s| s.humidity_percent).collect();

        let temperature_range = range(&temperatures);
        let humidity_range = range(&humidities);

        Some(Self {
            temperature: path(&xs, &temperatures, temperature_range),
            humidity: path(&xs, &humidities, humidity_range),
            temperature_range,
            humidity_range,
            first: first.timestamp,
            last: last.timestamp,
            samples: samples.len(),
        })
    }

    pub fn time_label(&self) -> String {
        format!(
            "{} – {}",
            self.first.format("%H:%M:%S"),
            self.last.format("%H:%M:%S")
        )
    }
}

fn x_positions(samples: &[Sample]) -> Vec<f32> {
    let Some(first) = samples.first() else {
        return Vec::new();
    };
    let span = samples[samples.len() - 1]
        .timestamp
        .signed_duration_since(first.timestamp)
        .num_milliseconds();

    if span > 0 {
        samples
            .iter()
            .map(|s| {
                let offset = s.timestamp.signed_duration_since(first.timestamp).num_milliseconds();
                (offset as f64 / span as f64) as f32 * VIEWBOX_WIDTH
            })
            .collect()
    } else if samples.len() > 1 {
        let step = VIEWBOX_WIDTH / (samples.len() - 1) as f32;
        (0..samples.len()).map(|i| i as f32 * step).collect()
    } else {
        vec![0.0]
    }
}

fn range(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &v| {
            (min.min(v), max.max(v))
        })
}

fn y_position(value: f64, (min, max): (f64, f64)) -> f32 {
    let usable = VIEWBOX_HEIGHT - 2.0 * MARGIN;
    if max > min {
        let fraction = ((value - min) / (max - min)) as f32;
        VIEWBOX_HEIGHT - MARGIN - fraction * usable
    } else {
        VIEWBOX_HEIGHT / 2.0
    }
}

fn path(xs: &[f32], values: &[f64], range: (f64, f64)) -> String {
    let mut commands = String::new();
    for (i, (x, value)) in xs.iter().zip(values).enumerate() {
        let command = if i == 0 { 'M' } else { 'L' };
        if i > 0 {
            commands.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = write!(commands, "{command} {x:.1} {:.1}", y_position(*value, range));
    }
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use dht_logger_model::Reading;

    fn t(seconds: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    #[test]
    fn empty_history_has_no_chart() {
        assert_eq!(ChartPaths::from_history(&History::new()), None);
    }

    #[test]
    fn two_samples_span_the_view_box() {
        let mut history = History::new();
        history.record(Reading::new(20.0, 60.0), t(0));
        history.record(Reading::new(25.0, 50.0), t(5));

        let chart = ChartPaths::from_history(&history).unwrap();
        assert_eq!(chart.temperature, "M 0.0 380.0 L 1000.0 20.0");
        assert_eq!(chart.humidity, "M 0.0 20.0 L 1000.0 380.0");
        assert_eq!(chart.temperature_range, (20.0, 25.0));
        assert_eq!(chart.humidity_range, (50.0, 60.0));
        assert_eq!(chart.samples, 2);
    }

    #[test]
    fn x_follows_timestamps() {
        let mut history = History::new();
        history.record(Reading::new(20.0, 50.0), t(0));
        history.record(Reading::new(21.0, 50.0), t(1));
        history.record(Reading::new(22.0, 50.0), t(4));

        let chart = ChartPaths::from_history(&history).unwrap();
        assert_eq!(chart.temperature, "M 0.0 380.0 L 250.0 200.0 L 1000.0 20.0");
        // A flat series sits in the middle.
        assert_eq!(chart.humidity, "M 0.0 200.0 L 250.0 200.0 L 1000.0 200.0");
    }

    #[test]
    fn equal_timestamps_fall_back_to_index() {
        let mut history = History::new();
        for temperature in [20.0, 21.0, 22.0] {
            history.record(Reading::new(temperature, 50.0), t(0));
        }

        let chart = ChartPaths::from_history(&history).unwrap();
        assert_eq!(chart.temperature, "M 0.0 380.0 L 500.0 200.0 L 1000.0 20.0");
    }
}
