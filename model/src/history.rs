use chrono::{DateTime, Local};

use crate::{Reading, Sample};

/// Append-only, arrival-ordered samples of one logging session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct History {
    samples: Vec<Sample>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `reading` received at `timestamp` and return the stored sample.
    ///
    /// The stored timestamp never precedes the previous sample's, so a wall clock
    /// stepping backwards cannot reorder the history.
    pub fn record(&mut self, reading: Reading, timestamp: DateTime<Local>) -> Sample {
        let timestamp = match self.samples.last() {
            Some(last) if last.timestamp > timestamp => {
                log::debug!(
                    "Clock went backwards ({} < {}), keeping previous timestamp",
                    timestamp,
                    last.timestamp
                );
                last.timestamp
            }
            _ => timestamp,
        };

        let sample = reading.at(timestamp);
        self.samples.push(sample);
        sample
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.last()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample> {
        self.samples.iter()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a Sample;
    type IntoIter = std::slice::Iter<'a, Sample>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t(seconds: i64) -> DateTime<Local> {
        Local.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds)
    }

    #[test]
    fn keeps_arrival_order() {
        let mut history = History::new();
        for (i, temperature) in [21.0, 19.5, 23.0].into_iter().enumerate() {
            history.record(Reading::new(temperature, 50.0), t(i as i64 * 5));
        }

        assert_eq!(history.len(), 3);
        let temperatures: Vec<f64> = history.iter().map(|s| s.temperature_celsius).collect();
        assert_eq!(temperatures, vec![21.0, 19.5, 23.0]);
        assert_eq!(history.latest().unwrap().timestamp, t(10));
    }

    #[test]
    fn timestamps_never_decrease() {
        let mut history = History::new();
        history.record(Reading::new(20.0, 40.0), t(10));
        let clamped = history.record(Reading::new(20.5, 41.0), t(3));
        history.record(Reading::new(21.0, 42.0), t(12));

        assert_eq!(clamped.timestamp, t(10));
        assert!(history
            .samples()
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[test]
    fn samples_serialize_with_their_timestamp() {
        let mut history = History::new();
        let sample = history.record(Reading::new(22.5, 54.0), t(0));

        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }
}
