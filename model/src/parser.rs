use crate::Reading;

/// Why a line could not be turned into a [`Reading`].
#[derive(Clone, Debug, PartialEq)]
pub enum MalformedReason {
    /// The line did not split into exactly two comma separated fields.
    FieldCount(usize),
    /// A field is not a decimal number.
    InvalidNumber { field: &'static str, value: String },
    /// A field parsed, but to NaN or an infinity.
    NotFinite { field: &'static str, value: String },
}

/// A received line that is not in the `temperature,humidity` format.
#[derive(Clone, Debug, PartialEq)]
pub struct MalformedSampleError {
    pub line: String,
    pub reason: MalformedReason,
}

impl std::fmt::Display for MalformedSampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Received data is not in the expected format 'temperature,humidity': {:?} (",
            self.line
        )?;
        match &self.reason {
            MalformedReason::FieldCount(n) => write!(f, "expected 2 fields, got {n}")?,
            MalformedReason::InvalidNumber { field, value } => {
                write!(f, "{field} {value:?} is not a number")?
            }
            MalformedReason::NotFinite { field, value } => {
                write!(f, "{field} {value:?} is not a finite number")?
            }
        }
        write!(f, ")")
    }
}

impl std::error::Error for MalformedSampleError {}

/// Parse one line of the serial wire format, e.g. `23.5,61.2`.
///
/// Surrounding whitespace (including the `\r` of a CRLF line ending) is ignored,
/// both around the line and around each field.
pub fn parse_line(line: &str) -> Result<Reading, MalformedSampleError> {
    let trimmed = line.trim();
    let malformed = |reason| MalformedSampleError {
        line: trimmed.to_string(),
        reason,
    };

    let fields: Vec<&str> = trimmed.split(',').collect();
    let [temperature, humidity] = fields.as_slice() else {
        return Err(malformed(MalformedReason::FieldCount(fields.len())));
    };

    let temperature = parse_field("temperature", temperature).map_err(malformed)?;
    let humidity = parse_field("humidity", humidity).map_err(malformed)?;

    Ok(Reading::new(temperature, humidity))
}

fn parse_field(field: &'static str, value: &str) -> Result<f64, MalformedReason> {
    let value = value.trim();
    let number = value
        .parse::<f64>()
        .map_err(|_| MalformedReason::InvalidNumber {
            field,
            value: value.to_string(),
        })?;

    if number.is_finite() {
        Ok(number)
    } else {
        Err(MalformedReason::NotFinite {
            field,
            value: value.to_string(),
        })
    }
}
