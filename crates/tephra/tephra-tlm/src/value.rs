//! Pure conversion from frame bytes to typed scalars.
//!
//! Every consumer that renders or re-encodes a measurement goes through
//! [`interpret`]; the string form is what value-safe sinks (the database
//! forwarder) ship downstream.

use crate::schema::{Endianness, Measurement, MeasurementType};
use std::fmt;

/// A decoded measurement value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl fmt::Display for Value {
    /// Integers render base-10; floats as a full-precision decimal that
    /// round-trips.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unsigned(v) => write!(f, "{v}"),
            Value::Signed(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InterpretError {
    #[error("measurement '{name}' expects {expected} bytes, got {got}")]
    Length {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("measurement '{name}' has unsupported size {size} for its type")]
    UnsupportedSize { name: String, size: usize },

    #[error("measurement '{name}' has unrecognized endianness '{value}'")]
    BadEndianness { name: String, value: String },
}

/// Decode `data` (exactly `measurement.size` bytes) according to the
/// measurement descriptor.
///
/// Integer widths 3, 5, 6 and 7 are zero-extended into the next native
/// width, preserving the declared byte order; signed values then
/// sign-extend from the most-significant bit of the *original* width.
/// The scaling factor is carried by the schema but deliberately not
/// applied here.
pub fn interpret(measurement: &Measurement, data: &[u8]) -> Result<Value, InterpretError> {
    if data.len() != measurement.size {
        return Err(InterpretError::Length {
            name: measurement.name.clone(),
            expected: measurement.size,
            got: data.len(),
        });
    }

    let order = measurement
        .byte_order()
        .ok_or_else(|| InterpretError::BadEndianness {
            name: measurement.name.clone(),
            value: measurement.endianness.clone(),
        })?;

    let raw = read_raw(measurement, order, data)?;
    match measurement.ty {
        MeasurementType::Int => {
            if measurement.unsigned {
                Ok(Value::Unsigned(raw))
            } else {
                let shift = 64 - 8 * measurement.size as u32;
                Ok(Value::Signed(((raw << shift) as i64) >> shift))
            }
        }
        MeasurementType::Float => match measurement.size {
            4 => Ok(Value::Float(f64::from(f32::from_bits(raw as u32)))),
            8 => Ok(Value::Float(f64::from_bits(raw))),
            _ => Err(unsupported(measurement)),
        },
    }
}

/// [`interpret`], rendered with [`Value`]'s `Display`.
pub fn interpret_string(
    measurement: &Measurement,
    data: &[u8],
) -> Result<String, InterpretError> {
    interpret(measurement, data).map(|v| v.to_string())
}

/// Uppercase hex rendering of raw frame bytes, space-separated, for
/// tooling that shows the undecoded wire form next to the value.
pub fn hex_string(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn read_raw(
    measurement: &Measurement,
    order: Endianness,
    data: &[u8],
) -> Result<u64, InterpretError> {
    if !(1..=8).contains(&data.len()) {
        return Err(unsupported(measurement));
    }
    // Folding byte-by-byte zero-extends odd widths into the next native
    // width with the pad on the correct side for the declared byte order.
    let raw = match order {
        Endianness::Big => data.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
        Endianness::Little => data
            .iter()
            .rev()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)),
    };
    Ok(raw)
}

fn unsupported(measurement: &Measurement) -> InterpretError {
    InterpretError::UnsupportedSize {
        name: measurement.name.clone(),
        size: measurement.size,
    }
}
