//! `tephra-tlm`: the telemetry frame catalog and its interpreter.
//!
//! A [`Schema`] names every telemetry stream, the UDP port it arrives on,
//! and the ordered measurements that give each frame its byte-level
//! structure. The schema is loaded once from YAML by the service and
//! republished verbatim over the config channel, so every process on the
//! host decodes frames with the same layout the service captured them
//! with.
//!
//! [`interpret`] is the pure byte-slice-to-scalar function used by every
//! consumer that renders or re-encodes measurement values.

mod schema;
mod value;

pub use schema::{
    Endianness, Measurement, MeasurementType, Schema, SchemaError, TelemetryPacket,
};
pub use value::{InterpretError, Value, hex_string, interpret, interpret_string};
