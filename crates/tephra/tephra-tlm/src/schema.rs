use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Byte order of one measurement on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    #[default]
    Big,
    Little,
}

impl Endianness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endianness::Big => "big",
            Endianness::Little => "little",
        }
    }
}

/// Numeric interpretation of one measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    Int,
    Float,
}

/// One named scalar inside a frame. Created by schema load, immutable
/// thereafter.
#[derive(Debug, Clone, Deserialize)]
pub struct Measurement {
    pub name: String,
    /// Width in bytes. 1..=8 for int, 4 or 8 for float.
    pub size: usize,
    #[serde(rename = "type")]
    pub ty: MeasurementType,
    #[serde(default)]
    pub unsigned: bool,
    /// "big" or "little". Kept as the raw configuration string so the
    /// loader can name a bad value in its error; defaults to big.
    #[serde(default = "default_endianness")]
    pub endianness: String,
    /// Carried through the schema for consumers; the interpreter does not
    /// apply it.
    #[serde(default = "default_scaling")]
    pub scaling: f64,
}

fn default_endianness() -> String {
    "big".to_string()
}

fn default_scaling() -> f64 {
    1.0
}

impl Measurement {
    /// The descriptor's byte order, or `None` for a value the loader
    /// rejects.
    pub fn byte_order(&self) -> Option<Endianness> {
        match self.endianness.as_str() {
            "big" => Some(Endianness::Big),
            "little" => Some(Endianness::Little),
            _ => None,
        }
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name: {}, Size: {}", self.name, self.size)?;
        match self.ty {
            MeasurementType::Int => write!(f, ", Type: int")?,
            MeasurementType::Float => write!(f, ", Type: float")?,
        }
        if self.unsigned {
            write!(f, ", Unsigned")?;
        } else {
            write!(f, ", Signed")?;
        }
        write!(f, ", Endianness: {}", self.endianness)
    }
}

/// One telemetry stream: a UDP port and the ordered measurements that make
/// up its fixed-size frame.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryPacket {
    pub name: String,
    pub port: u16,
    /// Measurement identifiers in frame order.
    pub measurements: Vec<String>,
}

/// The validated, in-memory description of the frame catalog.
///
/// Loaded once by the service and handed to each task as an immutable
/// snapshot; other processes obtain the same snapshot through the config
/// channel rather than the filesystem.
#[derive(Debug, Clone, Deserialize)]
pub struct Schema {
    pub name: String,
    pub measurements: BTreeMap<String, Measurement>,
    pub telemetry_packets: Vec<TelemetryPacket>,
}

/// Schema validation failures, in the order they are checked. Each names
/// the first violated invariant; nothing is logged at this layer.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read '{path}'")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema YAML")]
    Yaml(#[from] serde_yaml::Error),

    #[error("no configuration name provided")]
    MissingName,

    #[error("no measurements found in configuration")]
    NoMeasurements,

    #[error("no telemetry packets found in configuration")]
    NoPackets,

    #[error("measurement '{key}' has an empty name")]
    UnnamedMeasurement { key: String },

    #[error("measurement '{name}': endianness specified as '{value}', instead of big or little")]
    BadEndianness { name: String, value: String },

    #[error("measurement '{name}': float size must be 4 or 8, got {size}")]
    BadFloatSize { name: String, size: usize },

    #[error("measurement '{name}': int size must be between 1 and 8, got {size}")]
    BadIntSize { name: String, size: usize },

    #[error("packet '{packet}' lists no measurements")]
    EmptyPacket { packet: String },

    #[error("packet '{packet}' references unknown measurement '{reference}'")]
    UnknownMeasurement { packet: String, reference: String },

    #[error("packets '{first}' and '{second}' both claim port {port}")]
    DuplicatePort {
        first: String,
        second: String,
        port: u16,
    },
}

impl Schema {
    /// Parse and validate a schema from a YAML blob.
    ///
    /// Pure: no filesystem, no shared memory. Consumers run this on the
    /// bytes they fetch from the config channel; the service runs it on
    /// the on-disk file once at startup.
    pub fn from_yaml(data: &[u8]) -> Result<Self, SchemaError> {
        let schema: Schema = serde_yaml::from_slice(data)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Read a schema YAML file and parse it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let data = std::fs::read(&path).map_err(|source| SchemaError::Read {
            path: path.as_ref().display().to_string(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty() {
            return Err(SchemaError::MissingName);
        }
        if self.measurements.is_empty() {
            return Err(SchemaError::NoMeasurements);
        }
        if self.telemetry_packets.is_empty() {
            return Err(SchemaError::NoPackets);
        }

        for (key, m) in &self.measurements {
            if m.name.is_empty() {
                return Err(SchemaError::UnnamedMeasurement { key: key.clone() });
            }
            if m.byte_order().is_none() {
                return Err(SchemaError::BadEndianness {
                    name: m.name.clone(),
                    value: m.endianness.clone(),
                });
            }
            match m.ty {
                MeasurementType::Float if !matches!(m.size, 4 | 8) => {
                    return Err(SchemaError::BadFloatSize {
                        name: m.name.clone(),
                        size: m.size,
                    });
                }
                MeasurementType::Int if !(1..=8).contains(&m.size) => {
                    return Err(SchemaError::BadIntSize {
                        name: m.name.clone(),
                        size: m.size,
                    });
                }
                _ => {}
            }
        }

        let mut ports: BTreeMap<u16, &str> = BTreeMap::new();
        for packet in &self.telemetry_packets {
            if packet.measurements.is_empty() {
                return Err(SchemaError::EmptyPacket {
                    packet: packet.name.clone(),
                });
            }
            for reference in &packet.measurements {
                if !self.measurements.contains_key(reference) {
                    return Err(SchemaError::UnknownMeasurement {
                        packet: packet.name.clone(),
                        reference: reference.clone(),
                    });
                }
            }
            if let Some(first) = ports.insert(packet.port, packet.name.as_str()) {
                return Err(SchemaError::DuplicatePort {
                    first: first.to_string(),
                    second: packet.name.clone(),
                    port: packet.port,
                });
            }
        }
        Ok(())
    }

    /// Look up a measurement by its identifier.
    pub fn measurement(&self, identifier: &str) -> Option<&Measurement> {
        self.measurements.get(identifier)
    }

    /// Byte size of one frame of `packet`: the sum of its referenced
    /// measurement sizes. Fixed for the lifetime of the schema.
    pub fn packet_frame_size(&self, packet: &TelemetryPacket) -> usize {
        self.packet_fields(packet).map(|(_, m)| m.size).sum()
    }

    /// Walk a packet's measurements in frame order, yielding each one with
    /// its byte offset into the frame.
    pub fn packet_fields<'a>(
        &'a self,
        packet: &'a TelemetryPacket,
    ) -> impl Iterator<Item = (usize, &'a Measurement)> {
        let mut offset = 0usize;
        packet.measurements.iter().filter_map(move |identifier| {
            let m = self.measurements.get(identifier)?;
            let field = (offset, m);
            offset += m.size;
            Some(field)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
name: backplane
measurements:
  x:
    name: x
    size: 2
    type: int
telemetry_packets:
  - name: P
    port: 10000
    measurements: [x]
"#;

    #[test]
    fn minimal_schema_round_trips_with_defaults() {
        let schema = Schema::from_yaml(MINIMAL_YAML.as_bytes()).unwrap();
        assert_eq!(schema.name, "backplane");

        let packet = &schema.telemetry_packets[0];
        assert_eq!(packet.port, 10000);
        assert_eq!(schema.packet_frame_size(packet), 2);

        let x = schema.measurement("x").unwrap();
        assert_eq!(x.size, 2);
        assert!(!x.unsigned);
        assert_eq!(x.endianness, "big");
        assert_eq!(x.byte_order(), Some(Endianness::Big));
        assert_eq!(x.scaling, 1.0);
    }

    #[test]
    fn packet_fields_carry_offsets_in_frame_order() {
        let yaml = r#"
name: backplane
measurements:
  a: { name: a, size: 4, type: float }
  b: { name: b, size: 1, type: int, unsigned: true }
  c: { name: c, size: 8, type: int, endianness: little }
telemetry_packets:
  - name: P
    port: 10000
    measurements: [a, b, c]
"#;
        let schema = Schema::from_yaml(yaml.as_bytes()).unwrap();
        let packet = &schema.telemetry_packets[0];
        assert_eq!(schema.packet_frame_size(packet), 13);

        let fields: Vec<(usize, &str)> = schema
            .packet_fields(packet)
            .map(|(off, m)| (off, m.name.as_str()))
            .collect();
        assert_eq!(fields, vec![(0, "a"), (4, "b"), (5, "c")]);
    }

    #[test]
    fn empty_name_is_rejected() {
        let yaml = MINIMAL_YAML.replace("name: backplane", "name: \"\"");
        assert!(matches!(
            Schema::from_yaml(yaml.as_bytes()),
            Err(SchemaError::MissingName)
        ));
    }

    #[test]
    fn missing_sections_are_rejected() {
        let no_measurements = r#"
name: backplane
measurements: {}
telemetry_packets:
  - name: P
    port: 10000
    measurements: []
"#;
        assert!(matches!(
            Schema::from_yaml(no_measurements.as_bytes()),
            Err(SchemaError::NoMeasurements)
        ));

        let no_packets = r#"
name: backplane
measurements:
  x: { name: x, size: 2, type: int }
telemetry_packets: []
"#;
        assert!(matches!(
            Schema::from_yaml(no_packets.as_bytes()),
            Err(SchemaError::NoPackets)
        ));
    }

    #[test]
    fn bad_endianness_is_rejected_by_name() {
        let yaml = r#"
name: backplane
measurements:
  x: { name: x, size: 2, type: int, endianness: middle }
telemetry_packets:
  - name: P
    port: 10000
    measurements: [x]
"#;
        match Schema::from_yaml(yaml.as_bytes()) {
            Err(SchemaError::BadEndianness { name, value }) => {
                assert_eq!((name.as_str(), value.as_str()), ("x", "middle"));
            }
            other => panic!("expected BadEndianness, got {other:?}"),
        }
    }

    #[test]
    fn packet_with_no_measurements_is_rejected() {
        let yaml = MINIMAL_YAML.replace("measurements: [x]", "measurements: []");
        assert!(matches!(
            Schema::from_yaml(yaml.as_bytes()),
            Err(SchemaError::EmptyPacket { .. })
        ));
    }

    #[test]
    fn unknown_measurement_reference_is_rejected() {
        let yaml = MINIMAL_YAML.replace("measurements: [x]", "measurements: [x, missing]");
        match Schema::from_yaml(yaml.as_bytes()) {
            Err(SchemaError::UnknownMeasurement { packet, reference }) => {
                assert_eq!(packet, "P");
                assert_eq!(reference, "missing");
            }
            other => panic!("expected UnknownMeasurement, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ports_are_rejected() {
        let yaml = r#"
name: backplane
measurements:
  x: { name: x, size: 2, type: int }
telemetry_packets:
  - name: P
    port: 10000
    measurements: [x]
  - name: Q
    port: 10000
    measurements: [x]
"#;
        match Schema::from_yaml(yaml.as_bytes()) {
            Err(SchemaError::DuplicatePort { first, second, port }) => {
                assert_eq!((first.as_str(), second.as_str(), port), ("P", "Q", 10000));
            }
            other => panic!("expected DuplicatePort, got {other:?}"),
        }
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        let bad_float = r#"
name: backplane
measurements:
  f: { name: f, size: 3, type: float }
telemetry_packets:
  - name: P
    port: 10000
    measurements: [f]
"#;
        assert!(matches!(
            Schema::from_yaml(bad_float.as_bytes()),
            Err(SchemaError::BadFloatSize { size: 3, .. })
        ));

        let bad_int = r#"
name: backplane
measurements:
  i: { name: i, size: 9, type: int }
telemetry_packets:
  - name: P
    port: 10000
    measurements: [i]
"#;
        assert!(matches!(
            Schema::from_yaml(bad_int.as_bytes()),
            Err(SchemaError::BadIntSize { size: 9, .. })
        ));
    }

    #[test]
    fn measurement_display_matches_catalog_format() {
        let schema = Schema::from_yaml(MINIMAL_YAML.as_bytes()).unwrap();
        let x = schema.measurement("x").unwrap();
        assert_eq!(
            x.to_string(),
            "Name: x, Size: 2, Type: int, Signed, Endianness: big"
        );
    }
}
