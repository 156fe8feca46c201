//! The config channel: a degenerate single-slot ring carrying the schema.
//!
//! The service publishes the schema YAML verbatim under a reserved key at
//! startup; late-joining consumers fetch it from shared memory instead of
//! the filesystem, so every process decodes with the schema the service
//! was actually launched with, even if the on-disk file has changed since.

use std::path::Path;
use tephra_icc::{
    CancelToken, IccError, RingConfig, RingReader, RingWriter, StartPosition,
    TELEMETRY_CONFIG_KEY,
};

/// Publish `yaml` over the config channel. The returned writer owns the
/// ring file; keep it alive for the service's lifetime so consumers can
/// attach at any point, and drop it on shutdown to unlink.
pub fn publish_schema(shm_dir: &Path, yaml: &[u8]) -> Result<RingWriter, IccError> {
    let mut writer = RingWriter::create(
        shm_dir,
        TELEMETRY_CONFIG_KEY,
        yaml.len(),
        RingConfig::single_slot(),
    )?;
    writer.publish(yaml)?;
    Ok(writer)
}

/// Fetch the schema blob the running service published.
///
/// Opens from the origin so the frame already in the slot is returned
/// immediately; [`IccError::NotReady`] means the service is not running.
pub fn fetch_schema(shm_dir: &Path) -> Result<Vec<u8>, IccError> {
    let mut reader = RingReader::open(
        shm_dir,
        TELEMETRY_CONFIG_KEY,
        RingConfig::single_slot(),
        StartPosition::Origin,
    )?;
    let message = reader.read(&CancelToken::new())?;
    Ok(message.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn schema_blob_round_trips_through_the_channel() {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("scoria-cfg-{ts}"));
        std::fs::create_dir_all(&dir).unwrap();

        let blob = b"name: backplane\n".to_vec();
        let writer = publish_schema(&dir, &blob).unwrap();

        let fetched = fetch_schema(&dir).unwrap();
        assert_eq!(fetched, blob);

        drop(writer);
        assert!(matches!(
            fetch_schema(&dir),
            Err(IccError::NotReady { .. })
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }
}
