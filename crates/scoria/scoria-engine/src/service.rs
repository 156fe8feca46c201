//! Service lifecycle: schema load, config-channel publish, task spawn,
//! shutdown.

use crate::config_channel::publish_schema;
use crate::decom::{DecomError, Decommutator};
use crate::forward::run_forwarder;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::sync_channel;
use std::thread::JoinHandle;
use tephra_icc::{CancelToken, IccError, RingWriter};
use tephra_tlm::{Schema, SchemaError};
use tracing::{error, info};

/// Depth of each port's in-process fanout channel. The ring is the
/// canonical path; this only buffers the local consumer.
const FANOUT_DEPTH: usize = 64;

/// Unrecoverable startup failures. Everything here exits the service with
/// a non-zero status before any task runs for long.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("telemetry schema is invalid")]
    Schema(#[from] SchemaError),

    #[error("publishing the schema to shared memory failed")]
    ConfigChannel(#[from] IccError),

    #[error(transparent)]
    Decom(#[from] DecomError),

    #[error("spawning a task thread failed")]
    Spawn(#[source] std::io::Error),
}

/// A running ground-station service: one decommutator per schema packet,
/// optional per-port frame forwarders, and the live config channel.
#[derive(Debug)]
pub struct Service {
    cancel: CancelToken,
    handles: Vec<JoinHandle<()>>,
    /// Keeps the schema ring alive (and its file present) until shutdown.
    _config_writer: RingWriter,
    shm_dir: PathBuf,
}

impl Service {
    /// Validate the schema, publish it over the config channel, and spawn
    /// every port task. `forward_frames` additionally attaches an
    /// in-process forwarder to each decommutator's fanout channel.
    pub fn start(
        shm_dir: &Path,
        schema_yaml: &[u8],
        cancel: CancelToken,
        forward_frames: bool,
    ) -> Result<Self, ServiceError> {
        let schema = Arc::new(Schema::from_yaml(schema_yaml)?);
        log_packet_catalog(&schema);

        let config_writer = publish_schema(shm_dir, schema_yaml)?;
        info!(schema = %schema.name, shm_dir = %shm_dir.display(), "schema published to config channel");

        // If a later port fails to start (EADDRINUSE from a racing
        // instance, an unwritable shm dir), the tasks already running must
        // be stopped and joined so every writer unlinks its ring file.
        let mut handles = Vec::new();
        if let Err(e) =
            spawn_port_tasks(shm_dir, &schema, &cancel, forward_frames, &mut handles)
        {
            cancel.cancel();
            for handle in handles {
                if let Err(panic) = handle.join() {
                    error!(?panic, "task panicked during startup unwind");
                }
            }
            return Err(e);
        }

        Ok(Self {
            cancel,
            handles,
            _config_writer: config_writer,
            shm_dir: shm_dir.to_path_buf(),
        })
    }

    /// Trip the cancel token and join every task. Each decommutator drops
    /// its writer on exit, unlinking its ring file; the config channel
    /// file is unlinked when the service itself drops.
    pub fn shutdown(self) {
        info!("shutting down");
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(panic) = handle.join() {
                error!(?panic, "task panicked during shutdown");
            }
        }
        info!(shm_dir = %self.shm_dir.display(), "all tasks stopped");
    }
}

/// Spawn one decommutator (and optionally one forwarder) per schema
/// packet, collecting every handle into `handles` as it goes so the caller
/// can stop and join them even when a later packet fails.
fn spawn_port_tasks(
    shm_dir: &Path,
    schema: &Arc<Schema>,
    cancel: &CancelToken,
    forward_frames: bool,
    handles: &mut Vec<JoinHandle<()>>,
) -> Result<(), ServiceError> {
    for packet in &schema.telemetry_packets {
        let decom = Decommutator::new(shm_dir, schema, packet.clone())?;

        let fanout = if forward_frames {
            let (tx, rx) = sync_channel::<Vec<u8>>(FANOUT_DEPTH);
            let schema = Arc::clone(schema);
            let packet = packet.clone();
            let cancel = cancel.clone();
            handles.push(
                std::thread::Builder::new()
                    .name(format!("forward-{}", packet.port))
                    .spawn(move || run_forwarder(&schema, &packet, rx, &cancel))
                    .map_err(ServiceError::Spawn)?,
            );
            Some(tx)
        } else {
            None
        };

        let task_cancel = cancel.clone();
        handles.push(
            std::thread::Builder::new()
                .name(format!("decom-{}", packet.port))
                .spawn(move || decom.run(&task_cancel, fanout))
                .map_err(ServiceError::Spawn)?,
        );
    }
    Ok(())
}

/// Startup visibility: the parsed packet catalog, one line per packet and
/// measurement.
fn log_packet_catalog(schema: &Schema) {
    info!(schema = %schema.name, packets = schema.telemetry_packets.len(), "telemetry packet catalog");
    for packet in &schema.telemetry_packets {
        info!(
            packet = %packet.name,
            port = packet.port,
            frame_size = schema.packet_frame_size(packet),
            "packet"
        );
        for (offset, measurement) in schema.packet_fields(packet) {
            info!(offset, "  {measurement}");
        }
    }
}
