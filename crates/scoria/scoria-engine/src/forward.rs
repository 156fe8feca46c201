//! In-process frame consumer fed by a decommutator's fanout channel.
//!
//! This is the hook the database writer plugs into: it blocks on the
//! channel, renders each measurement with the interpreter's string form
//! (the "safe" representation value-sinks ship), and traces the result.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;
use tephra_icc::CancelToken;
use tephra_tlm::{Schema, TelemetryPacket, interpret_string};
use tracing::{debug, info, warn};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Drain `frames` until cancellation, rendering every measurement of every
/// frame. Runs on its own thread, one per forwarded port.
pub fn run_forwarder(
    schema: &Schema,
    packet: &TelemetryPacket,
    frames: Receiver<Vec<u8>>,
    cancel: &CancelToken,
) {
    let port = packet.port;
    info!(port, packet = %packet.name, "frame forwarder running");

    loop {
        match frames.recv_timeout(RECV_TIMEOUT) {
            Ok(frame) => render_frame(schema, packet, &frame),
            Err(RecvTimeoutError::Timeout) => {
                if cancel.is_cancelled() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(port, "frame forwarder stopped");
}

fn render_frame(schema: &Schema, packet: &TelemetryPacket, frame: &[u8]) {
    for (offset, measurement) in schema.packet_fields(packet) {
        let Some(slice) = frame.get(offset..offset + measurement.size) else {
            warn!(
                packet = %packet.name,
                measurement = %measurement.name,
                "frame shorter than schema layout"
            );
            return;
        };
        match interpret_string(measurement, slice) {
            Ok(value) => {
                debug!(packet = %packet.name, measurement = %measurement.name, %value)
            }
            Err(e) => warn!(
                packet = %packet.name,
                measurement = %measurement.name,
                error = %e,
                "failed to interpret measurement"
            ),
        }
    }
}
