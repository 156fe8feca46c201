//! The decommutator: one task per telemetry packet, UDP in, ring out.

use crate::throttle::Throttle;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};
use std::path::Path;
use std::sync::mpsc::SyncSender;
use std::time::Duration;
use tephra_icc::{CancelToken, IccError, RingConfig, RingWriter};
use tephra_tlm::{Schema, TelemetryPacket};
use tracing::{info, warn};

/// How long one blocking receive lasts before the cancel token is polled.
const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Startup failures of one port task. Anything after startup is either
/// transient (logged, retried) or shutdown.
#[derive(Debug, thiserror::Error)]
pub enum DecomError {
    #[error("creating the ring for port {port} failed")]
    Ring {
        port: u16,
        #[source]
        source: IccError,
    },

    #[error("binding UDP port {port} failed")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
}

/// The UDP-receive-and-publish task for one telemetry packet.
///
/// Owns the ring writer and the socket for its entire run; dropping it
/// (normally at the end of [`Decommutator::run`]) closes the socket and
/// unlinks the ring file.
pub struct Decommutator {
    packet: TelemetryPacket,
    frame_size: usize,
    writer: RingWriter,
    socket: UdpSocket,
}

impl Decommutator {
    /// Create the ring keyed by the packet's port and bind its UDP socket.
    pub fn new(
        shm_dir: &Path,
        schema: &Schema,
        packet: TelemetryPacket,
    ) -> Result<Self, DecomError> {
        let port = packet.port;
        let frame_size = schema.packet_frame_size(&packet);

        let writer = RingWriter::create(
            shm_dir,
            &port.to_string(),
            frame_size,
            RingConfig::telemetry(),
        )
        .map_err(|source| DecomError::Ring { port, source })?;

        let socket = bind_udp(port).map_err(|source| DecomError::Bind { port, source })?;

        info!(port, frame_size, packet = %packet.name, "decommutator listening");
        Ok(Self {
            packet,
            frame_size,
            writer,
            socket,
        })
    }

    pub fn port(&self) -> u16 {
        self.packet.port
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Receive datagrams until cancellation.
    ///
    /// Every datagram of exactly frame size is stamped and published into
    /// the ring; if `fanout` is supplied, a copy is offered to the
    /// in-process consumer without blocking (the ring is the canonical
    /// path, so a slow local consumer just misses the copy). Anything of
    /// the wrong size is dropped with a rate-limited warning.
    pub fn run(mut self, cancel: &CancelToken, fanout: Option<SyncSender<Vec<u8>>>) {
        let port = self.packet.port;
        let mut buf = vec![0u8; self.frame_size];
        let mut short_warn = Throttle::per_second();
        let mut recv_warn = Throttle::per_second();

        while !cancel.is_cancelled() {
            match self.socket.recv_from(&mut buf) {
                Ok((n, _)) if n == self.frame_size => {
                    if let Err(e) = self.writer.publish(&buf) {
                        // publish only fails on a frame-size mismatch,
                        // which the receive guard already rules out
                        warn!(port, error = %e, "ring publish failed");
                        continue;
                    }
                    if let Some(tx) = &fanout {
                        let _ = tx.try_send(buf.clone());
                    }
                }
                Ok((n, _)) => {
                    if let Some(suppressed) = short_warn.allow() {
                        warn!(
                            port,
                            expected = self.frame_size,
                            received = n,
                            suppressed,
                            "dropped datagram of incorrect size"
                        );
                    }
                }
                Err(e) if is_timeout(&e) => {
                    // receive slice elapsed; loop to poll the cancel token
                }
                Err(e) => {
                    if cancel.is_cancelled() {
                        break;
                    }
                    if let Some(suppressed) = recv_warn.allow() {
                        warn!(port, error = %e, suppressed, "UDP receive failed");
                    }
                }
            }
        }

        info!(port, "decommutator stopped");
        // drop order: socket closes, writer unlinks the ring file
    }
}

fn bind_udp(port: u16) -> io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    // no SO_REUSEADDR: a second service instance must fail the bind
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket.bind(&addr.into())?;
    let socket: UdpSocket = socket.into();
    // bounded receive so shutdown is observed without closing the socket
    // from another thread
    socket.set_read_timeout(Some(RECV_TIMEOUT))?;
    Ok(socket)
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
