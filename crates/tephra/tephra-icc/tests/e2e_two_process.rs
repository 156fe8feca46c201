//! End-to-end two-process test for the ring transport.
//!
//! The same test executable is re-spawned with role environment variables:
//! a writer process creates the ring and publishes frames at a paced rate
//! while a reader process follows it concurrently, exactly the way the
//! ground-station service and its consumers share a ring in production.

use std::env;
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Writes to stderr with immediate flush to bypass test output capture.
macro_rules! log {
    ($($arg:tt)*) => {{
        let _ = writeln!(std::io::stderr(), $($arg)*);
        let _ = std::io::stderr().flush();
    }};
}

const ENV_ROLE: &str = "TEPHRA_E2E_ROLE";
const ENV_ID: &str = "TEPHRA_E2E_ID";
const ROLE_WRITER: &str = "writer";
const ROLE_READER: &str = "reader";

const FRAME_SIZE: usize = 16;
const FRAME_COUNT: u64 = 50_000;
const WRITER_BATCH: u64 = 500;
const WRITER_BATCH_DELAY_US: u64 = 200;

fn run_writer(identifier: &str) {
    use tephra_icc::{RingConfig, RingWriter};

    let mut writer = RingWriter::create(
        std::path::Path::new("/tmp"),
        identifier,
        FRAME_SIZE,
        RingConfig::telemetry(),
    )
    .expect("writer: failed to create ring");

    log!("[WRITER] ring created, publishing {FRAME_COUNT} frames");
    let start = Instant::now();

    let mut frame = [0u8; FRAME_SIZE];
    for i in 1..=FRAME_COUNT {
        frame[..8].copy_from_slice(&i.to_ne_bytes());
        writer.publish(&frame).expect("writer: publish failed");

        // pace the writer so both processes genuinely run concurrently
        if i % WRITER_BATCH == 0 {
            std::thread::sleep(Duration::from_micros(WRITER_BATCH_DELAY_US));
        }
    }

    // keep the ring alive long enough for the reader to drain the tail
    std::thread::sleep(Duration::from_millis(500));
    log!(
        "[WRITER] done in {:?} ({:.0} frames/s)",
        start.elapsed(),
        FRAME_COUNT as f64 / start.elapsed().as_secs_f64()
    );
}

fn run_reader(identifier: &str) {
    use tephra_icc::{CancelToken, RingConfig, RingReader, StartPosition};

    // retry until the writer has created the file
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut reader = loop {
        match RingReader::open(
            std::path::Path::new("/tmp"),
            identifier,
            RingConfig::telemetry(),
            StartPosition::Origin,
        ) {
            Ok(r) => break r,
            Err(_) if Instant::now() < deadline => {
                std::thread::sleep(Duration::from_millis(1))
            }
            Err(e) => panic!("[READER] failed to open ring: {e}"),
        }
    };
    assert_eq!(reader.frame_size(), FRAME_SIZE);
    log!("[READER] attached");

    let cancel = CancelToken::new();
    let mut frames_read = 0u64;
    let mut missed_total = 0u64;
    let mut last_seq = 0u32;
    let mut last_ts = 0u64;

    while u64::from(last_seq) < FRAME_COUNT {
        let msg = reader.read(&cancel).expect("[READER] read failed");
        assert!(msg.seq > last_seq, "sequence regressed");
        assert!(msg.recv_ts_ns >= last_ts, "capture timestamp regressed");
        let value = u64::from_ne_bytes(msg.payload[..8].try_into().unwrap());
        assert_eq!(value, u64::from(msg.seq), "payload torn");

        last_seq = msg.seq;
        last_ts = msg.recv_ts_ns;
        frames_read += 1;
        missed_total += u64::from(msg.missed);
    }

    assert_eq!(frames_read + missed_total, FRAME_COUNT);
    assert!(frames_read > 0, "reader observed no frames");
    log!(
        "[READER] done: {frames_read} read, {missed_total} missed ({:.1}% coverage)",
        frames_read as f64 / FRAME_COUNT as f64 * 100.0
    );
}

#[test]
fn e2e_two_process_ring() {
    if let Ok(role) = env::var(ENV_ROLE) {
        let identifier = env::var(ENV_ID).expect("TEPHRA_E2E_ID not set");
        match role.as_str() {
            ROLE_WRITER => run_writer(&identifier),
            ROLE_READER => run_reader(&identifier),
            other => panic!("unknown role: {other}"),
        }
        return;
    }

    let identifier = format!("e2e-{}", std::process::id());
    let exe = env::current_exe().expect("failed to get current executable");

    log!("[ORCHESTRATOR] spawning writer + reader for ring '{identifier}'");

    let mut writer_proc = Command::new(&exe)
        .arg("--exact")
        .arg("e2e_two_process_ring")
        .env(ENV_ROLE, ROLE_WRITER)
        .env(ENV_ID, &identifier)
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn writer process");

    // the reader retries open, so a minimal head start suffices
    std::thread::sleep(Duration::from_millis(5));

    let mut reader_proc = Command::new(&exe)
        .arg("--exact")
        .arg("e2e_two_process_ring")
        .env(ENV_ROLE, ROLE_READER)
        .env(ENV_ID, &identifier)
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn reader process");

    let writer_status = writer_proc.wait().expect("failed to wait for writer");
    let reader_status = reader_proc.wait().expect("failed to wait for reader");

    assert!(writer_status.success(), "writer failed: {writer_status}");
    assert!(reader_status.success(), "reader failed: {reader_status}");
    log!("[ORCHESTRATOR] concurrent two-process test passed");
}
