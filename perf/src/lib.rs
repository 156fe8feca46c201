//! Shared helpers for the transport and interpreter benches.

use std::time::{SystemTime, UNIX_EPOCH};

/// Unique ring identifier so concurrent bench runs never share a file.
pub fn bench_identifier(tag: &str) -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("bench-{tag}-{}-{ts}", std::process::id())
}

/// A deterministic frame payload of the given size.
pub fn sample_frame(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}
