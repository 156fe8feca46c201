/// Returns the current wall-clock time in nanoseconds since the Unix epoch.
/// This is the capture timestamp stamped on every slot; consumers compare
/// it against their own clocks, so it must be epoch-based, not monotonic.
#[inline(always)]
#[cfg(unix)]
pub fn epoch_ns() -> u64 {
    let mut ts: libc::timespec = unsafe { core::mem::zeroed() };
    unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut ts) };
    ts.tv_sec as u64 * 1_000_000_000 + ts.tv_nsec as u64
}

#[inline(always)]
#[cfg(not(unix))]
pub fn epoch_ns() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
