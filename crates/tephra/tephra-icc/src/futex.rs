//! Linux futex wrapper for cross-process sleep/wake on the ring counter.
//!
//! Uses `FUTEX_WAIT` / `FUTEX_WAKE`, not the `_PRIVATE` variants: the word
//! lives in a shared mapping and the waiters are other processes. The
//! `_PRIVATE` forms would silently fail to wake them.

#[cfg(target_os = "linux")]
use std::ptr;
use std::sync::atomic::AtomicU32;
use std::time::Duration;

#[cfg(target_os = "linux")]
const FUTEX_WAIT: libc::c_int = 0;
#[cfg(target_os = "linux")]
const FUTEX_WAKE: libc::c_int = 1;

/// Sleep until `addr` no longer holds `expected`, a wake arrives, or the
/// timeout expires. Compare-and-sleep: the kernel refuses to park the caller
/// if the value has already moved (`EAGAIN`), so a publish between the
/// caller's load and the syscall is never missed.
///
/// Returns the raw syscall result; callers treat every return as "go look
/// at the word again".
#[cfg(target_os = "linux")]
pub fn wait(addr: &AtomicU32, expected: u32, timeout: Option<Duration>) -> i32 {
    let ts = timeout.map(|d| libc::timespec {
        tv_sec: d.as_secs() as libc::time_t,
        tv_nsec: d.subsec_nanos() as libc::c_long,
    });
    let ts_ptr = ts
        .as_ref()
        .map_or(ptr::null(), |t| t as *const libc::timespec);

    // SAFETY: addr outlives the call and the remaining arguments are unused
    // by FUTEX_WAIT.
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            addr as *const AtomicU32 as *const u32,
            FUTEX_WAIT,
            expected,
            ts_ptr,
            ptr::null::<u32>(),
            0i32,
        ) as i32
    }
}

/// Wake every process sleeping on `addr`.
#[cfg(target_os = "linux")]
pub fn wake_all(addr: &AtomicU32) -> i32 {
    // SAFETY: addr outlives the call.
    unsafe {
        libc::syscall(
            libc::SYS_futex,
            addr as *const AtomicU32 as *const u32,
            FUTEX_WAKE,
            libc::c_int::MAX,
            ptr::null::<libc::timespec>(),
            ptr::null::<u32>(),
            0i32,
        ) as i32
    }
}

// Non-Linux fallback so the workspace builds and unit tests run elsewhere.
// Readers poll at the timeout slice instead of sleeping on the word.
#[cfg(not(target_os = "linux"))]
pub fn wait(_addr: &AtomicU32, _expected: u32, timeout: Option<Duration>) -> i32 {
    let nap = timeout.unwrap_or(Duration::from_millis(1));
    std::thread::sleep(nap.min(Duration::from_millis(10)));
    0
}

#[cfg(not(target_os = "linux"))]
pub fn wake_all(_addr: &AtomicU32) -> i32 {
    0
}
