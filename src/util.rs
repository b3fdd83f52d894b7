use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();

/// Install the process-wide fmt subscriber (RUST_LOG, default `info`).
/// Only the binary calls this; the library just emits `tracing` events.
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// Return true for transient I/O errors often seen on Windows when filter drivers
/// (AV/backup), network volumes, or sharing violations get in the way.
#[cfg(windows)]
fn is_retriable_io_error(e: &io::Error) -> bool {
    match e.raw_os_error() {
        //   5   = Access is denied (often AV/share)
        //   32  = Sharing violation
        //   33  = Lock violation
        //   21  = Device not ready
        //   1117= I/O device error
        Some(5) | Some(32) | Some(33) | Some(21) | Some(1117) => true,
        _ => false,
    }
}

/// Elsewhere the same raw numbers mean permanent failures (EIO, EISDIR); fail on the first try.
#[cfg(not(windows))]
fn is_retriable_io_error(_e: &io::Error) -> bool {
    false
}

/// Create (truncate) a file with retries/backoff for transient errors.
pub fn create_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<File> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match File::create(path) {
            Ok(f) => return Ok(f),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "create failed")))
}

/// Remove a file with retries/backoff for transient errors.
/// Returns `Ok(false)` when there was nothing to remove.
pub fn remove_with_backoff(path: &Path, tries: usize, delay_ms: u64) -> io::Result<bool> {
    let mut last_err: Option<io::Error> = None;
    for i in 0..tries.max(1) {
        match fs::remove_file(path) {
            Ok(()) => return Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) if is_retriable_io_error(&e) => {
                last_err = Some(e);
                sleep(Duration::from_millis(delay_ms.saturating_mul((i + 1) as u64)));
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, "remove failed")))
}
