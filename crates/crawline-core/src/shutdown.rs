//! Graceful shutdown via atomic flag + signal registration

use std::sync::atomic::{AtomicBool, Ordering};

/// Global shutdown flag, checked by the driver once per record.
pub fn shutdown_flag() -> &'static AtomicBool {
    static FLAG: AtomicBool = AtomicBool::new(false);
    &FLAG
}

pub fn is_shutdown_requested() -> bool {
    shutdown_flag().load(Ordering::Relaxed)
}

pub fn request_shutdown() {
    shutdown_flag().store(true, Ordering::Relaxed);
}

/// Register SIGINT/SIGTERM handlers that request shutdown.
///
/// The driver then drives the ABORTING path: completed shards are still
/// finalized and renamed instead of leaving temp files behind.
pub fn install_signal_handlers() -> std::io::Result<()> {
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        // storing an atomic is async-signal-safe
        unsafe {
            signal_hook::low_level::register(signal, request_shutdown)?;
        }
    }
    Ok(())
}
