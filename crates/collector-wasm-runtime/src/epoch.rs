//! Background epoch ticker.
//!
//! Guest code only yields back to the host at epoch boundaries, so a
//! guest stuck in a loop is interruptible by `tokio::time::timeout` only
//! while something keeps advancing the engine's epoch.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;
use wasmtime::Engine;

/// Interval between epoch increments.
pub const EPOCH_TICK: Duration = Duration::from_millis(10);

/// Thread incrementing an engine's epoch every [`EPOCH_TICK`].
///
/// Stopped and joined on drop.
#[derive(Debug)]
pub struct EpochTicker {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl EpochTicker {
    /// Starts ticking `engine`.
    pub fn spawn(engine: Engine) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle = {
            let shutdown = Arc::clone(&shutdown);
            std::thread::Builder::new()
                .name("collector-epoch".to_string())
                .spawn(move || {
                    while !shutdown.load(Ordering::Relaxed) {
                        std::thread::sleep(EPOCH_TICK);
                        engine.increment_epoch();
                    }
                })
        };

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(
                    "Failed to start epoch ticker, guest loops cannot be interrupted: {}",
                    e
                );
                None
            }
        };

        Self { shutdown, handle }
    }

    /// Whether the ticker thread is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for EpochTicker {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(Err(_)) = self.handle.take().map(JoinHandle::join) {
            tracing::warn!("Epoch ticker thread panicked");
        }
    }
}
