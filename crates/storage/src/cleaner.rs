//! TTL cleanup background task
//!
//! Expired keys in a [`MemoryStore`] are invisible to reads immediately but
//! keep their memory until something removes them. `TTLCleaner` runs in a
//! background thread and periodically purges them.
//!
//! # Design Notes
//!
//! - Runs in background thread, doesn't block writes beyond one purge
//! - Graceful shutdown via atomic flag
//! - Configurable check interval

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::debug;

use crate::MemoryStore;

/// Background TTL cleanup task
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use quarry_storage::{MemoryStore, TTLCleaner};
///
/// let store = MemoryStore::new();
/// let cleaner = TTLCleaner::new(store.clone(), Duration::from_secs(60));
/// let handle = cleaner.start();
///
/// // ... use the store ...
///
/// cleaner.shutdown();
/// handle.join().unwrap();
/// ```
pub struct TTLCleaner {
    /// The store to clean (shares its keyspace with the caller's handle)
    store: MemoryStore,
    /// How often to check for expired keys
    check_interval: Duration,
    /// Shutdown signal
    shutdown: Arc<AtomicBool>,
}

impl TTLCleaner {
    /// Create a new TTL cleaner
    ///
    /// # Arguments
    ///
    /// * `store` - The store to clean
    /// * `check_interval` - How often to check for expired keys
    pub fn new(store: MemoryStore, check_interval: Duration) -> Self {
        Self {
            store,
            check_interval,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the background cleanup task
    ///
    /// Returns a JoinHandle that can be used to wait for the thread to complete.
    /// The thread will run until `shutdown()` is called.
    pub fn start(&self) -> JoinHandle<()> {
        let store = self.store.clone();
        let shutdown = Arc::clone(&self.shutdown);
        let check_interval = self.check_interval;

        thread::spawn(move || {
            while !shutdown.load(Ordering::Relaxed) {
                // Sleep in small slices so shutdown is noticed quickly
                let sleep_interval = Duration::from_millis(100).min(check_interval);
                let mut elapsed = Duration::ZERO;

                while elapsed < check_interval {
                    if shutdown.load(Ordering::Relaxed) {
                        return;
                    }
                    thread::sleep(sleep_interval);
                    elapsed += sleep_interval;
                }

                let purged = store.purge_expired();
                if purged > 0 {
                    debug!(purged, "ttl cleaner removed expired keys");
                }
            }
        })
    }

    /// Signal shutdown (for graceful termination)
    ///
    /// After calling this, the background thread will exit on its next iteration.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown has been signaled
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }
}
