//! Clock abstraction for expiration and retransmission timing.
//!
//! The engine only ever needs whole seconds since the Unix epoch. A failed
//! reading is reported to the caller through the `UNRELIABLE_TIME` flag and
//! processing continues, so `now` returns a `Result` rather than panicking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::ClockError;
use crate::types::BpVal;

/// Source of the current time in whole seconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> Result<BpVal, ClockError>;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<BpVal, ClockError> {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .map_err(|_| ClockError)
    }
}

/// A settable clock for deterministic tests.
///
/// Cloning shares the underlying time source, so a test can hold one handle
/// and advance the time observed by a channel holding the other.
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    secs: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(secs: BpVal) -> Self {
        Self {
            secs: Arc::new(AtomicU64::new(secs)),
        }
    }

    /// Set the absolute time.
    pub fn set(&self, secs: BpVal) {
        self.secs.store(secs, Ordering::SeqCst);
    }

    /// Move the clock forward.
    pub fn advance(&self, secs: BpVal) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Result<BpVal, ClockError> {
        Ok(self.secs.load(Ordering::SeqCst))
    }
}
