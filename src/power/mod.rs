//! Power - bounded CPU holds and battery checks
//!
//! A [`CpuHold`] wraps the host wake lock with a timer of its own. The host
//! lock is acquired with a timeout too, but the release here does not depend
//! on the host honouring it: the hold is released at `acquired_at + max`
//! whether or not anyone calls [`CpuHold::release`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::platform::{BatteryProbe, PlatformError, WakeLock};

struct HoldInner {
    lock: Arc<dyn WakeLock>,
    tag: String,
    released: AtomicBool,
}

impl HoldInner {
    /// Returns true only for the call that actually released.
    fn release(&self) -> bool {
        if self.released.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.lock.release(&self.tag);
        true
    }
}

/// A CPU wake hold with a mandatory release deadline.
pub struct CpuHold {
    inner: Arc<HoldInner>,
    acquired_at: Instant,
    max_duration: Duration,
    timer: JoinHandle<()>,
}

impl CpuHold {
    /// Acquire the host lock and arm the release timer.
    ///
    /// Fails without touching the lock when no tokio runtime is available,
    /// since the deadline could not be enforced.
    pub fn acquire(lock: Arc<dyn WakeLock>, tag: &str, max_duration: Duration) -> Result<Self, PlatformError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| PlatformError::Unavailable(format!("no runtime for hold timer: {}", e)))?;

        let inner = Arc::new(HoldInner {
            lock,
            tag: tag.to_string(),
            released: AtomicBool::new(false),
        });
        inner.lock.acquire(tag, max_duration);
        let acquired_at = Instant::now();

        let timed = inner.clone();
        let timer = handle.spawn(async move {
            tokio::time::sleep_until(acquired_at + max_duration).await;
            if timed.release() {
                tracing::debug!(tag = %timed.tag, "CPU hold released by timeout");
            }
        });

        tracing::debug!(tag, max_ms = max_duration.as_millis() as u64, "CPU hold acquired");
        Ok(Self { inner, acquired_at, max_duration, timer })
    }

    /// Release early. Idempotent.
    pub fn release(&self) {
        if self.inner.release() {
            self.timer.abort();
            tracing::debug!(tag = %self.inner.tag, "CPU hold released");
        }
    }

    pub fn is_released(&self) -> bool { self.inner.released.load(Ordering::SeqCst) }
    pub fn acquired_at(&self) -> Instant { self.acquired_at }
    pub fn max_duration(&self) -> Duration { self.max_duration }
    pub fn deadline(&self) -> Instant { self.acquired_at + self.max_duration }
}

impl std::fmt::Debug for CpuHold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuHold")
            .field("tag", &self.inner.tag)
            .field("max_duration", &self.max_duration)
            .field("released", &self.is_released())
            .finish()
    }
}

/// True when the probe reports capacity at or below `threshold` percent.
/// Unknown capacity is never treated as low.
pub fn is_battery_low(probe: &dyn BatteryProbe, threshold: u8) -> bool {
    probe.capacity_percent().map_or(false, |level| level <= threshold)
}
