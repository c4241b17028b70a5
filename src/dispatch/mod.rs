//! AlarmDispatcher - wake fired, hand off to the countdown under a CPU hold
//!
//! ```text
//! WakePayload
//!     │
//!     ├── target_ms == 0? ──► DispatchError::InvalidTarget (dropped)
//!     │
//!     ├── release previous hold (never nested)
//!     ├── CpuHold::acquire(max 10s)     ← before anything else
//!     ├── foreground = true
//!     └── coordinator.start(ImmediateFire)
//!
//! return. The hold's own deadline releases it.
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::core::paths::ids;
use crate::core::WakePayload;
use crate::countdown::{CountdownCoordinator, CountdownMode, Foreground};
use crate::platform::{PlatformError, WakeLock};
use crate::power::CpuHold;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("Wake fired without a target instant")]
    InvalidTarget,
    #[error("No pending wake matches the fired payload")]
    Stale,
    #[error("CPU hold unavailable: {0}")]
    Hold(#[from] PlatformError),
}

pub struct AlarmDispatcher {
    wake_lock: Arc<dyn WakeLock>,
    coordinator: Arc<CountdownCoordinator>,
    foreground: Foreground,
    hold_max: Duration,
    default_label: String,
    hold: Mutex<Option<CpuHold>>,
}

impl AlarmDispatcher {
    pub fn new(
        wake_lock: Arc<dyn WakeLock>,
        coordinator: Arc<CountdownCoordinator>,
        foreground: Foreground,
        hold_max: Duration,
        default_label: impl Into<String>,
    ) -> Self {
        Self {
            wake_lock,
            coordinator,
            foreground,
            hold_max,
            default_label: default_label.into(),
            hold: Mutex::new(None),
        }
    }

    /// Handle one fired wake. Returns the label the countdown was started with.
    ///
    /// A missing CPU hold is logged and the dispatch proceeds: losing the
    /// alert is worse than running it without the hold.
    pub fn dispatch(&self, payload: &WakePayload) -> Result<String, DispatchError> {
        if payload.target_ms == 0 {
            tracing::warn!(label = ?payload.label, "Wake fired without target, dispatch dropped");
            return Err(DispatchError::InvalidTarget);
        }

        if let Err(e) = self.acquire_hold() {
            tracing::warn!(error = %e, "Dispatching without CPU hold");
        }

        let label = payload
            .label
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.default_label.as_str())
            .to_string();

        self.foreground.set(true);
        tracing::info!(label = %label, target_ms = payload.target_ms, "Alarm fired");
        self.coordinator.start(payload.target_ms, &label, CountdownMode::ImmediateFire);
        Ok(label)
    }

    fn acquire_hold(&self) -> Result<(), DispatchError> {
        let mut slot = self.hold.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = slot.take() {
            previous.release();
        }
        *slot = Some(CpuHold::acquire(self.wake_lock.clone(), ids::WAKE_LOCK_TAG, self.hold_max)?);
        Ok(())
    }

    /// True while the most recent hold is still unreleased.
    pub fn hold_active(&self) -> bool {
        self.hold
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map_or(false, |hold| !hold.is_released())
    }
}
