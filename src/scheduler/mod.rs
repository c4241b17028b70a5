//! WakeScheduler - one deferred wake, replaced on every schedule
//!
//! ```text
//! schedule(target, label)
//!     │
//!     ├── cancel(WAKE_REQUEST)          ← old registration gone first
//!     │
//!     ├── set_exact(request) ── Ok ───► pending = (request, Exact)
//!     │        │
//!     │   PermissionDenied
//!     │        ▼
//!     └── set_inexact(request) ─ Ok ──► pending = (request, Inexact)
//!              │
//!           Err(_) ──► logged, pending = None
//! ```
//!
//! Nothing here returns an error to the caller. A denied exact alarm is the
//! expected degraded mode on hosts where the user revoked the permission.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::core::paths::ids;
use crate::core::WakePayload;
use crate::platform::{PlatformError, WakeTimer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakePrecision {
    Exact,
    Inexact,
}

/// The single outstanding wake registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakeRequest {
    pub target_ms: i64,
    pub label: String,
    pub request_id: u32,
    pub precision: WakePrecision,
}

impl WakeRequest {
    pub fn new(target_ms: i64, label: impl Into<String>) -> Self {
        Self {
            target_ms,
            label: label.into(),
            request_id: ids::WAKE_REQUEST,
            precision: WakePrecision::Exact,
        }
    }
}

pub struct WakeScheduler {
    timer: Arc<dyn WakeTimer>,
    pending: Mutex<Option<WakeRequest>>,
}

impl WakeScheduler {
    pub fn new(timer: Arc<dyn WakeTimer>) -> Self {
        Self { timer, pending: Mutex::new(None) }
    }

    /// Replace any pending wake with one for `target_ms`.
    /// Targets in the past are registered as-is; the host fires them at once.
    pub fn schedule(&self, target_ms: i64, label: &str) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        self.timer.cancel(ids::WAKE_REQUEST);
        *pending = None;

        let mut request = WakeRequest::new(target_ms, label);
        match self.timer.set_exact(&request) {
            Ok(()) => {
                tracing::info!(label, target_ms, "Wake scheduled (exact, CPU sleeps until target)");
                *pending = Some(request);
            }
            Err(PlatformError::PermissionDenied) => {
                tracing::warn!(label, target_ms, "Exact alarm denied, falling back to inexact wake");
                request.precision = WakePrecision::Inexact;
                match self.timer.set_inexact(&request) {
                    Ok(()) => *pending = Some(request),
                    Err(e) => tracing::error!(label, error = %e, "Inexact wake registration failed"),
                }
            }
            Err(e) => tracing::error!(label, error = %e, "Wake registration failed"),
        }
    }

    /// Drop the pending wake, if any.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        if pending.take().is_some() {
            tracing::debug!("Pending wake cancelled");
        }
        self.timer.cancel(ids::WAKE_REQUEST);
    }

    pub fn pending(&self) -> Option<WakeRequest> {
        self.pending.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }

    /// Consume the pending request when the host reports it fired.
    ///
    /// The payload must carry the pending target instant, and its label when
    /// it has one. Anything else is a wake from a cancelled or replaced
    /// registration and leaves the slot untouched.
    pub fn take_fired(&self, payload: &WakePayload) -> Option<WakeRequest> {
        let mut pending = self.pending.lock().unwrap_or_else(|p| p.into_inner());
        let matches = pending.as_ref().map_or(false, |req| {
            req.target_ms == payload.target_ms
                && payload
                    .label
                    .as_deref()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map_or(true, |l| l == req.label)
        });
        if matches { pending.take() } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::RecordingWakeTimer;

    fn scheduler() -> (Arc<RecordingWakeTimer>, WakeScheduler) {
        let timer = Arc::new(RecordingWakeTimer::new());
        let scheduler = WakeScheduler::new(timer.clone());
        (timer, scheduler)
    }

    #[test]
    fn schedule_registers_exact() {
        let (timer, scheduler) = scheduler();
        scheduler.schedule(5_000, "Dzuhur");

        let pending = scheduler.pending().unwrap();
        assert_eq!(pending.label, "Dzuhur");
        assert_eq!(pending.precision, WakePrecision::Exact);
        assert_eq!(timer.active().unwrap(), pending);
    }

    #[test]
    fn second_schedule_replaces_first() {
        let (timer, scheduler) = scheduler();
        scheduler.schedule(5_000, "Ashar");
        scheduler.schedule(9_000, "Maghrib");

        let pending = scheduler.pending().unwrap();
        assert_eq!((pending.target_ms, pending.label.as_str()), (9_000, "Maghrib"));
        assert_eq!(timer.active().unwrap().label, "Maghrib");
        assert_eq!(timer.live_count(), 1);
    }

    #[test]
    fn denied_exact_falls_back_to_inexact() {
        let (timer, scheduler) = scheduler();
        timer.deny_exact(true);
        scheduler.schedule(5_000, "Subuh");

        let pending = scheduler.pending().unwrap();
        assert_eq!(pending.precision, WakePrecision::Inexact);
        assert_eq!(timer.active().unwrap().precision, WakePrecision::Inexact);
    }

    #[test]
    fn unavailable_host_leaves_slot_empty() {
        let (timer, scheduler) = scheduler();
        timer.fail_all(true);
        scheduler.schedule(5_000, "Isya");
        assert!(scheduler.pending().is_none());
    }

    #[test]
    fn cancel_is_idempotent() {
        let (timer, scheduler) = scheduler();
        scheduler.cancel();
        scheduler.schedule(5_000, "Isya");
        scheduler.cancel();
        scheduler.cancel();
        assert!(scheduler.pending().is_none());
        assert!(timer.active().is_none());
    }

    #[test]
    fn take_fired_consumes_once() {
        let (_timer, scheduler) = scheduler();
        scheduler.schedule(5_000, "Isya");
        let payload = WakePayload::new("Isya", 5_000);
        assert!(scheduler.take_fired(&payload).is_some());
        assert!(scheduler.take_fired(&payload).is_none());
    }

    #[test]
    fn take_fired_accepts_lost_label() {
        let (_timer, scheduler) = scheduler();
        scheduler.schedule(5_000, "Isya");
        let fired = scheduler.take_fired(&WakePayload { label: None, target_ms: 5_000 });
        assert_eq!(fired.map(|r| r.label).as_deref(), Some("Isya"));
    }

    #[test]
    fn stale_wake_leaves_newer_request() {
        let (_timer, scheduler) = scheduler();
        scheduler.schedule(5_000, "Ashar");
        scheduler.schedule(60_000, "Maghrib");

        assert!(scheduler.take_fired(&WakePayload::new("Ashar", 5_000)).is_none());
        assert!(scheduler.take_fired(&WakePayload::new("Ashar", 60_000)).is_none());
        assert_eq!(scheduler.pending().unwrap().label, "Maghrib");
    }
}
