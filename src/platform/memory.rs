//! In-memory host that records every call.
//!
//! Used by unit and integration tests. Pair with
//! `#[tokio::test(start_paused = true)]`: [`PausedClock`] derives wall time
//! from tokio's clock, so `tokio::time::advance` moves both together.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use super::{
    AlertSound, BatteryProbe, Clock, NotificationChannel, Notifier, Platform, PlatformError,
    WakeLock, WakeTimer,
};
use crate::countdown::NotificationView;
use crate::scheduler::{WakePrecision, WakeRequest};

/// Wall clock pinned to tokio's (possibly paused) clock.
#[derive(Debug)]
pub struct PausedClock {
    anchor_ms: i64,
    anchor: Instant,
}

impl PausedClock {
    pub fn new(anchor_ms: i64) -> Self { Self { anchor_ms, anchor: Instant::now() } }
}

impl Clock for PausedClock {
    fn now_ms(&self) -> i64 {
        self.anchor_ms + Instant::now().duration_since(self.anchor).as_millis() as i64
    }
}

#[derive(Default)]
struct TimerLog {
    active: Option<WakeRequest>,
    registrations: Vec<WakeRequest>,
    cancels: usize,
}

#[derive(Default)]
pub struct RecordingWakeTimer {
    log: Mutex<TimerLog>,
    deny_exact: AtomicBool,
    fail_all: AtomicBool,
}

impl RecordingWakeTimer {
    pub fn new() -> Self { Self::default() }

    /// Simulate the user revoking the exact alarm permission.
    pub fn deny_exact(&self, deny: bool) { self.deny_exact.store(deny, Ordering::SeqCst); }
    /// Simulate a host with no alarm service at all.
    pub fn fail_all(&self, fail: bool) { self.fail_all.store(fail, Ordering::SeqCst); }

    pub fn active(&self) -> Option<WakeRequest> { self.log.lock().unwrap_or_else(|p| p.into_inner()).active.clone() }
    pub fn registrations(&self) -> Vec<WakeRequest> { self.log.lock().unwrap_or_else(|p| p.into_inner()).registrations.clone() }
    pub fn cancels(&self) -> usize { self.log.lock().unwrap_or_else(|p| p.into_inner()).cancels }
    pub fn live_count(&self) -> usize { usize::from(self.active().is_some()) }

    fn register(&self, request: &WakeRequest, precision: WakePrecision) -> Result<(), PlatformError> {
        if self.fail_all.load(Ordering::SeqCst) {
            return Err(PlatformError::Unavailable("alarm service missing".into()));
        }
        if precision == WakePrecision::Exact && self.deny_exact.load(Ordering::SeqCst) {
            return Err(PlatformError::PermissionDenied);
        }
        let mut log = self.log.lock().unwrap_or_else(|p| p.into_inner());
        let request = WakeRequest { precision, ..request.clone() };
        log.registrations.push(request.clone());
        log.active = Some(request);
        Ok(())
    }
}

impl WakeTimer for RecordingWakeTimer {
    fn set_exact(&self, request: &WakeRequest) -> Result<(), PlatformError> {
        self.register(request, WakePrecision::Exact)
    }

    fn set_inexact(&self, request: &WakeRequest) -> Result<(), PlatformError> {
        self.register(request, WakePrecision::Inexact)
    }

    fn cancel(&self, request_id: u32) {
        let mut log = self.log.lock().unwrap_or_else(|p| p.into_inner());
        log.cancels += 1;
        if log.active.as_ref().map_or(false, |r| r.request_id == request_id) {
            log.active = None;
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    shown: Mutex<Vec<NotificationView>>,
    channels: Mutex<Vec<NotificationChannel>>,
    dismissed: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self { Self::default() }
    pub fn shown(&self) -> Vec<NotificationView> { self.shown.lock().unwrap_or_else(|p| p.into_inner()).clone() }
    pub fn last(&self) -> Option<NotificationView> { self.shown().pop() }
    pub fn channels(&self) -> Vec<NotificationChannel> { self.channels.lock().unwrap_or_else(|p| p.into_inner()).clone() }
    pub fn dismissed(&self) -> usize { self.dismissed.load(Ordering::SeqCst) }
}

impl Notifier for RecordingNotifier {
    fn ensure_channel(&self, channel: &NotificationChannel) {
        self.channels.lock().unwrap_or_else(|p| p.into_inner()).push(channel.clone());
    }

    fn show(&self, _id: u32, view: &NotificationView) {
        self.shown.lock().unwrap_or_else(|p| p.into_inner()).push(view.clone());
    }

    fn dismiss(&self, _id: u32) {
        self.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct RecordingSound {
    played: Mutex<Vec<String>>,
}

impl RecordingSound {
    pub fn new() -> Self { Self::default() }
    pub fn played(&self) -> Vec<String> { self.played.lock().unwrap_or_else(|p| p.into_inner()).clone() }
}

impl AlertSound for RecordingSound {
    fn play(&self, label: &str) {
        self.played.lock().unwrap_or_else(|p| p.into_inner()).push(label.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeLockEvent {
    Acquired { tag: String, timeout: Duration, at: Instant },
    Released { tag: String, at: Instant },
}

#[derive(Default)]
pub struct RecordingWakeLock {
    events: Mutex<Vec<WakeLockEvent>>,
}

impl RecordingWakeLock {
    pub fn new() -> Self { Self::default() }
    pub fn events(&self) -> Vec<WakeLockEvent> { self.events.lock().unwrap_or_else(|p| p.into_inner()).clone() }

    pub fn release_count(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, WakeLockEvent::Released { .. })).count()
    }

    /// Acquisitions not yet matched by a release.
    pub fn held(&self) -> usize {
        let acquired = self.events().iter().filter(|e| matches!(e, WakeLockEvent::Acquired { .. })).count();
        acquired.saturating_sub(self.release_count())
    }
}

impl WakeLock for RecordingWakeLock {
    fn acquire(&self, tag: &str, timeout: Duration) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).push(WakeLockEvent::Acquired {
            tag: tag.to_string(),
            timeout,
            at: Instant::now(),
        });
    }

    fn release(&self, tag: &str) {
        self.events.lock().unwrap_or_else(|p| p.into_inner()).push(WakeLockEvent::Released {
            tag: tag.to_string(),
            at: Instant::now(),
        });
    }
}

#[derive(Debug, Default)]
pub struct FixedBattery {
    level: Mutex<Option<u8>>,
}

impl FixedBattery {
    pub fn new(level: Option<u8>) -> Self { Self { level: Mutex::new(level) } }
    pub fn set(&self, level: Option<u8>) { *self.level.lock().unwrap_or_else(|p| p.into_inner()) = level; }
}

impl BatteryProbe for FixedBattery {
    fn capacity_percent(&self) -> Option<u8> { *self.level.lock().unwrap_or_else(|p| p.into_inner()) }
}

/// Every recording collaborator, kept typed so tests can inspect them.
pub struct MemoryHost {
    pub clock: Arc<PausedClock>,
    pub wake_timer: Arc<RecordingWakeTimer>,
    pub notifier: Arc<RecordingNotifier>,
    pub sound: Arc<RecordingSound>,
    pub wake_lock: Arc<RecordingWakeLock>,
    pub battery: Arc<FixedBattery>,
}

impl MemoryHost {
    /// Host whose wall clock reads `now_ms` at construction.
    pub fn new(now_ms: i64) -> Self {
        Self {
            clock: Arc::new(PausedClock::new(now_ms)),
            wake_timer: Arc::new(RecordingWakeTimer::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            sound: Arc::new(RecordingSound::new()),
            wake_lock: Arc::new(RecordingWakeLock::new()),
            battery: Arc::new(FixedBattery::new(Some(80))),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            clock: self.clock.clone(),
            wake_timer: self.wake_timer.clone(),
            notifier: self.notifier.clone(),
            sound: self.sound.clone(),
            wake_lock: self.wake_lock.clone(),
            battery: self.battery.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn paused_clock_follows_tokio_time() {
        let clock = PausedClock::new(1_000);
        tokio::time::advance(Duration::from_millis(2_500)).await;
        assert_eq!(clock.now_ms(), 3_500);
    }

    #[test]
    fn timer_cancel_only_matching_id() {
        let timer = RecordingWakeTimer::new();
        timer.set_exact(&WakeRequest::new(10, "Subuh")).unwrap();
        timer.cancel(1);
        assert!(timer.active().is_some());
        timer.cancel(crate::core::paths::ids::WAKE_REQUEST);
        assert!(timer.active().is_none());
        assert_eq!(timer.cancels(), 2);
    }
}
