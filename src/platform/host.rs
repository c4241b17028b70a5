//! In-process host backed by tokio timers and tracing output.
//!
//! Used by the CLI and the HTTP server when no OS alarm service sits
//! underneath. The wake timer sleeps on a tokio task and delivers
//! [`ServiceEvent::WakeFired`] into the service's event loop, so the rest of
//! the pipeline runs exactly as it would behind a real alarm broadcast.
//! The process has to stay alive for the wake to fire.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::{
    AlertSound, BatteryProbe, Clock, NotificationChannel, Notifier, Platform, PlatformError,
    SystemClock, WakeLock, WakeTimer,
};
use crate::core::{ServiceEvent, WakePayload};
use crate::countdown::NotificationView;
use crate::runtime::EventSender;
use crate::scheduler::WakeRequest;

pub struct TokioWakeTimer {
    events: EventSender,
    clock: Arc<dyn Clock>,
    exact_allowed: AtomicBool,
    armed: Mutex<Option<(u32, JoinHandle<()>)>>,
}

impl TokioWakeTimer {
    pub fn new(events: EventSender, clock: Arc<dyn Clock>) -> Self {
        Self { events, clock, exact_allowed: AtomicBool::new(true), armed: Mutex::new(None) }
    }

    /// Toggle the exact-alarm permission, as a user would in system settings.
    pub fn set_exact_allowed(&self, allowed: bool) { self.exact_allowed.store(allowed, Ordering::SeqCst); }

    fn arm(&self, request: &WakeRequest) -> Result<(), PlatformError> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| PlatformError::Unavailable(e.to_string()))?;
        let delay = Duration::from_millis(request.target_ms.saturating_sub(self.clock.now_ms()).max(0) as u64);
        let events = self.events.clone();
        let payload = WakePayload::new(request.label.clone(), request.target_ms);

        let task = handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(ServiceEvent::WakeFired(payload)).is_err() {
                tracing::warn!("Wake fired after the event loop closed");
            }
        });

        let mut armed = self.armed.lock().unwrap_or_else(|p| p.into_inner());
        if let Some((_, previous)) = armed.replace((request.request_id, task)) {
            previous.abort();
        }
        Ok(())
    }
}

impl WakeTimer for TokioWakeTimer {
    fn set_exact(&self, request: &WakeRequest) -> Result<(), PlatformError> {
        if !self.exact_allowed.load(Ordering::SeqCst) {
            return Err(PlatformError::PermissionDenied);
        }
        self.arm(request)
    }

    fn set_inexact(&self, request: &WakeRequest) -> Result<(), PlatformError> {
        // A tokio timer has no batching window; inexact behaves like exact here.
        self.arm(request)
    }

    fn cancel(&self, request_id: u32) {
        let mut armed = self.armed.lock().unwrap_or_else(|p| p.into_inner());
        if armed.as_ref().map_or(false, |(id, _)| *id == request_id) {
            if let Some((_, task)) = armed.take() {
                task.abort();
            }
        }
    }
}

/// Writes notifications to the log.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn ensure_channel(&self, channel: &NotificationChannel) {
        tracing::debug!(id = %channel.id, name = %channel.name, "Notification channel ready");
    }

    fn show(&self, id: u32, view: &NotificationView) {
        tracing::info!(id, title = %view.title, priority = ?view.priority, "{}", view.body);
    }

    fn dismiss(&self, id: u32) {
        tracing::debug!(id, "Notification dismissed");
    }
}

#[derive(Debug, Default)]
pub struct LogAlertSound;

impl AlertSound for LogAlertSound {
    fn play(&self, label: &str) {
        tracing::info!(label, "Playing adzan");
    }
}

/// No CPU to keep awake in-process; records intent only.
#[derive(Debug, Default)]
pub struct LogWakeLock;

impl WakeLock for LogWakeLock {
    fn acquire(&self, tag: &str, timeout: Duration) {
        tracing::debug!(tag, timeout_ms = timeout.as_millis() as u64, "Wake lock acquired");
    }

    fn release(&self, tag: &str) {
        tracing::debug!(tag, "Wake lock released");
    }
}

#[derive(Debug, Default)]
pub struct UnknownBattery;

impl BatteryProbe for UnknownBattery {
    fn capacity_percent(&self) -> Option<u8> { None }
}

/// Platform bundle for the in-process host. Returns the wake timer too so
/// callers can toggle the exact-alarm permission.
pub fn in_process(events: EventSender) -> (Platform, Arc<TokioWakeTimer>) {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let wake_timer = Arc::new(TokioWakeTimer::new(events, clock.clone()));
    let platform = Platform {
        clock,
        wake_timer: wake_timer.clone(),
        notifier: Arc::new(LogNotifier),
        sound: Arc::new(LogAlertSound),
        wake_lock: Arc::new(LogWakeLock),
        battery: Arc::new(UnknownBattery),
    };
    (platform, wake_timer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::memory::PausedClock;
    use crate::runtime::event_channel;

    #[tokio::test(start_paused = true)]
    async fn armed_timer_delivers_wake_event() {
        let (tx, mut rx) = event_channel();
        let timer = TokioWakeTimer::new(tx, Arc::new(PausedClock::new(10_000)));
        timer.set_exact(&WakeRequest::new(13_000, "Ashar")).unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event, ServiceEvent::WakeFired(WakePayload::new("Ashar", 13_000)));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let (tx, mut rx) = event_channel();
        let timer = TokioWakeTimer::new(tx, Arc::new(PausedClock::new(10_000)));
        timer.set_exact(&WakeRequest::new(13_000, "Ashar")).unwrap();
        timer.cancel(crate::core::paths::ids::WAKE_REQUEST);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn exact_denied_when_permission_revoked() {
        let (tx, _rx) = event_channel();
        let timer = TokioWakeTimer::new(tx, Arc::new(PausedClock::new(0)));
        timer.set_exact_allowed(false);
        let request = WakeRequest::new(1_000, "Subuh");
        assert_eq!(timer.set_exact(&request), Err(PlatformError::PermissionDenied));
        assert!(timer.set_inexact(&request).is_ok());
    }
}
