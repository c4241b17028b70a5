//! AdzanService - the host-facing facade over scheduler, dispatcher, countdown
//!
//! # Flow
//!
//! ```text
//! startTimer(target, label)
//!     │
//!     ├── DeferredWake ──► standby notification (once) ──► WakeScheduler.schedule
//!     │                                                        │
//!     │                             [process may be suspended] │
//!     │                                                        ▼
//!     │                                  ServiceEvent::WakeFired(payload)
//!     │                                                        │
//!     │                                                        ▼
//!     │                          AlarmDispatcher ── CpuHold ── Countdown(ImmediateFire)
//!     │
//!     └── LiveCountdown ──► Countdown(LiveCountdown), ticking every second
//!
//! stopTimer() ──► cancel wake, stop countdown, dismiss notification
//! ```
//!
//! Nothing here returns an error to the host. Degraded scheduling, dropped
//! dispatches and replaced countdowns are all logged and absorbed.

mod config;

pub use config::{AdzanConfig, ConfigError, StandbyStrategy};

use serde::Serialize;
use std::sync::Arc;

use crate::core::paths::ids;
use crate::core::{Ack, ServiceEvent, WakePayload};
use crate::countdown::{CountdownCoordinator, CountdownMode, CountdownState, Foreground, NotificationView};
use crate::dispatch::{AlarmDispatcher, DispatchError};
use crate::platform::{NotificationChannel, Platform};
use crate::power::is_battery_low;
use crate::scheduler::{WakeRequest, WakeScheduler};

/// Snapshot surfaced to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub countdown: CountdownState,
    pub foreground: bool,
    pub pending_wake: Option<WakeRequest>,
    pub cpu_hold_active: bool,
    pub battery_percent: Option<u8>,
    pub battery_low: bool,
    pub standby: &'static str,
}

pub struct AdzanService {
    config: AdzanConfig,
    platform: Platform,
    scheduler: WakeScheduler,
    coordinator: Arc<CountdownCoordinator>,
    dispatcher: AlarmDispatcher,
    foreground: Foreground,
}

impl AdzanService {
    pub fn new(config: AdzanConfig, platform: Platform) -> Self {
        platform.notifier.ensure_channel(&NotificationChannel::default());

        let foreground = Foreground::new();
        let coordinator = Arc::new(CountdownCoordinator::new(&platform, foreground.clone(), config.tick_interval()));
        let dispatcher = AlarmDispatcher::new(
            platform.wake_lock.clone(),
            coordinator.clone(),
            foreground.clone(),
            config.cpu_hold_max(),
            config.default_label.clone(),
        );
        let scheduler = WakeScheduler::new(platform.wake_timer.clone());

        Self { config, platform, scheduler, coordinator, dispatcher, foreground }
    }

    /// Route one host event. Returns the ack for the two UI operations.
    pub fn handle(&self, event: ServiceEvent) -> Option<Ack> {
        match event {
            ServiceEvent::StartTimer { target_ms, label } => Some(self.start_timer(target_ms, &label)),
            ServiceEvent::StopTimer => Some(self.stop_timer()),
            ServiceEvent::WakeFired(payload) => {
                let _ = self.on_wake(payload);
                None
            }
            ServiceEvent::BootCompleted => {
                // Wakes do not survive a reboot; the UI re-issues startTimer when opened.
                tracing::info!("Boot completed, waiting for UI to reschedule");
                None
            }
        }
    }

    /// `startTimer`: arm the countdown for `target_ms`.
    pub fn start_timer(&self, target_ms: i64, label: &str) -> Ack {
        let label = self.label_or_default(Some(label));

        match self.effective_strategy() {
            StandbyStrategy::DeferredWake => {
                self.coordinator.stop();
                self.foreground.set(true);
                let view = NotificationView::standby(&label, target_ms, self.config.utc_offset_minutes);
                self.platform.notifier.show(ids::NOTIFICATION, &view);
                self.scheduler.schedule(target_ms, &label);
            }
            StandbyStrategy::LiveCountdown => {
                self.scheduler.cancel();
                self.coordinator.start(target_ms, &label, CountdownMode::LiveCountdown);
            }
        }
        Ack::Started
    }

    /// `stopTimer`: drop any pending wake and running countdown.
    pub fn stop_timer(&self) -> Ack {
        self.scheduler.cancel();
        self.coordinator.stop();
        self.platform.notifier.dismiss(ids::NOTIFICATION);
        self.foreground.set(false);
        tracing::info!("Timer stopped");
        Ack::Stopped
    }

    /// A wake registration fired. Only the pending registration is
    /// dispatched; wakes from a stopped or replaced timer are dropped.
    /// A lost payload label falls back to the pending request's.
    pub fn on_wake(&self, payload: WakePayload) -> Result<String, DispatchError> {
        if payload.target_ms == 0 {
            return self.dispatcher.dispatch(&payload);
        }
        let Some(fired) = self.scheduler.take_fired(&payload) else {
            tracing::warn!(label = ?payload.label, target_ms = payload.target_ms, "Stale wake dropped");
            return Err(DispatchError::Stale);
        };
        let label = payload.label.filter(|l| !l.trim().is_empty()).unwrap_or(fired.label);
        let payload = WakePayload { label: Some(label), target_ms: payload.target_ms };

        self.dispatcher.dispatch(&payload).map_err(|e| {
            tracing::warn!(error = %e, "Wake dispatch dropped");
            e
        })
    }

    /// Live countdown keeps the CPU busy every second; skip it on low battery.
    fn effective_strategy(&self) -> StandbyStrategy {
        if self.config.standby == StandbyStrategy::LiveCountdown
            && is_battery_low(self.platform.battery.as_ref(), self.config.low_battery_percent)
        {
            tracing::info!("Battery low, using deferred wake instead of live countdown");
            return StandbyStrategy::DeferredWake;
        }
        self.config.standby
    }

    fn label_or_default(&self, label: Option<&str>) -> String {
        label
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.default_label.as_str())
            .to_string()
    }

    pub fn status(&self) -> ServiceStatus {
        let battery_percent = self.platform.battery.capacity_percent();
        ServiceStatus {
            countdown: self.coordinator.state(),
            foreground: self.foreground.is_active(),
            pending_wake: self.scheduler.pending(),
            cpu_hold_active: self.dispatcher.hold_active(),
            battery_percent,
            battery_low: battery_percent.map_or(false, |p| p <= self.config.low_battery_percent),
            standby: self.effective_strategy().as_str(),
        }
    }

    pub fn config(&self) -> &AdzanConfig { &self.config }
    pub fn coordinator(&self) -> &CountdownCoordinator { &self.coordinator }
    pub fn is_foreground(&self) -> bool { self.foreground.is_active() }
}
