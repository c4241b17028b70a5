//! Platform - the host collaborators the core talks to
//!
//! The core never touches an OS API directly. Every outbound effect goes
//! through one of these traits:
//!
//! | Trait | Host primitive |
//! |-------|----------------|
//! | [`WakeTimer`] | exact / inexact suspend-bypassing alarm |
//! | [`Notifier`] | persistent foreground notification |
//! | [`AlertSound`] | adzan audio |
//! | [`WakeLock`] | partial CPU wake lock with timeout |
//! | [`BatteryProbe`] | battery capacity |
//! | [`Clock`] | wall clock in ms since epoch |
//!
//! [`host`] wires them to an in-process tokio host (used by the CLI and
//! server). [`memory`] records every call for tests.

pub mod host;
pub mod memory;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::countdown::NotificationView;
use crate::core::paths::channel;
use crate::scheduler::WakeRequest;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlatformError {
    #[error("Exact alarm permission denied")]
    PermissionDenied,
    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

/// Wall clock, ms since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Host wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 { chrono::Utc::now().timestamp_millis() }
}

/// Deferred wake registration owned by the host scheduler.
pub trait WakeTimer: Send + Sync {
    /// Register an exact wake that fires even in deep idle.
    fn set_exact(&self, request: &WakeRequest) -> Result<(), PlatformError>;
    /// Register an idle-bypassing wake the host may batch or delay.
    fn set_inexact(&self, request: &WakeRequest) -> Result<(), PlatformError>;
    /// Remove the registration for `request_id`. No-op if none.
    fn cancel(&self, request_id: u32);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationChannel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub high_importance: bool,
    pub show_badge: bool,
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self {
            id: channel::ID.into(),
            name: channel::NAME.into(),
            description: channel::DESCRIPTION.into(),
            high_importance: true,
            show_badge: false,
        }
    }
}

pub trait Notifier: Send + Sync {
    fn ensure_channel(&self, channel: &NotificationChannel);
    /// Create or replace notification `id`.
    fn show(&self, id: u32, view: &NotificationView);
    fn dismiss(&self, id: u32);
}

pub trait AlertSound: Send + Sync {
    fn play(&self, label: &str);
}

/// Partial wake lock: CPU on, screen off.
pub trait WakeLock: Send + Sync {
    /// Acquire with a host-side timeout. Not reference counted.
    fn acquire(&self, tag: &str, timeout: Duration);
    fn release(&self, tag: &str);
}

pub trait BatteryProbe: Send + Sync {
    /// Remaining capacity 0..=100, `None` when the host cannot tell.
    fn capacity_percent(&self) -> Option<u8>;
}

/// Bundle of host collaborators handed to the service.
#[derive(Clone)]
pub struct Platform {
    pub clock: Arc<dyn Clock>,
    pub wake_timer: Arc<dyn WakeTimer>,
    pub notifier: Arc<dyn Notifier>,
    pub sound: Arc<dyn AlertSound>,
    pub wake_lock: Arc<dyn WakeLock>,
    pub battery: Arc<dyn BatteryProbe>,
}

impl std::fmt::Debug for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Platform").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn default_channel_matches_host_registration() {
        let ch = NotificationChannel::default();
        assert_eq!(ch.id, "adzan_native_channel");
        assert!(ch.high_importance);
        assert!(!ch.show_badge);
    }
}
