//! Adzan: prayer-time wake scheduler. Sleep until the target, wake, alert once.
//!
//! # Architecture
//!
//! ```text
//! AdzanService (entry point)
//!   │
//!   ├── WakeScheduler ── Platform.wake_timer (exact, inexact fallback)
//!   │
//!   ├── AlarmDispatcher (on wake)
//!   │     ├── CpuHold ── Platform.wake_lock (released at deadline)
//!   │     └── CountdownCoordinator.start(ImmediateFire)
//!   │
//!   └── CountdownCoordinator
//!         ├── ImmediateFire: one check, one alert
//!         └── LiveCountdown: tick every second until reached or stopped
//! ```
//!
//! # Operations
//!
//! | Operation | Method | Ack |
//! |-----------|--------|-----|
//! | startTimer | `service.start_timer(target_ms, label)` | `Service Started` |
//! | stopTimer | `service.stop_timer()` | `Service Stopped` |
//! | wake | `service.on_wake(payload)` | - |
//! | status | `service.status()` | - |
//!
//! # Features
//!
//! - `native` - HTTP server, CLI, stderr logging
//!
//! # Usage
//!
//! ```ignore
//! use adzan::{AdzanConfig, AdzanService, event_channel};
//! use adzan::platform::host;
//!
//! let (events, rx) = event_channel();
//! let (platform, _timer) = host::in_process(events);
//! let service = AdzanService::new(AdzanConfig::from_env()?, platform);
//!
//! service.start_timer(target_ms, "Maghrib");
//! ```

pub mod core;
pub mod countdown;
pub mod dispatch;
pub mod platform;
pub mod power;
pub mod runtime;
pub mod scheduler;
pub mod service;

#[cfg(feature = "native")]
pub mod logging;
#[cfg(feature = "native")]
pub mod server;

pub use crate::core::{Ack, ServiceEvent, WakePayload};
pub use countdown::{CountdownCoordinator, CountdownMode, CountdownState, Foreground, NotificationView};
pub use dispatch::{AlarmDispatcher, DispatchError};
pub use platform::{Platform, PlatformError};
pub use power::CpuHold;
pub use runtime::{event_channel, install_signal_handlers, spawn_event_loop, EventReceiver, EventSender, Shutdown};
pub use scheduler::{WakePrecision, WakeRequest, WakeScheduler};
pub use service::{AdzanConfig, AdzanService, ConfigError, ServiceStatus, StandbyStrategy};

#[cfg(feature = "native")]
pub use server::create_router;
