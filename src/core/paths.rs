//! Path, identifier and text constants
//!
//! Centralized registry for HTTP routes, host identifiers and the
//! notification texts shown to the user.

/// HTTP routes
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const TIMER_STATUS: &str = "/timer/status";
    pub const TIMER_START: &str = "/timer/start";
    pub const TIMER_STOP: &str = "/timer/stop";
    pub const ALARM_FIRE: &str = "/alarm/fire";
}

/// Host-side identifiers
pub mod ids {
    /// Singleton slot for the one outstanding wake request.
    pub const WAKE_REQUEST: u32 = 999;
    /// Foreground notification id (shared by standby, countdown and alert).
    pub const NOTIFICATION: u32 = 999;
    pub const WAKE_LOCK_TAG: &str = "AdzanApp:AdzanWakeLock";
}

/// Notification channel
pub mod channel {
    pub const ID: &str = "adzan_native_channel";
    pub const NAME: &str = "Adzan Native Service";
    pub const DESCRIPTION: &str = "Notifikasi waktu sholat";
}

/// Notification texts
pub mod text {
    pub const SERVICE_TITLE: &str = "Adzan Service Aktif";
    pub const ALERT_TITLE: &str = "WAKTU SHOLAT TIBA!";
    pub const DEFAULT_LABEL: &str = "Sholat";
}

/// Acknowledgements returned to the UI
pub mod ack {
    pub const STARTED: &str = "Service Started";
    pub const STOPPED: &str = "Service Stopped";
}

