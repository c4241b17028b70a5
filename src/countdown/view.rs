//! NotificationView - what the foreground notification shows for a state

use chrono::{DateTime, FixedOffset, Local, Utc};
use serde::{Deserialize, Serialize};

use super::CountdownState;
use crate::core::paths::text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Service,
    Alarm,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationView {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub category: Category,
    /// Ongoing notifications cannot be swiped away.
    pub ongoing: bool,
}

impl NotificationView {
    /// Shown once when a deferred wake is registered. No update loop follows.
    pub fn standby(label: &str, target_ms: i64, utc_offset_minutes: Option<i32>) -> Self {
        Self {
            title: text::SERVICE_TITLE.into(),
            body: format!("Menuju {} pada {}", label, clock_time(target_ms, utc_offset_minutes)),
            priority: Priority::Low,
            category: Category::Service,
            ongoing: true,
        }
    }

    pub fn ticking(label: &str, remaining_ms: i64) -> Self {
        Self {
            title: text::SERVICE_TITLE.into(),
            body: format!("Menuju {}: {} lagi", label, remaining(remaining_ms)),
            priority: Priority::Low,
            category: Category::Service,
            ongoing: true,
        }
    }

    pub fn alert(label: &str) -> Self {
        Self {
            title: text::ALERT_TITLE.into(),
            body: format!("Sudah waktunya Sholat {}", label),
            priority: Priority::High,
            category: Category::Alarm,
            ongoing: false,
        }
    }

    /// Projection for coordinator states. Standby carries no offset, so it
    /// renders in host local time; `Stopped` has no view.
    pub fn for_state(state: &CountdownState) -> Option<Self> {
        match state {
            CountdownState::Standby { target_ms, label } => Some(Self::standby(label, *target_ms, None)),
            CountdownState::Ticking { remaining_ms, label } => Some(Self::ticking(label, *remaining_ms)),
            CountdownState::Reached { label } => Some(Self::alert(label)),
            CountdownState::Stopped => None,
        }
    }

    pub fn is_alert(&self) -> bool { self.category == Category::Alarm }
}

/// HH:mm of `target_ms` at the given offset, or host local time.
fn clock_time(target_ms: i64, utc_offset_minutes: Option<i32>) -> String {
    let Some(utc) = DateTime::<Utc>::from_timestamp_millis(target_ms) else {
        return "--:--".into();
    };
    match utc_offset_minutes.and_then(|m| FixedOffset::east_opt(m * 60)) {
        Some(offset) => utc.with_timezone(&offset).format("%H:%M").to_string(),
        None => utc.with_timezone(&Local).format("%H:%M").to_string(),
    }
}

/// HH:MM:SS, rounding partial seconds up so 1ms left still reads 00:00:01.
fn remaining(ms: i64) -> String {
    let secs = ms.max(0).saturating_add(999) / 1000;
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-10 11:05:00 UTC
    const NOON_ISH: i64 = 1_710_068_700_000;

    #[test]
    fn standby_renders_target_in_offset() {
        let view = NotificationView::standby("Maghrib", NOON_ISH, Some(7 * 60));
        assert_eq!(view.title, "Adzan Service Aktif");
        assert_eq!(view.body, "Menuju Maghrib pada 18:05");
        assert_eq!(view.priority, Priority::Low);
        assert!(view.ongoing);
    }

    #[test]
    fn ticking_rounds_up() {
        assert_eq!(NotificationView::ticking("Isya", 3_000).body, "Menuju Isya: 00:00:03 lagi");
        assert_eq!(NotificationView::ticking("Isya", 1).body, "Menuju Isya: 00:00:01 lagi");
        assert_eq!(NotificationView::ticking("Isya", 3_725_000).body, "Menuju Isya: 01:02:05 lagi");
    }

    #[test]
    fn extreme_instants_render() {
        assert!(NotificationView::ticking("Isya", i64::MAX).body.starts_with("Menuju Isya: "));
        assert_eq!(NotificationView::ticking("Isya", i64::MIN).body, "Menuju Isya: 00:00:00 lagi");
        assert_eq!(NotificationView::standby("Isya", i64::MAX, Some(0)).body, "Menuju Isya pada --:--");
    }

    #[test]
    fn alert_is_high_priority_alarm() {
        let view = NotificationView::alert("Subuh");
        assert_eq!(view.title, "WAKTU SHOLAT TIBA!");
        assert_eq!(view.body, "Sudah waktunya Sholat Subuh");
        assert_eq!(view.priority, Priority::High);
        assert!(view.is_alert());
        assert!(!view.ongoing);
    }

    #[test]
    fn stopped_has_no_view() {
        assert!(NotificationView::for_state(&CountdownState::Stopped).is_none());
        let reached = CountdownState::Reached { label: "Ashar".into() };
        assert!(NotificationView::for_state(&reached).unwrap().is_alert());
    }
}
