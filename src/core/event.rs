//! ServiceEvent - what happened, independent of which host primitive delivered it

use serde::{Deserialize, Serialize};

use super::paths::ack;

/// Payload carried by a fired wake request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WakePayload {
    /// Prayer name. Hosts may lose extras; `None` falls back to the default label.
    pub label: Option<String>,
    /// Target instant in ms since epoch. Zero means unset.
    pub target_ms: i64,
}

impl WakePayload {
    pub fn new(label: impl Into<String>, target_ms: i64) -> Self {
        Self { label: Some(label.into()), target_ms }
    }
}

/// Inbound events. Every host callback (UI call, alarm broadcast, boot signal)
/// is translated into one of these before reaching the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceEvent {
    StartTimer { target_ms: i64, label: String },
    StopTimer,
    WakeFired(WakePayload),
    BootCompleted,
}

/// Acknowledgement for the two inbound operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ack {
    Started,
    Stopped,
}

impl Ack {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ack::Started => ack::STARTED,
            Ack::Stopped => ack::STOPPED,
        }
    }
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_strings_match_ui_contract() {
        assert_eq!(Ack::Started.as_str(), "Service Started");
        assert_eq!(Ack::Stopped.to_string(), "Service Stopped");
    }

    #[test]
    fn payload_deserializes_without_label() {
        let payload: WakePayload = serde_json::from_str(r#"{"label":null,"target_ms":5}"#).unwrap();
        assert_eq!(payload.label, None);
        assert_eq!(payload.target_ms, 5);
    }
}
