//! Shared constants and the event vocabulary

pub mod event;
pub mod paths;

pub use event::{Ack, ServiceEvent, WakePayload};
