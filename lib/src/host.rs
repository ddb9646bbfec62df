//! Collaborator interfaces: the host application bridge and the
//! notification sink that plays cues.
//!
//! Both are plain trait objects handed to their users at construction. A
//! missing host is a `NullHost`, chosen once at startup.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Haptic feedback styles the host understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Haptic {
    /// Light impact — low-time beep.
    Light,
    /// Heavy impact — buzzer.
    Heavy,
    Success,
    Error,
}

/// Failure to hand data to the host. Never fatal to the game.
#[derive(Debug)]
pub enum DeliveryError {
    /// No host application is attached.
    HostUnavailable,
    /// Nobody is listening on the host channel.
    NotDelivered(String),
    /// Even the compact payload exceeds the host's size limit.
    TooLarge { size: usize, limit: usize },
    /// The payload could not be serialized.
    Encode(serde_json::Error),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostUnavailable => write!(f, "host not available"),
            Self::NotDelivered(reason) => write!(f, "not delivered: {reason}"),
            Self::TooLarge { size, limit } => {
                write!(f, "payload is {size} bytes, host limit is {limit}")
            }
            Self::Encode(e) => write!(f, "encode error: {e}"),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Encode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

/// Capabilities of the host application embedding the scoreboard.
pub trait HostBridge: Send + Sync {
    /// Hand a result payload to the host.
    fn send_data(&self, data: &str) -> Result<(), DeliveryError>;

    /// Fire-and-forget haptic feedback.
    fn haptic(&self, kind: Haptic);

    /// Show a message to the user.
    fn show_alert(&self, message: &str);
}

/// Host stand-in used when no host application is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl HostBridge for NullHost {
    fn send_data(&self, _data: &str) -> Result<(), DeliveryError> {
        Err(DeliveryError::HostUnavailable)
    }

    fn haptic(&self, _kind: Haptic) {}

    fn show_alert(&self, _message: &str) {}
}

/// Receives audio/haptic cues from the game controller.
///
/// Implementations own their output devices and swallow their own failures;
/// they must return promptly.
pub trait NotificationSink: Send {
    /// The shot clock crossed into `seconds` (4..=0).
    fn notify_low_time(&self, seconds: u8);

    /// The game finished.
    fn notify_buzzer(&self);
}

/// Sink that drops every cue.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify_low_time(&self, _seconds: u8) {}

    fn notify_buzzer(&self) {}
}
