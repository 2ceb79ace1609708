//! Decoded feedback flowing from devices to subscribers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{kinds, DeviceId};

/// Discriminant of a [`Feedback`] without its data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    ControlResponse,
    BinaryFeedback,
    UpdateResponse,
    OfflineDevice,
}

impl FeedbackKind {
    /// The kind name used in host-facing payloads
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackKind::ControlResponse => kinds::CONTROL_RESPONSE,
            FeedbackKind::BinaryFeedback => kinds::BINARY_FEEDBACK,
            FeedbackKind::UpdateResponse => kinds::UPDATE_RESPONSE,
            FeedbackKind::OfflineDevice => kinds::OFFLINE_DEVICE,
        }
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State information reported by a device
///
/// Everything a device can tell us about its channels normalizes to one of
/// these variants. `OfflineDevice` never arrives from the bus; it is
/// synthesized locally when a device misses an acknowledgement deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Feedback {
    /// Acknowledgement of a control command for a single channel
    ControlResponse {
        /// Channel the command addressed (1-based)
        channel: u8,
        /// Whether the channel is now on
        on: bool,
    },

    /// Unsolicited on/off bitmap covering the device's first channels
    BinaryFeedback {
        /// Per-channel states, index 0 is channel 1
        channels: Vec<bool>,
    },

    /// Response to a status poll carrying one level per channel
    UpdateResponse {
        /// Per-channel levels, index 0 is channel 1; 0 is off, anything else on
        levels: Vec<u8>,
    },

    /// Synthesized when a device stopped answering
    OfflineDevice,
}

impl Feedback {
    /// The discriminant of this feedback
    pub fn kind(&self) -> FeedbackKind {
        match self {
            Feedback::ControlResponse { .. } => FeedbackKind::ControlResponse,
            Feedback::BinaryFeedback { .. } => FeedbackKind::BinaryFeedback,
            Feedback::UpdateResponse { .. } => FeedbackKind::UpdateResponse,
            Feedback::OfflineDevice => FeedbackKind::OfflineDevice,
        }
    }

    /// On/off state of `channel` (1-based) if this feedback reports it
    ///
    /// Returns `None` when the feedback says nothing about that channel:
    /// a control response for a different channel, a bitmap or level list
    /// that is too short, or an offline notification.
    pub fn channel_state(&self, channel: u8) -> Option<bool> {
        let index = (channel as usize).checked_sub(1)?;
        match self {
            Feedback::ControlResponse { channel: ch, on } => (*ch == channel).then_some(*on),
            Feedback::BinaryFeedback { channels } => channels.get(index).copied(),
            Feedback::UpdateResponse { levels } => levels.get(index).map(|level| *level > 0),
            Feedback::OfflineDevice => None,
        }
    }
}

/// A feedback envelope: which device spoke and when
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEvent {
    /// Device the feedback is attributed to
    pub device: DeviceId,

    /// The decoded feedback
    pub feedback: Feedback,

    /// When the frame was decoded, or the event synthesized
    pub received_at: DateTime<Utc>,
}

impl FeedbackEvent {
    /// Create a new event stamped with the current time
    pub fn new(device: DeviceId, feedback: Feedback) -> Self {
        Self {
            device,
            feedback,
            received_at: Utc::now(),
        }
    }

    /// The discriminant of the carried feedback
    pub fn kind(&self) -> FeedbackKind {
        self.feedback.kind()
    }

    /// On/off state of `channel` if this event reports it
    pub fn channel_state(&self, channel: u8) -> Option<bool> {
        self.feedback.channel_state(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_response_reports_only_its_channel() {
        let feedback = Feedback::ControlResponse {
            channel: 3,
            on: true,
        };
        assert_eq!(feedback.channel_state(3), Some(true));
        assert_eq!(feedback.channel_state(4), None);
        assert_eq!(feedback.channel_state(0), None);
    }

    #[test]
    fn test_binary_feedback_indexes_from_channel_one() {
        let feedback = Feedback::BinaryFeedback {
            channels: vec![true, false, true],
        };
        assert_eq!(feedback.channel_state(1), Some(true));
        assert_eq!(feedback.channel_state(2), Some(false));
        assert_eq!(feedback.channel_state(3), Some(true));
        assert_eq!(feedback.channel_state(4), None);
    }

    #[test]
    fn test_update_response_treats_any_nonzero_level_as_on() {
        let feedback = Feedback::UpdateResponse {
            levels: vec![0, 100, 42],
        };
        assert_eq!(feedback.channel_state(1), Some(false));
        assert_eq!(feedback.channel_state(2), Some(true));
        assert_eq!(feedback.channel_state(3), Some(true));
    }

    #[test]
    fn test_offline_reports_nothing() {
        assert_eq!(Feedback::OfflineDevice.channel_state(1), None);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let event = FeedbackEvent::new(
            DeviceId::new(1, 12),
            Feedback::ControlResponse {
                channel: 2,
                on: false,
            },
        );
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["device"], "1.12");
        assert_eq!(value["feedback"]["kind"], "control_response");
        assert_eq!(value["feedback"]["channel"], 2);
        assert_eq!(value["feedback"]["on"], false);
    }

    #[test]
    fn test_kind_names_match_constants() {
        assert_eq!(FeedbackKind::ControlResponse.as_str(), "control_response");
        assert_eq!(FeedbackKind::BinaryFeedback.as_str(), "binary_feedback");
        assert_eq!(FeedbackKind::UpdateResponse.as_str(), "update_response");
        assert_eq!(FeedbackKind::OfflineDevice.as_str(), "offline_device");
    }
}
