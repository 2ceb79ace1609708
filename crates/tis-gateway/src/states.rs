//! Last-known channel states assembled from feedback

use dashmap::DashMap;

use tis_core::{DeviceId, Feedback, FeedbackEvent};

/// Cache of the most recent reported state per device channel
///
/// Every feedback kind that carries channel state lands here, so entities
/// can answer "is it on?" without waiting for the next poll. Channels are
/// 1-based, matching the wire protocol.
#[derive(Default)]
pub struct ChannelStateCache {
    states: DashMap<(DeviceId, u8), bool>,
}

impl ChannelStateCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Last reported state of `channel`, if any feedback mentioned it
    pub fn get(&self, device: DeviceId, channel: u8) -> Option<bool> {
        self.states.get(&(device, channel)).map(|entry| *entry)
    }

    /// Fold one feedback event into the cache
    ///
    /// An offline notification wipes the device's entries: a device that
    /// stopped answering may have any state by the time it returns.
    pub fn apply(&self, event: &FeedbackEvent) {
        match &event.feedback {
            Feedback::ControlResponse { channel, on } => {
                self.states.insert((event.device, *channel), *on);
            }
            Feedback::BinaryFeedback { channels } => {
                for (index, on) in channels.iter().enumerate() {
                    self.states.insert((event.device, index as u8 + 1), *on);
                }
            }
            Feedback::UpdateResponse { levels } => {
                for (index, level) in levels.iter().enumerate() {
                    self.states.insert((event.device, index as u8 + 1), *level > 0);
                }
            }
            Feedback::OfflineDevice => {
                self.states.retain(|(device, _), _| *device != event.device);
            }
        }
    }

    /// Number of cached channel entries
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether nothing has been cached yet
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEVICE: DeviceId = DeviceId::new(1, 10);
    const OTHER: DeviceId = DeviceId::new(1, 11);

    fn event(feedback: Feedback) -> FeedbackEvent {
        FeedbackEvent::new(DEVICE, feedback)
    }

    #[test]
    fn test_control_response_sets_one_channel() {
        let cache = ChannelStateCache::new();
        cache.apply(&event(Feedback::ControlResponse {
            channel: 3,
            on: true,
        }));
        assert_eq!(cache.get(DEVICE, 3), Some(true));
        assert_eq!(cache.get(DEVICE, 2), None);
        assert_eq!(cache.get(OTHER, 3), None);
    }

    #[test]
    fn test_binary_feedback_sets_every_listed_channel() {
        let cache = ChannelStateCache::new();
        cache.apply(&event(Feedback::BinaryFeedback {
            channels: vec![true, false, true],
        }));
        assert_eq!(cache.get(DEVICE, 1), Some(true));
        assert_eq!(cache.get(DEVICE, 2), Some(false));
        assert_eq!(cache.get(DEVICE, 3), Some(true));
        assert_eq!(cache.get(DEVICE, 4), None);
    }

    #[test]
    fn test_update_response_maps_levels_to_booleans() {
        let cache = ChannelStateCache::new();
        cache.apply(&event(Feedback::UpdateResponse {
            levels: vec![0, 100, 42],
        }));
        assert_eq!(cache.get(DEVICE, 1), Some(false));
        assert_eq!(cache.get(DEVICE, 2), Some(true));
        assert_eq!(cache.get(DEVICE, 3), Some(true));
    }

    #[test]
    fn test_offline_wipes_only_that_device() {
        let cache = ChannelStateCache::new();
        cache.apply(&event(Feedback::ControlResponse {
            channel: 1,
            on: true,
        }));
        cache.apply(&FeedbackEvent::new(
            OTHER,
            Feedback::ControlResponse {
                channel: 1,
                on: false,
            },
        ));

        cache.apply(&event(Feedback::OfflineDevice));
        assert_eq!(cache.get(DEVICE, 1), None);
        assert_eq!(cache.get(OTHER, 1), Some(false));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_newer_feedback_overwrites_older() {
        let cache = ChannelStateCache::new();
        cache.apply(&event(Feedback::ControlResponse {
            channel: 2,
            on: true,
        }));
        cache.apply(&event(Feedback::UpdateResponse {
            levels: vec![0, 0],
        }));
        assert_eq!(cache.get(DEVICE, 2), Some(false));
    }
}
