//! Classification of inbound frames into feedback events

use tis_core::{Feedback, FeedbackEvent};

use crate::bits::channel_bit;
use crate::codec::Packet;
use crate::commands::CHANNEL_ON_LEVEL;
use crate::opcode::OperationCode;

/// Byte offset of the reported level inside a control response payload,
/// right after the acknowledge flag.
const CONTROL_RESPONSE_LEVEL_OFFSET: usize = 1;

/// Try to interpret an inbound frame as device feedback.
///
/// Control responses, binary feedback bitmaps and update responses map to a
/// [`FeedbackEvent`] attributed to the frame's source device. Any other
/// operation, and any recognized operation whose payload is too short for
/// its layout, yields `None`; a truncated payload never aborts the caller.
pub fn decode_feedback(packet: &Packet) -> Option<FeedbackEvent> {
    let feedback = match packet.operation {
        OperationCode::ControlResponse => control_response(packet)?,
        OperationCode::BinaryFeedback => binary_feedback(packet)?,
        OperationCode::UpdateResponse => update_response(packet)?,
        _ => return None,
    };
    Some(FeedbackEvent::new(packet.source, feedback))
}

fn control_response(packet: &Packet) -> Option<Feedback> {
    let level = *packet.payload.get(CONTROL_RESPONSE_LEVEL_OFFSET)?;
    Some(Feedback::ControlResponse {
        channel: packet.channel,
        on: level == CHANNEL_ON_LEVEL,
    })
}

fn binary_feedback(packet: &Packet) -> Option<Feedback> {
    let count = *packet.payload.first()? as usize;
    let bitmap = packet.payload.get(1..1 + count.div_ceil(8))?;
    let channels = (0..count)
        .map(|index| channel_bit(bitmap[index / 8], (index % 8) as u8))
        .collect();
    Some(Feedback::BinaryFeedback { channels })
}

fn update_response(packet: &Packet) -> Option<Feedback> {
    let count = *packet.payload.first()? as usize;
    let levels = packet.payload.get(1..1 + count)?.to_vec();
    Some(Feedback::UpdateResponse { levels })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands;
    use tis_core::DeviceId;

    const CONTROLLER: DeviceId = DeviceId::new(1, 254);
    const DEVICE: DeviceId = DeviceId::new(1, 10);

    #[test]
    fn test_control_response_on() {
        let packet = commands::control_response(DEVICE, CONTROLLER, 3, 100);
        let event = decode_feedback(&packet).unwrap();
        assert_eq!(event.device, DEVICE);
        assert_eq!(
            event.feedback,
            Feedback::ControlResponse {
                channel: 3,
                on: true
            }
        );
    }

    #[test]
    fn test_control_response_any_other_level_is_off() {
        for level in [0, 1, 50, 99, 101, 255] {
            let packet = commands::control_response(DEVICE, CONTROLLER, 1, level);
            let event = decode_feedback(&packet).unwrap();
            assert_eq!(event.channel_state(1), Some(false), "level {}", level);
        }
    }

    #[test]
    fn test_binary_feedback_ten_channels() {
        let packet = Packet::new(
            OperationCode::BinaryFeedback,
            DEVICE,
            CONTROLLER,
            0,
            vec![10u8, 0b1011_0000, 0b0100_0000],
        );
        let event = decode_feedback(&packet).unwrap();
        let Feedback::BinaryFeedback { channels } = &event.feedback else {
            panic!("expected binary feedback");
        };
        assert_eq!(channels.len(), 10);
        for k in 1..=10u8 {
            let expected = [1, 3, 4, 10].contains(&k);
            assert_eq!(event.channel_state(k), Some(expected), "channel {}", k);
        }
    }

    #[test]
    fn test_update_response_levels() {
        let packet = commands::update_response(DEVICE, CONTROLLER, &[0, 100, 42, 0]);
        let event = decode_feedback(&packet).unwrap();
        assert_eq!(
            event.feedback,
            Feedback::UpdateResponse {
                levels: vec![0, 100, 42, 0]
            }
        );
    }

    #[test]
    fn test_zero_count_is_valid_and_empty() {
        let packet = Packet::new(OperationCode::BinaryFeedback, DEVICE, CONTROLLER, 0, vec![0u8]);
        let event = decode_feedback(&packet).unwrap();
        assert_eq!(event.feedback, Feedback::BinaryFeedback { channels: vec![] });
    }

    #[test]
    fn test_short_payloads_yield_none() {
        let cases = [
            Packet::new(OperationCode::ControlResponse, DEVICE, CONTROLLER, 1, vec![0xF8u8]),
            Packet::new(OperationCode::ControlResponse, DEVICE, CONTROLLER, 1, Vec::<u8>::new()),
            Packet::new(OperationCode::BinaryFeedback, DEVICE, CONTROLLER, 0, Vec::<u8>::new()),
            // count says 9 channels but only one bitmap byte follows
            Packet::new(OperationCode::BinaryFeedback, DEVICE, CONTROLLER, 0, vec![9u8, 0xFF]),
            // count says 3 levels but only two follow
            Packet::new(OperationCode::UpdateResponse, DEVICE, CONTROLLER, 0, vec![3u8, 100, 0]),
            Packet::new(OperationCode::UpdateResponse, DEVICE, CONTROLLER, 0, Vec::<u8>::new()),
        ];
        for packet in cases {
            assert_eq!(decode_feedback(&packet), None, "{:?}", packet);
        }
    }

    #[test]
    fn test_non_feedback_operations_yield_none() {
        let packet = commands::control_on(CONTROLLER, DEVICE, 1);
        assert_eq!(decode_feedback(&packet), None);
        let packet = commands::discovery_request(CONTROLLER);
        assert_eq!(decode_feedback(&packet), None);
        let packet = Packet::new(OperationCode::Unknown(0x7777), DEVICE, CONTROLLER, 0, vec![1u8]);
        assert_eq!(decode_feedback(&packet), None);
    }
}
