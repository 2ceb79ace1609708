//! Operation codes for the TIS UDP protocol

/// Operation code of a TIS frame
///
/// Codes outside the known set decode as [`OperationCode::Unknown`] so that
/// a well-formed frame with an unrecognized operation still decodes; whether
/// to act on it is the receiver's call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationCode {
    /// Command a channel level change (0x0031)
    Control,
    /// Device acknowledgement of a control command (0x0032)
    ControlResponse,
    /// Poll a device for all channel levels (0x0033)
    UpdateRequest,
    /// Answer to an update request (0x0034)
    UpdateResponse,
    /// Broadcast probe asking devices to identify themselves (0x000E)
    Discovery,
    /// Device identification answering a probe (0x000F)
    DiscoveryResponse,
    /// Unsolicited per-channel on/off bitmap (0xDC22)
    BinaryFeedback,
    /// Any code outside the known set
    Unknown(u16),
}

impl OperationCode {
    /// The 16-bit wire form of this operation
    pub const fn code(self) -> u16 {
        match self {
            OperationCode::Control => 0x0031,
            OperationCode::ControlResponse => 0x0032,
            OperationCode::UpdateRequest => 0x0033,
            OperationCode::UpdateResponse => 0x0034,
            OperationCode::Discovery => 0x000E,
            OperationCode::DiscoveryResponse => 0x000F,
            OperationCode::BinaryFeedback => 0xDC22,
            OperationCode::Unknown(code) => code,
        }
    }

    /// Map a 16-bit wire code to an operation
    pub const fn from_code(code: u16) -> Self {
        match code {
            0x0031 => OperationCode::Control,
            0x0032 => OperationCode::ControlResponse,
            0x0033 => OperationCode::UpdateRequest,
            0x0034 => OperationCode::UpdateResponse,
            0x000E => OperationCode::Discovery,
            0x000F => OperationCode::DiscoveryResponse,
            0xDC22 => OperationCode::BinaryFeedback,
            other => OperationCode::Unknown(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_map_both_ways() {
        let known = [
            (OperationCode::Control, 0x0031),
            (OperationCode::ControlResponse, 0x0032),
            (OperationCode::UpdateRequest, 0x0033),
            (OperationCode::UpdateResponse, 0x0034),
            (OperationCode::Discovery, 0x000E),
            (OperationCode::DiscoveryResponse, 0x000F),
            (OperationCode::BinaryFeedback, 0xDC22),
        ];
        for (op, code) in known {
            assert_eq!(op.code(), code);
            assert_eq!(OperationCode::from_code(code), op);
        }
    }

    #[test]
    fn test_unknown_code_round_trips() {
        let op = OperationCode::from_code(0x9999);
        assert_eq!(op, OperationCode::Unknown(0x9999));
        assert_eq!(op.code(), 0x9999);
    }
}
