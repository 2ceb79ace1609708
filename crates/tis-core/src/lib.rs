//! Core types for the TIS gateway
//!
//! This crate provides the fundamental types shared by every layer of the
//! gateway: DeviceId, DeviceTypeCode, Feedback, FeedbackEvent and
//! DeviceDescriptor. It knows nothing about the wire format or transport.

mod descriptor;
mod device_id;
mod device_type;
mod feedback;

pub use descriptor::DeviceDescriptor;
pub use device_id::{DeviceId, DeviceIdError};
pub use device_type::{DeviceTypeCode, DeviceTypeDef};
pub use feedback::{Feedback, FeedbackEvent, FeedbackKind};

/// Feedback kind names used when handing events to a host system
pub mod kinds {
    /// Kind name for control acknowledgements
    pub const CONTROL_RESPONSE: &str = "control_response";

    /// Kind name for unsolicited per-channel on/off bitmaps
    pub const BINARY_FEEDBACK: &str = "binary_feedback";

    /// Kind name for polled full channel status reports
    pub const UPDATE_RESPONSE: &str = "update_response";

    /// Kind name for locally synthesized offline notifications
    pub const OFFLINE_DEVICE: &str = "offline_device";
}
