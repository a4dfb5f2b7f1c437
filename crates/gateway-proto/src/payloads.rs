//! Documented shapes of the payloads carried by each [`crate::header::MessageKind`].
//!
//! These structs exist for test fixtures and tooling that want realistic
//! end-to-end data; the frame and SLIP codecs never parse payload bytes, and
//! nothing in this crate calls into this module.

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hello {
    pub node_id: u8,
    pub fw_version: u32,
    pub build_time: u32,
    pub capabilities: u32,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Telemetry {
    pub uptime_ms: u32,
    pub status_flags: u16,
    pub error_code: u16,
    pub voltage: f32,
    pub current: f32,
    pub temperature: f32,
    pub rpm: f32,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub command_id: u16,
    pub param_len: u16,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub ack_seq: u16,
    pub status_code: u16,
}

impl Ack {
    pub const STATUS_OK: u16 = 0;
    pub const STATUS_UNKNOWN_COMMAND: u16 = 1;
    pub const STATUS_INVALID_PARAM: u16 = 2;
    pub const STATUS_INTERNAL_ERROR: u16 = 3;
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSync {
    pub unix_time_ms: u64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventHeader {
    pub event_code: u16,
    pub data_len: u16,
}
