//! Fixed 16-byte frame header.

use crate::error::Error;

/// Fixed magic value identifying a gateway frame header.
pub const MAGIC: u16 = 0xEC10;
/// The only header version this crate understands.
pub const VERSION: u8 = 1;
/// Largest payload a single frame may carry.
pub const MAX_PAYLOAD_LEN: u16 = 1024;
/// Size in bytes of the fixed header.
pub const HEADER_LEN: usize = 16;
/// Size in bytes of the trailing CRC.
pub const CRC_LEN: usize = 2;

/// Node address reserved for broadcast destinations.
pub const ADDR_BROADCAST: u8 = 0;
/// Node address the gateway uses to identify itself as a frame originator.
pub const ADDR_GATEWAY: u8 = 255;

/// The closed set of message kinds a header may declare.
///
/// Unrecognised kind bytes are preserved as [`MessageKind::Unknown`] rather than
/// rejected, since a frame's kind byte is forward-compatible: the gateway core
/// never branches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Hello,
    Telemetry,
    Command,
    Ack,
    TimeSync,
    Event,
    Config,
    Heartbeat,
    Unknown(u8),
}

impl From<u8> for MessageKind {
    fn from(byte: u8) -> Self {
        match byte {
            0x01 => MessageKind::Hello,
            0x02 => MessageKind::Telemetry,
            0x03 => MessageKind::Command,
            0x04 => MessageKind::Ack,
            0x05 => MessageKind::TimeSync,
            0x06 => MessageKind::Event,
            0x07 => MessageKind::Config,
            0x08 => MessageKind::Heartbeat,
            other => MessageKind::Unknown(other),
        }
    }
}

impl From<MessageKind> for u8 {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Hello => 0x01,
            MessageKind::Telemetry => 0x02,
            MessageKind::Command => 0x03,
            MessageKind::Ack => 0x04,
            MessageKind::TimeSync => 0x05,
            MessageKind::Event => 0x06,
            MessageKind::Config => 0x07,
            MessageKind::Heartbeat => 0x08,
            MessageKind::Unknown(byte) => byte,
        }
    }
}

/// Bitfield carried in the header's flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Flags(pub u16);

impl Flags {
    pub const ACK_REQUIRED: u16 = 0x0001;
    pub const IS_ACK: u16 = 0x0002;
    pub const IS_NACK: u16 = 0x0004;
    pub const ERROR: u16 = 0x0008;
    pub const URGENT: u16 = 0x0010;

    pub fn contains(self, bit: u16) -> bool {
        self.0 & bit != 0
    }
}

/// The fixed 16-byte header, decoded from and encoded to little-endian wire bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: MessageKind,
    pub src: u8,
    pub dst: u8,
    pub seq: u16,
    pub flags: Flags,
    pub payload_len: u16,
}

impl Header {
    /// Builds a header, returning an error if `payload_len` exceeds the cap.
    pub fn new(
        kind: MessageKind,
        src: u8,
        dst: u8,
        seq: u16,
        flags: Flags,
        payload_len: u16,
    ) -> Result<Self, Error> {
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge);
        }
        Ok(Header {
            kind,
            src,
            dst,
            seq,
            flags,
            payload_len,
        })
    }

    /// Parses and validates a 16-byte header slice.
    pub fn parse(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN {
            return Err(Error::IncompleteFrame);
        }
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        if magic != MAGIC {
            return Err(Error::BadMagic);
        }
        let version = bytes[2];
        if version != VERSION {
            return Err(Error::BadVersion);
        }
        let kind = MessageKind::from(bytes[3]);
        let src = bytes[4];
        let dst = bytes[5];
        let seq = u16::from_le_bytes([bytes[6], bytes[7]]);
        let flags = Flags(u16::from_le_bytes([bytes[8], bytes[9]]));
        let payload_len = u16::from_le_bytes([bytes[10], bytes[11]]);
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLarge);
        }
        let reserved_a = u16::from_le_bytes([bytes[12], bytes[13]]);
        let reserved_b = u16::from_le_bytes([bytes[14], bytes[15]]);
        if reserved_a != 0 || reserved_b != 0 {
            return Err(Error::ReservedFieldNonzero);
        }
        Ok(Header {
            kind,
            src,
            dst,
            seq,
            flags,
            payload_len,
        })
    }

    /// Serializes the header into the first 16 bytes of `out`.
    ///
    /// # Panics
    /// Panics if `out` is shorter than [`HEADER_LEN`]; callers always size the
    /// destination buffer before calling this.
    pub fn write_into(&self, out: &mut [u8]) {
        assert!(out.len() >= HEADER_LEN, "header output buffer too small");
        out[0..2].copy_from_slice(&MAGIC.to_le_bytes());
        out[2] = VERSION;
        out[3] = self.kind.into();
        out[4] = self.src;
        out[5] = self.dst;
        out[6..8].copy_from_slice(&self.seq.to_le_bytes());
        out[8..10].copy_from_slice(&self.flags.0.to_le_bytes());
        out[10..12].copy_from_slice(&self.payload_len.to_le_bytes());
        out[12..14].copy_from_slice(&0u16.to_le_bytes());
        out[14..16].copy_from_slice(&0u16.to_le_bytes());
    }
}
