//! Whole-frame construction and validation: header + opaque payload + CRC trailer.

use crate::crc::{crc16_ccitt_update, crc16_ccitt};
use crate::error::Error;
use crate::header::{Flags, Header, MessageKind, CRC_LEN, HEADER_LEN, MAX_PAYLOAD_LEN};

/// Largest possible frame on the wire: header + max payload + CRC.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD_LEN as usize + CRC_LEN;

/// A validated frame: a header plus a borrowed payload slice.
///
/// `Frame` never owns its payload; callers that need to hold a frame across
/// a buffer reuse must copy the payload out first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame<'a> {
    pub header: Header,
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Validates a complete frame (header + payload + CRC trailer) in `bytes`.
    ///
    /// Checks, in order: minimum length, header validity, exact length against
    /// the header's declared payload length, and the trailing CRC.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, Error> {
        if bytes.len() < HEADER_LEN + CRC_LEN {
            return Err(Error::IncompleteFrame);
        }
        let header = Header::parse(&bytes[..HEADER_LEN])?;
        let expected_len = HEADER_LEN + header.payload_len as usize + CRC_LEN;
        if bytes.len() != expected_len {
            return Err(Error::LengthMismatch);
        }
        let payload = &bytes[HEADER_LEN..HEADER_LEN + header.payload_len as usize];
        let crc_offset = HEADER_LEN + header.payload_len as usize;
        let received_crc = u16::from_le_bytes([bytes[crc_offset], bytes[crc_offset + 1]]);
        let computed_crc = crc16_ccitt_update(crc16_ccitt(&bytes[..HEADER_LEN]), payload);
        if received_crc != computed_crc {
            return Err(Error::InvalidCrc);
        }
        Ok(Frame { header, payload })
    }
}

/// Serializes a header and payload into `out`, appending the CRC trailer.
///
/// Returns the number of bytes written, or [`Error::BufferTooSmall`] if `out`
/// cannot hold `16 + payload.len() + 2` bytes, or [`Error::PayloadTooLarge`]
/// if the payload exceeds the protocol cap.
pub fn build_frame(
    kind: MessageKind,
    src: u8,
    dst: u8,
    seq: u16,
    flags: Flags,
    payload: &[u8],
    out: &mut [u8],
) -> Result<usize, Error> {
    if payload.len() > MAX_PAYLOAD_LEN as usize {
        return Err(Error::PayloadTooLarge);
    }
    let total = HEADER_LEN + payload.len() + CRC_LEN;
    if out.len() < total {
        return Err(Error::BufferTooSmall);
    }
    let header = Header::new(kind, src, dst, seq, flags, payload.len() as u16)?;
    header.write_into(&mut out[..HEADER_LEN]);
    out[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(payload);
    let crc = crc16_ccitt_update(crc16_ccitt(&out[..HEADER_LEN]), payload);
    out[HEADER_LEN + payload.len()..total].copy_from_slice(&crc.to_le_bytes());
    Ok(total)
}
