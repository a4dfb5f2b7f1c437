//! Error type shared by the header, frame and SLIP codecs.

#[cfg(feature = "thiserror")]
use thiserror::Error;

/// Everything that can go wrong decoding bytes into a validated [`crate::frame::Frame`].
#[cfg_attr(feature = "thiserror", derive(Error))]
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// Fewer bytes were supplied than the minimum possible frame size.
    #[cfg_attr(feature = "thiserror", error("frame shorter than the minimum header+crc size"))]
    IncompleteFrame,
    /// The header magic did not match `0xEC10`.
    #[cfg_attr(feature = "thiserror", error("bad magic"))]
    BadMagic,
    /// The header version byte was not `1`.
    #[cfg_attr(feature = "thiserror", error("unsupported version"))]
    BadVersion,
    /// One of the two reserved header fields was nonzero.
    #[cfg_attr(feature = "thiserror", error("reserved header field was nonzero"))]
    ReservedFieldNonzero,
    /// `payload_length` exceeded the 1024-byte cap.
    #[cfg_attr(feature = "thiserror", error("payload length exceeds maximum"))]
    PayloadTooLarge,
    /// The byte slice length did not equal `16 + payload_length + 2`.
    #[cfg_attr(feature = "thiserror", error("frame length does not match header payload length"))]
    LengthMismatch,
    /// The trailing CRC did not match the recomputed checksum.
    #[cfg_attr(feature = "thiserror", error("CRC mismatch"))]
    InvalidCrc,
    /// A buffer was too small for the requested operation.
    #[cfg_attr(feature = "thiserror", error("buffer too small"))]
    BufferTooSmall,
}
