//! A single serial link: raw RX accumulator, embedded SLIP decoder, TX ring.
//!
//! Generic over its transport (`T: Read + Write + AsRawFd`) so that tests can
//! drive the same decode/encode/ring logic over an in-memory duplex pipe
//! standing in for a UART; the gateway binary only ever instantiates
//! `SerialEndpoint<TTYPort>`.

use std::io::{self, Read, Write};
use std::os::unix::io::{AsRawFd, RawFd};

use gateway_proto::frame::MAX_FRAME_LEN;
use gateway_proto::slip::{self, Decoder};
use serialport::TTYPort;
use tracing::{debug, warn};

use crate::ring::RingBuffer;

/// Raw RX buffer capacity; must hold at least one max-size encoded frame.
const RX_BUF_CAPACITY: usize = 4096;
/// TX ring capacity (one byte of which is always reserved, see [`RingBuffer`]).
const TX_RING_CAPACITY: usize = 8192;
/// SLIP decoder output buffer capacity: max frame size plus slack.
const DECODE_BUF_CAPACITY: usize = MAX_FRAME_LEN + 64;

pub struct SerialEndpoint<T> {
    port: T,
    link_index: usize,
    rx_buf: Vec<u8>,
    rx_len: usize,
    decoder: Decoder<DECODE_BUF_CAPACITY>,
    tx_ring: RingBuffer,
    tx_scratch: Vec<u8>,
}

impl SerialEndpoint<TTYPort> {
    pub fn open(link_index: usize, path: &str, baud: u32) -> io::Result<Self> {
        let port = serialport::new(path, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(std::time::Duration::from_millis(0))
            .open_native()?;
        port.set_exclusive(false).ok();
        Ok(Self::from_transport(link_index, port))
    }
}

impl<T: Read + Write + AsRawFd> SerialEndpoint<T> {
    /// Wraps an already-open, already-nonblocking transport. Production code
    /// reaches this only through [`SerialEndpoint::open`]; tests construct a
    /// `SerialEndpoint<std::os::unix::net::UnixStream>` directly to exercise
    /// the decode/encode/ring logic without a real serial device.
    pub fn from_transport(link_index: usize, port: T) -> Self {
        SerialEndpoint {
            port,
            link_index,
            rx_buf: vec![0u8; RX_BUF_CAPACITY],
            rx_len: 0,
            decoder: Decoder::new(),
            tx_ring: RingBuffer::with_capacity(TX_RING_CAPACITY),
            tx_scratch: vec![0u8; slip::encoded_len_upper_bound(MAX_FRAME_LEN)],
        }
    }

    pub fn link_index(&self) -> usize {
        self.link_index
    }

    pub fn wants_writable(&self) -> bool {
        !self.tx_ring.is_empty()
    }

    /// Reads as much as is available, decodes every complete SLIP frame it
    /// finds, and invokes `on_frame` with each one's raw (still-framed) bytes.
    ///
    /// Mirrors the documented "discard the raw accumulator after each decode
    /// pass" contract: buffered bytes are not retained across read calls
    /// beyond what the embedded decoder's own state already carries forward.
    pub fn poll_readable(&mut self, mut on_frame: impl FnMut(&[u8])) -> io::Result<()> {
        if self.rx_len == self.rx_buf.len() {
            warn!(link = self.link_index, "serial RX buffer saturated, resetting");
            self.rx_len = 0;
        }

        let read = match self.port.read(&mut self.rx_buf[self.rx_len..]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(e) => return Err(e),
        };
        if read == 0 {
            return Ok(());
        }
        self.rx_len += read;

        let decoder = &mut self.decoder;
        decoder.feed_all(&self.rx_buf[..self.rx_len], |frame| on_frame(frame));
        self.rx_len = 0;

        Ok(())
    }

    /// Flushes one contiguous run from the TX ring to the port.
    pub fn poll_writable(&mut self) -> io::Result<()> {
        let run = self.tx_ring.readable_run();
        if run.is_empty() {
            return Ok(());
        }
        let written = match self.port.write(run) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => 0,
            Err(e) => return Err(e),
        };
        self.tx_ring.advance(written);
        Ok(())
    }

    /// SLIP-encodes an already-sealed frame and enqueues it for transmission.
    /// Returns `false` (and leaves the ring untouched) if it does not fit.
    pub fn enqueue_frame(&mut self, frame_bytes: &[u8]) -> bool {
        let encoded_len = match slip::encode(frame_bytes, &mut self.tx_scratch) {
            Ok(n) => n,
            Err(_) => {
                warn!(link = self.link_index, "frame too large to SLIP-encode, dropping");
                return false;
            }
        };
        if !self.tx_ring.enqueue(&self.tx_scratch[..encoded_len]) {
            warn!(link = self.link_index, "TX ring full, dropping frame");
            return false;
        }
        debug!(link = self.link_index, bytes = encoded_len, "frame enqueued for TX");
        true
    }

    pub fn decoder_frames(&self) -> u64 {
        self.decoder.frames()
    }

    pub fn decoder_drops(&self) -> u64 {
        self.decoder.drops()
    }
}

impl<T: AsRawFd> AsRawFd for SerialEndpoint<T> {
    fn as_raw_fd(&self) -> RawFd {
        self.port.as_raw_fd()
    }
}
