//! TCP client slots and length-prefix framing for the PC-client segment.

use std::io::{self, Read, Write};

use gateway_proto::frame::MAX_FRAME_LEN;
use mio::net::TcpStream;
use tracing::warn;

const RX_ACCUMULATOR_CAPACITY: usize = 8192;
const LENGTH_PREFIX_LEN: usize = 4;

pub struct TcpClientSlot {
    pub stream: TcpStream,
    rx_buf: Vec<u8>,
    rx_len: usize,
}

impl TcpClientSlot {
    pub fn new(stream: TcpStream) -> Self {
        TcpClientSlot {
            stream,
            rx_buf: vec![0u8; RX_ACCUMULATOR_CAPACITY],
            rx_len: 0,
        }
    }

    /// Reads available bytes and extracts every complete length-prefixed
    /// frame currently buffered, invoking `on_frame` with each one's raw
    /// bytes (header + payload + CRC, no length prefix). Returns `Ok(false)`
    /// on a clean disconnect (zero-byte read).
    pub fn poll_readable(&mut self, mut on_frame: impl FnMut(&[u8])) -> io::Result<bool> {
        if self.rx_len == self.rx_buf.len() {
            warn!("TCP client RX buffer saturated without a complete frame, disconnecting");
            return Ok(false);
        }
        let read = match self.stream.read(&mut self.rx_buf[self.rx_len..]) {
            Ok(0) => return Ok(false),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(true),
            Err(e) => return Err(e),
        };
        self.rx_len += read;

        loop {
            match self.try_extract_frame() {
                Ok(Some(len)) => {
                    on_frame(&self.rx_buf[LENGTH_PREFIX_LEN..LENGTH_PREFIX_LEN + len]);
                    let consumed = LENGTH_PREFIX_LEN + len;
                    self.rx_buf.copy_within(consumed..self.rx_len, 0);
                    self.rx_len -= consumed;
                }
                Ok(None) => break,
                Err(()) => {
                    self.rx_len = 0;
                    return Err(io::Error::new(io::ErrorKind::InvalidData, "bad TCP length prefix"));
                }
            }
        }
        Ok(true)
    }

    fn try_extract_frame(&self) -> Result<Option<usize>, ()> {
        if self.rx_len < LENGTH_PREFIX_LEN {
            return Ok(None);
        }
        let len = u32::from_le_bytes([
            self.rx_buf[0],
            self.rx_buf[1],
            self.rx_buf[2],
            self.rx_buf[3],
        ]) as usize;
        if len == 0 || len > MAX_FRAME_LEN {
            return Err(());
        }
        if self.rx_len < LENGTH_PREFIX_LEN + len {
            return Ok(None);
        }
        Ok(Some(len))
    }

    /// Writes a length-prefixed frame. Best-effort: a short write is not
    /// retried (see the broadcast tradeoff documented at the call site).
    pub fn send_frame(&mut self, frame_bytes: &[u8]) -> io::Result<()> {
        let len = (frame_bytes.len() as u32).to_le_bytes();
        match self.stream.write(&len) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
            Err(e) => return Err(e),
        }
        match self.stream.write(frame_bytes) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Fixed-capacity table of connected client slots.
pub struct ClientTable {
    slots: Vec<Option<TcpClientSlot>>,
}

impl ClientTable {
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        ClientTable { slots }
    }

    /// Inserts a newly accepted client into the first free slot, returning
    /// its slot index, or `None` (and dropping `stream`) if the table is full.
    pub fn insert(&mut self, stream: TcpStream) -> Option<usize> {
        let idx = self.slots.iter().position(|s| s.is_none())?;
        self.slots[idx] = Some(TcpClientSlot::new(stream));
        Some(idx)
    }

    pub fn remove(&mut self, idx: usize) {
        self.slots[idx] = None;
    }

    pub fn get_mut(&mut self, idx: usize) -> Option<&mut TcpClientSlot> {
        self.slots[idx].as_mut()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut TcpClientSlot)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|slot| (i, slot)))
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
