//! Single-threaded, readiness-driven multiplexer binding serial links to the
//! TCP client segment.

use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::time::Duration;

use gateway_proto::frame::Frame;
use mio::net::TcpListener;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use crate::router;
use crate::serial::SerialEndpoint;
use crate::tcp::ClientTable;

/// Soft poll timeout; bounds how long an otherwise-idle loop can go without
/// waking up. Not required for correctness, only for periodic housekeeping.
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

const LISTENER_TOKEN: Token = Token(0);
const SERIAL_TOKEN_BASE: usize = 1;
const CLIENT_TOKEN_BASE: usize = SERIAL_TOKEN_BASE + router::LINK_COUNT;

fn client_token(slot: usize) -> Token {
    Token(CLIENT_TOKEN_BASE + slot)
}

fn serial_token(link: usize) -> Token {
    Token(SERIAL_TOKEN_BASE + link)
}

pub struct EventLoop<T: Read + Write + AsRawFd> {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    serial: Vec<SerialEndpoint<T>>,
    clients: ClientTable,
    serial_writable_armed: Vec<bool>,
}

impl<T: Read + Write + AsRawFd> EventLoop<T> {
    pub fn new(mut listener: TcpListener, mut serial: Vec<SerialEndpoint<T>>, max_clients: usize) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(&mut listener, LISTENER_TOKEN, Interest::READABLE)?;

        for endpoint in &mut serial {
            let fd = endpoint.as_raw_fd();
            let token = serial_token(endpoint.link_index());
            poll.registry()
                .register(&mut SourceFd(&fd), token, Interest::READABLE)?;
        }

        let serial_count = serial.len();
        Ok(EventLoop {
            poll,
            events: Events::with_capacity(128),
            listener,
            serial,
            clients: ClientTable::with_capacity(max_clients),
            serial_writable_armed: vec![false; serial_count],
        })
    }

    /// Runs until `should_stop` returns true (checked once per wake).
    pub fn run(&mut self, mut should_stop: impl FnMut() -> bool) -> io::Result<()> {
        while !should_stop() {
            match self.poll.poll(&mut self.events, Some(POLL_TIMEOUT)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }

            let tokens: Vec<Token> = self.events.iter().map(|e| e.token()).collect();
            for token in tokens {
                self.dispatch(token);
            }

            self.rearm_writable_interests()?;
        }
        Ok(())
    }

    fn dispatch(&mut self, token: Token) {
        if token == LISTENER_TOKEN {
            self.accept_all();
        } else if token.0 >= SERIAL_TOKEN_BASE && token.0 < CLIENT_TOKEN_BASE {
            self.service_serial(token.0 - SERIAL_TOKEN_BASE);
        } else {
            self.service_client(token.0 - CLIENT_TOKEN_BASE);
        }
    }

    fn accept_all(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, addr)) => match self.clients.insert(stream) {
                    Some(slot) => {
                        let token = client_token(slot);
                        let client = self.clients.get_mut(slot).expect("just inserted");
                        match self.poll.registry().register(&mut client.stream, token, Interest::READABLE) {
                            Ok(()) => info!(slot, %addr, "client connected"),
                            Err(e) => {
                                warn!(%addr, error = %e, "failed to register client, dropping");
                                self.clients.remove(slot);
                            }
                        }
                    }
                    None => warn!(%addr, "client table full, closing connection"),
                },
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    fn service_serial(&mut self, link: usize) {
        let endpoint = match self.serial.iter_mut().find(|e| e.link_index() == link) {
            Some(e) => e,
            None => return,
        };

        let mut to_broadcast: Vec<Vec<u8>> = Vec::new();
        if let Err(e) = endpoint.poll_readable(|frame| to_broadcast.push(frame.to_vec())) {
            warn!(link, error = %e, "serial read error");
        }
        if let Err(e) = endpoint.poll_writable() {
            warn!(link, error = %e, "serial write error");
        }

        for raw in to_broadcast {
            match Frame::parse(&raw) {
                Ok(_frame) => {
                    for (slot, client) in self.clients.iter_mut() {
                        if let Err(e) = client.send_frame(&raw) {
                            warn!(slot, error = %e, "broadcast write failed");
                        }
                    }
                }
                Err(e) => {
                    debug!(link, ?e, "dropping invalid frame from serial link");
                }
            }
        }
    }

    fn service_client(&mut self, slot: usize) {
        let mut to_route: Vec<Vec<u8>> = Vec::new();
        let alive = {
            let client = match self.clients.get_mut(slot) {
                Some(c) => c,
                None => return,
            };
            match client.poll_readable(|frame| to_route.push(frame.to_vec())) {
                Ok(alive) => alive,
                Err(e) => {
                    debug!(slot, error = %e, "client protocol error, evicting");
                    false
                }
            }
        };

        for raw in &to_route {
            match Frame::parse(raw) {
                Ok(frame) => match router::route(frame.header.dst) {
                    Some(link) => {
                        if let Some(endpoint) = self.serial.iter_mut().find(|e| e.link_index() == link) {
                            endpoint.enqueue_frame(raw);
                        }
                    }
                    None => {
                        debug!(dst = frame.header.dst, "no route for destination, dropping");
                    }
                },
                Err(e) => {
                    debug!(slot, ?e, "dropping invalid frame from client");
                }
            }
        }

        if !alive {
            info!(slot, "client disconnected");
            self.clients.remove(slot);
        }
    }

    /// Exposes a serial link's decoder drop counter, for tests and diagnostics.
    pub fn serial_decoder_drops(&self, link: usize) -> Option<u64> {
        self.serial.iter().find(|e| e.link_index() == link).map(|e| e.decoder_drops())
    }

    fn rearm_writable_interests(&mut self) -> io::Result<()> {
        for endpoint in &self.serial {
            let link = endpoint.link_index();
            let wants = endpoint.wants_writable();
            if wants != self.serial_writable_armed[link] {
                let interest = if wants {
                    Interest::READABLE | Interest::WRITABLE
                } else {
                    Interest::READABLE
                };
                let fd = endpoint.as_raw_fd();
                self.poll
                    .registry()
                    .reregister(&mut SourceFd(&fd), serial_token(link), interest)?;
                self.serial_writable_armed[link] = wants;
            }
        }
        Ok(())
    }
}
