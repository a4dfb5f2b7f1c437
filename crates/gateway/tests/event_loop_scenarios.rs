//! Drives the whole event loop with real loopback TCP clients and in-memory
//! duplex pipes standing in for the three serial links, covering the
//! documented end-to-end scenarios.

use std::io::{Read, Write};
use std::net::TcpStream as StdTcpStream;
use std::os::unix::net::UnixStream;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use gateway::event_loop::EventLoop;
use gateway::router;
use gateway::serial::SerialEndpoint;
use gateway_proto::frame::build_frame;
use gateway_proto::header::{Flags, MessageKind, ADDR_GATEWAY};
use gateway_proto::slip;
use mio::net::TcpListener;

/// Gives the background event-loop thread a poll tick (it wakes at least
/// every 100ms) to process an accept, a serial read, or a client read.
fn settle() {
    std::thread::sleep(Duration::from_millis(150));
}

struct Harness {
    addr: std::net::SocketAddr,
    devices: Vec<UnixStream>,
    shutdown: Arc<AtomicBool>,
    handle: JoinHandle<EventLoop<UnixStream>>,
}

impl Harness {
    fn spawn(max_clients: usize) -> Self {
        let mut near = Vec::with_capacity(router::LINK_COUNT);
        let mut devices = Vec::with_capacity(router::LINK_COUNT);
        for link in 0..router::LINK_COUNT {
            let (near_end, device_end) = UnixStream::pair().unwrap();
            near_end.set_nonblocking(true).unwrap();
            device_end.set_nonblocking(true).unwrap();
            near.push(SerialEndpoint::from_transport(link, near_end));
            devices.push(device_end);
        }

        let listener = TcpListener::bind(([127, 0, 0, 1], 0).into()).unwrap();
        let addr = listener.local_addr().unwrap();

        let event_loop = EventLoop::new(listener, near, max_clients).unwrap();
        let shutdown = Arc::new(AtomicBool::new(false));
        let handler_flag = shutdown.clone();
        let handle = std::thread::spawn(move || {
            let mut event_loop = event_loop;
            event_loop.run(|| handler_flag.load(Ordering::Relaxed)).unwrap();
            event_loop
        });

        Harness { addr, devices, shutdown, handle }
    }

    fn connect_client(&self) -> StdTcpStream {
        let stream = StdTcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
        stream
    }

    fn stop(self) -> EventLoop<UnixStream> {
        self.shutdown.store(true, Ordering::Relaxed);
        self.handle.join().unwrap()
    }
}

fn send_length_prefixed(stream: &mut StdTcpStream, frame_bytes: &[u8]) {
    stream.write_all(&(frame_bytes.len() as u32).to_le_bytes()).unwrap();
    stream.write_all(frame_bytes).unwrap();
}

/// Reads exactly one length-prefixed frame, failing the test on timeout.
fn recv_length_prefixed(stream: &mut StdTcpStream) -> Vec<u8> {
    let mut len_bytes = [0u8; 4];
    stream.read_exact(&mut len_bytes).unwrap();
    let len = u32::from_le_bytes(len_bytes) as usize;
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).unwrap();
    body
}

/// Drains whatever is currently available on a device end, without blocking.
fn drain_nonblocking(device: &mut UnixStream) -> Vec<u8> {
    let mut buf = [0u8; 4096];
    let mut out = Vec::new();
    loop {
        match device.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
        }
    }
    out
}

fn telemetry_frame() -> Vec<u8> {
    // uptime_ms, status_flags, error_code, voltage, current, temperature, rpm
    let mut payload = Vec::with_capacity(24);
    payload.extend_from_slice(&12_345_678u32.to_le_bytes());
    payload.extend_from_slice(&3u16.to_le_bytes());
    payload.extend_from_slice(&0u16.to_le_bytes());
    payload.extend_from_slice(&48.25f32.to_le_bytes());
    payload.extend_from_slice(&12.5f32.to_le_bytes());
    payload.extend_from_slice(&36.75f32.to_le_bytes());
    payload.extend_from_slice(&2950.0f32.to_le_bytes());
    assert_eq!(payload.len(), 24);

    let mut buf = [0u8; 64];
    let n = build_frame(MessageKind::Telemetry, 2, ADDR_GATEWAY, 100, Flags::default(), &payload, &mut buf).unwrap();
    buf[..n].to_vec()
}

fn command_frame(dst: u8, seq: u16) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4);
    payload.extend_from_slice(&7u16.to_le_bytes()); // command_id
    payload.extend_from_slice(&0u16.to_le_bytes()); // param_len
    let mut buf = [0u8; 64];
    let n = build_frame(MessageKind::Command, 0, dst, seq, Flags(Flags::ACK_REQUIRED), &payload, &mut buf).unwrap();
    buf[..n].to_vec()
}

#[test]
fn serial_to_tcp_telemetry_hop() {
    let mut harness = Harness::spawn(8);
    let mut client = harness.connect_client();
    settle();

    let raw = telemetry_frame();
    assert_eq!(raw.len(), 42);
    let mut encoded = [0u8; 128];
    let n = slip::encode(&raw, &mut encoded).unwrap();
    harness.devices[1].write_all(&encoded[..n]).unwrap();

    let body = recv_length_prefixed(&mut client);
    assert_eq!(body, raw);

    harness.stop();
}

#[test]
fn tcp_to_serial_command_hop() {
    let mut harness = Harness::spawn(8);
    let mut client = harness.connect_client();
    settle();

    let raw = command_frame(1, 5);
    send_length_prefixed(&mut client, &raw);
    settle();

    let link0_bytes = drain_nonblocking(&mut harness.devices[0]);
    let mut decoder: slip::Decoder<128> = slip::Decoder::new();
    let mut frames = Vec::new();
    decoder.feed_all(&link0_bytes, |f| frames.push(f.to_vec()));
    assert_eq!(frames, vec![raw]);

    assert!(drain_nonblocking(&mut harness.devices[1]).is_empty());
    assert!(drain_nonblocking(&mut harness.devices[2]).is_empty());

    harness.stop();
}

#[test]
fn unknown_route_is_dropped_without_closing_the_client() {
    let mut harness = Harness::spawn(8);
    let mut client = harness.connect_client();
    settle();

    let broadcast_dst = 0u8;
    let raw = command_frame(broadcast_dst, 1);
    send_length_prefixed(&mut client, &raw);
    settle();

    for link in 0..router::LINK_COUNT {
        assert!(drain_nonblocking(&mut harness.devices[link]).is_empty());
    }

    // The connection must still be usable afterwards.
    let follow_up = command_frame(2, 2);
    send_length_prefixed(&mut client, &follow_up);
    settle();
    let link1_bytes = drain_nonblocking(&mut harness.devices[1]);
    let mut decoder: slip::Decoder<128> = slip::Decoder::new();
    let mut frames = Vec::new();
    decoder.feed_all(&link1_bytes, |f| frames.push(f.to_vec()));
    assert_eq!(frames, vec![follow_up]);

    harness.stop();
}

#[test]
fn bad_crc_is_dropped_and_the_client_stays_connected() {
    let mut harness = Harness::spawn(8);
    let mut client = harness.connect_client();
    settle();

    let mut corrupted = command_frame(1, 3);
    *corrupted.last_mut().unwrap() ^= 0xFF;
    send_length_prefixed(&mut client, &corrupted);
    settle();

    for link in 0..router::LINK_COUNT {
        assert!(drain_nonblocking(&mut harness.devices[link]).is_empty());
    }

    let valid = command_frame(1, 4);
    send_length_prefixed(&mut client, &valid);
    settle();
    let link0_bytes = drain_nonblocking(&mut harness.devices[0]);
    let mut decoder: slip::Decoder<128> = slip::Decoder::new();
    let mut frames = Vec::new();
    decoder.feed_all(&link0_bytes, |f| frames.push(f.to_vec()));
    assert_eq!(frames, vec![valid]);

    harness.stop();
}

#[test]
fn slip_resync_after_leading_garbage_is_not_counted_as_a_drop() {
    let mut harness = Harness::spawn(8);
    let mut client = harness.connect_client();
    settle();

    let garbage = [0xAAu8; 50];
    harness.devices[0].write_all(&garbage).unwrap();
    let raw = command_frame(1, 9);
    let mut encoded = [0u8; 128];
    let n = slip::encode(&raw, &mut encoded).unwrap();
    harness.devices[0].write_all(&encoded[..n]).unwrap();
    settle();

    let body = recv_length_prefixed(&mut client);
    assert_eq!(body, raw);

    let event_loop = harness.stop();
    assert_eq!(event_loop.serial_decoder_drops(0), Some(0));
}

#[test]
fn accept_overflow_closes_the_extra_client_without_disturbing_the_rest() {
    let harness = Harness::spawn(8);
    let mut clients: Vec<StdTcpStream> = (0..8).map(|_| harness.connect_client()).collect();
    settle();

    let mut overflow = harness.connect_client();
    overflow.set_read_timeout(Some(Duration::from_millis(500))).unwrap();
    let mut buf = [0u8; 8];
    let outcome = overflow.read(&mut buf);
    assert!(matches!(outcome, Ok(0) | Err(_)), "the 9th connection should be closed, not served");

    let raw = command_frame(1, 11);
    let survivor = &mut clients[0];
    send_length_prefixed(survivor, &raw);
    settle();

    let mut harness = harness;
    let link0_bytes = drain_nonblocking(&mut harness.devices[0]);
    let mut decoder: slip::Decoder<128> = slip::Decoder::new();
    let mut frames = Vec::new();
    decoder.feed_all(&link0_bytes, |f| frames.push(f.to_vec()));
    assert_eq!(frames, vec![raw]);

    harness.stop();
}
