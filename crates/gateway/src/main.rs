//! # ECU gateway
//!
//! Bridges serial links carrying framed messages to and from an embedded
//! control node, to a TCP segment on which PC clients exchange the same
//! messages.
//!
//! ## Responsibilities
//!
//! The gateway is responsible for:
//!
//! *   Validating frame headers and CRCs on both wires.
//! *   Decoding and encoding the SLIP byte-stuffing transport on serial links.
//! *   Routing TCP-originated frames to the correct serial link by destination address.
//! *   Broadcasting serial-originated frames to every connected TCP client.
//!
//! ## Concurrency
//!
//! The gateway runs on a single cooperative thread driven by one OS-level
//! readiness primitive; there is no background worker and no shared mutable
//! state across threads.

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gateway::config::{self, Cli, GatewayConfig};
use gateway::error::GatewayError;
use gateway::event_loop::EventLoop;
use gateway::{router, serial};
use gateway_proto::frame::{build_frame, MAX_FRAME_LEN};
use gateway_proto::header::{Flags, MessageKind, ADDR_GATEWAY};
use mio::net::TcpListener;
use tracing::{error, info};

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(config::verbosity_filter(cli.verbose))
        .init();

    let config = GatewayConfig::from(cli);

    match run(config) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!(error = %e, "gateway exiting");
            std::process::exit(exit_code_for(&e));
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<GatewayError>().map(GatewayError::exit_code).unwrap_or(1)
}

fn run(config: GatewayConfig) -> Result<()> {
    info!(port = config.port, baud = config.baud, "starting gateway");

    let mut serial_endpoints = Vec::with_capacity(router::LINK_COUNT);
    for (link_index, path) in config.serial_ports.iter().enumerate() {
        let endpoint = serial::SerialEndpoint::open(link_index, path, config.baud)
            .map_err(|source| GatewayError::SerialOpen {
                path: path.clone(),
                source,
            })
            .with_context(|| format!("opening serial link {link_index} ({path})"))?;
        info!(link = link_index, path, "serial link opened");
        serial_endpoints.push(endpoint);
    }

    if config.send_test {
        return send_test_frame(&mut serial_endpoints);
    }

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let listener = TcpListener::bind(addr)
        .map_err(|source| GatewayError::ListenerBind { port: config.port, source })
        .with_context(|| format!("binding TCP listener on port {}", config.port))?;
    info!(port = config.port, "listening for clients");

    let mut event_loop = EventLoop::new(listener, serial_endpoints, config.max_clients)
        .map_err(GatewayError::PollCreate)
        .context("creating event loop")?;

    let shutdown = install_shutdown_signal()?;
    event_loop.run(|| shutdown.load(Ordering::Relaxed))?;

    info!("shutdown signal observed, exiting");
    Ok(())
}

/// Encodes and enqueues a single self-test frame on link 0, flushes it, and
/// exits. A quick way to verify a serial cable without a live ECU attached.
fn send_test_frame(serial: &mut [serial::SerialEndpoint<serialport::TTYPort>]) -> Result<()> {
    let Some(link0) = serial.first_mut() else {
        anyhow::bail!("no serial links configured");
    };
    let mut buf = [0u8; MAX_FRAME_LEN];
    let n = build_frame(MessageKind::Heartbeat, ADDR_GATEWAY, 1, 0, Flags::default(), b"selftest", &mut buf)?;
    if !link0.enqueue_frame(&buf[..n]) {
        anyhow::bail!("self-test frame did not fit in the TX ring");
    }
    for _ in 0..100 {
        link0.poll_writable()?;
        if !link0.wants_writable() {
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(10));
    }
    info!("self-test frame sent");
    Ok(())
}

fn install_shutdown_signal() -> Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = flag.clone();
    ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed))
        .context("installing SIGINT/SIGTERM handler")?;
    Ok(flag)
}
