//! Library surface for the gateway binary; split out so integration tests can
//! drive the event loop and its components directly instead of through a
//! subprocess.

pub mod config;
pub mod error;
pub mod event_loop;
pub mod ring;
pub mod router;
pub mod serial;
pub mod tcp;
