//! Static, compile-time address-to-serial-link routing table.

use gateway_proto::header::{ADDR_BROADCAST, ADDR_GATEWAY};

/// Number of serial links the gateway bridges.
pub const LINK_COUNT: usize = 3;

/// Maps a node address to a serial link index, or `None` if the address is
/// not routable from the TCP side (broadcast, the gateway's own address, or
/// any address outside the known node set).
pub fn route(dst: u8) -> Option<usize> {
    match dst {
        1 => Some(0),
        2 => Some(1),
        3 => Some(2),
        ADDR_BROADCAST | ADDR_GATEWAY => None,
        _ => None,
    }
}
