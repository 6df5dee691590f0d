//! The link-local multicast I/O contract the engine binds to.
//!
//! The engine never touches sockets itself. It hands every outbound
//! [`Message`] to a [`Transceiver`] and is fed inbound traffic through
//! [`Engine::receive_message`](crate::Engine::receive_message) by whatever
//! drives the transceiver (see `demos/` for a tokio driver and the
//! integration tests for an in-memory one).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::message::Message;

/// The mDNS IPv4 multicast group address (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The mDNS IPv6 multicast group address (ff02::fb).
pub const MDNS_MULTICAST_IPV6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// The standard mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 multicast destination address (224.0.0.251:5353).
pub const MDNS_DEST_ADDR_V4: SocketAddr =
    SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

/// mDNS IPv6 multicast destination address ([ff02::fb]:5353).
pub const MDNS_DEST_ADDR_V6: SocketAddr =
    SocketAddr::new(IpAddr::V6(MDNS_MULTICAST_IPV6), MDNS_PORT);

/// Address family of an enabled interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// Interface index meaning "every enabled interface".
pub const ALL_INTERFACES: u32 = 0;

/// Link-local multicast I/O, implemented outside the engine.
///
/// All methods are invoked from the engine's single-threaded context.
pub trait Transceiver {
    /// Marks a link-local interface for use. May be called before
    /// [`start`](Transceiver::start).
    fn enable_interface(&mut self, name: &str, family: AddressFamily);

    /// Joins the mDNS multicast groups on every enabled interface and binds
    /// UDP port 5353. Returns false if no interface could be initialized.
    ///
    /// `host_full_name` is the name the engine answers for; transceivers
    /// that substitute per-interface addresses into outbound address
    /// records need it to find those records.
    fn start(&mut self, host_full_name: &str) -> bool;

    /// Serializes `message` and sends it to `dest` on the given interface
    /// ([`ALL_INTERFACES`] for all of them).
    ///
    /// When `dest` is [`MDNS_DEST_ADDR_V4`], a V6-capable transceiver
    /// substitutes [`MDNS_DEST_ADDR_V6`] for its V6 sockets.
    fn send_message(&mut self, message: &Message, dest: SocketAddr, interface: u32);

    /// Leaves the multicast groups and closes the sockets.
    fn stop(&mut self);
}
