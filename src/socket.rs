//! Socket utilities for mDNS transceivers.
//!
//! This module provides [`MulticastSocket`], a builder for creating UDP
//! sockets that have already joined the mDNS multicast group for their
//! family. Transceiver implementations wrap one socket per enabled
//! interface/family.
//!
//! # Example
//!
//! ```rust,ignore
//! use mdns_engine::{AddressFamily, MulticastSocket};
//!
//! let std_socket = MulticastSocket::new().into_std()?;
//!
//! // For tokio:
//! let socket = tokio::net::UdpSocket::from_std(std_socket)?;
//! ```

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use socket2::{Domain, Protocol, Socket, Type};

use crate::transceiver::{AddressFamily, MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT};

/// A builder for mDNS-ready multicast UDP sockets.
///
/// The resulting socket is:
///
/// - Bound to port 5353 (or a configured port)
/// - Configured with `SO_REUSEADDR` (and `SO_REUSEPORT` where supported)
/// - Set to non-blocking mode for async compatibility
/// - Joined to the mDNS multicast group of its family
#[derive(Debug, Clone)]
pub struct MulticastSocket {
    family: AddressFamily,
    local_port: Option<u16>,
    interface_v4: Option<Ipv4Addr>,
    interface_v6: Option<u32>,
}

impl Default for MulticastSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl MulticastSocket {
    /// Creates a builder for an IPv4 mDNS socket.
    pub fn new() -> Self {
        Self {
            family: AddressFamily::V4,
            local_port: None,
            interface_v4: None,
            interface_v6: None,
        }
    }

    /// Selects the address family. Defaults to [`AddressFamily::V4`].
    pub fn with_family(mut self, family: AddressFamily) -> Self {
        self.family = family;
        self
    }

    /// Binds to a port other than 5353. Mostly useful in tests.
    pub fn with_local_port(mut self, port: u16) -> Self {
        self.local_port = Some(port);
        self
    }

    /// Joins the group on a specific IPv4 interface instead of
    /// `INADDR_ANY`.
    pub fn with_interface_v4(mut self, interface: Ipv4Addr) -> Self {
        self.interface_v4 = Some(interface);
        self
    }

    /// Joins the group on a specific interface index (V6 only).
    pub fn with_interface_v6(mut self, interface: u32) -> Self {
        self.interface_v6 = Some(interface);
        self
    }

    /// Converts this builder into a configured `std::net::UdpSocket`.
    ///
    /// # Errors
    ///
    /// Returns an error if socket creation, binding, option setting, or
    /// the multicast join fails.
    pub fn into_std(self) -> io::Result<UdpSocket> {
        let domain = match self.family {
            AddressFamily::V4 => Domain::IPV4,
            AddressFamily::V6 => Domain::IPV6,
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;

        socket.set_reuse_address(true)?;

        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;

        socket.set_nonblocking(true)?;

        let port = self.local_port.unwrap_or(MDNS_PORT);

        match self.family {
            AddressFamily::V4 => {
                let local_ip = if cfg!(target_os = "linux") {
                    IpAddr::V4(MDNS_MULTICAST_IPV4)
                } else {
                    // Binding the group address only works on Linux; other
                    // platforms need the wildcard.
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
                };
                socket.bind(&SocketAddr::new(local_ip, port).into())?;

                let iface = self.interface_v4.unwrap_or(Ipv4Addr::UNSPECIFIED);
                socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &iface)?;
            }
            AddressFamily::V6 => {
                socket.set_only_v6(true)?;
                socket.bind(
                    &SocketAddr::new(IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED), port).into(),
                )?;

                let iface = self.interface_v6.unwrap_or(0);
                socket.join_multicast_v6(&MDNS_MULTICAST_IPV6, iface)?;
            }
        }

        Ok(socket.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multicast_constants() {
        assert_eq!(MDNS_MULTICAST_IPV4, Ipv4Addr::new(224, 0, 0, 251));
        assert_eq!(MDNS_MULTICAST_IPV6.segments()[0], 0xff02);
        assert_eq!(MDNS_PORT, 5353);
    }

    #[test]
    fn test_multicast_socket_builder() {
        let builder = MulticastSocket::new().with_local_port(5353);
        assert_eq!(builder.family, AddressFamily::V4);
        assert_eq!(builder.local_port, Some(5353));
        assert!(builder.interface_v4.is_none());
    }

    #[test]
    fn test_multicast_socket_v6_builder() {
        let builder = MulticastSocket::new()
            .with_family(AddressFamily::V6)
            .with_interface_v6(2);
        assert_eq!(builder.family, AddressFamily::V6);
        assert_eq!(builder.interface_v6, Some(2));
    }

    // Socket creation tests would require network access and might
    // conflict with other mDNS services, so we keep them minimal.
}
