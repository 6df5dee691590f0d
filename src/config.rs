//! Configuration for the mDNS engine.
//!
//! # Examples
//!
//! ```rust
//! use mdns_engine::EngineConfig;
//! use std::net::Ipv4Addr;
//!
//! let config = EngineConfig::default()
//!     .with_local_v4(Ipv4Addr::new(192, 168, 1, 100));
//! ```

use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// First interval between a subscriber's repeated PTR queries (1 second).
pub(crate) const INITIAL_QUERY_INTERVAL: Duration = Duration::from_secs(1);

/// Cap on the subscriber's exponential query back-off (60 seconds).
pub(crate) const DEFAULT_QUERY_BACKOFF_CAP: Duration = Duration::from_secs(60);

/// TTL for SRV and address records (120 seconds, RFC 6762 §10).
pub(crate) const SHORT_TTL: u32 = 120;

/// TTL for PTR and TXT records (75 minutes, RFC 6762 §10).
pub(crate) const LONG_TTL: u32 = 4500;

/// Configuration for an [`Engine`](crate::Engine).
///
/// The local addresses are what the engine advertises in the shared
/// address placeholder records; a transceiver that knows per-interface
/// addresses may substitute its own at send time.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// IPv4 address advertised for the local host, if any.
    pub local_v4: Option<Ipv4Addr>,

    /// IPv6 address advertised for the local host, if any.
    pub local_v6: Option<Ipv6Addr>,

    /// Cap on the subscriber's exponential PTR query back-off.
    ///
    /// Default: 60 seconds.
    pub query_backoff_cap: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            local_v4: None,
            local_v6: None,
            query_backoff_cap: DEFAULT_QUERY_BACKOFF_CAP,
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the IPv4 address advertised for the local host.
    pub fn with_local_v4(mut self, addr: Ipv4Addr) -> Self {
        self.local_v4 = Some(addr);
        self
    }

    /// Set the IPv6 address advertised for the local host.
    pub fn with_local_v6(mut self, addr: Ipv6Addr) -> Self {
        self.local_v6 = Some(addr);
        self
    }

    /// Set the cap on the subscriber query back-off.
    ///
    /// A value of zero restores the default (60 seconds).
    pub fn with_query_backoff_cap(mut self, cap: Duration) -> Self {
        self.query_backoff_cap = if cap == Duration::ZERO {
            DEFAULT_QUERY_BACKOFF_CAP
        } else {
            cap
        };
        self
    }
}
