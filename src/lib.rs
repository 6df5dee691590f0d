//! # mdns-engine
//!
//! A sans-I/O multicast DNS (mDNS) engine for Rust, speaking RFC 6762 /
//! RFC 6763 on UDP port 5353.
//!
//! The engine discovers hosts and service instances on the local link,
//! publishes the local host address and service instances, and keeps
//! cached records alive through timed renewal queries. Protocol behavior
//! lives in pluggable *agents* (host-name resolver, instance subscriber,
//! instance publisher, address responder, resource renewer) that share one
//! scheduler; the scheduler coalesces everything due within a 100 ms
//! aggregation window into single outbound messages.
//!
//! ## Sans-I/O design
//!
//! The engine performs no socket I/O and spawns no tasks. The caller is
//! responsible for:
//!
//! 1. Implementing (or wiring up) a [`Transceiver`] that serializes and
//!    sends the messages the engine hands it
//! 2. Feeding received datagrams to [`Engine::receive_message`]
//! 3. Calling [`Engine::handle_timeout`] when [`Engine::poll_timeout`]
//!    expires
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use mdns_engine::{Engine, EngineConfig};
//! use std::time::{Duration, Instant};
//!
//! let config = EngineConfig::default()
//!     .with_local_v4("192.168.1.20".parse()?);
//! let mut engine = Engine::new(config, Box::new(transceiver));
//! engine.start("alice")?;
//!
//! // Resolve a peer.
//! engine.resolve_host_name("bob", Instant::now() + Duration::from_secs(2),
//!     Box::new(|v4, v6| {
//!         println!("bob.local. resolved: v4 {v4:?}, v6 {v6:?}");
//!     }))?;
//!
//! // Browse and publish a service.
//! engine.subscribe_to_service("_foo._tcp", Box::new(|version, instances| {
//!     println!("snapshot v{version}: {} instance(s)", instances.len());
//! }))?;
//! engine.publish_service_instance("_foo._tcp", "bar", 1234,
//!     vec!["k=v".to_owned()])?;
//!
//! // Drive loop: pump the socket into receive_message, honor
//! // poll_timeout with handle_timeout. See demos/ for a tokio driver.
//! ```
//!
//! ## Protocol notes
//!
//! - Multicast groups 224.0.0.251 and ff02::fb, port 5353
//! - Address records use a TTL of 120 s, PTR/TXT 4500 s
//! - Published instances are announced at start and re-announced with
//!   doubling delays; withdrawal sends a one-shot TTL 0 goodbye
//! - Cached records are re-queried at 80/85/90/95 % of their TTL before
//!   being expired locally (RFC 6762 §5.2)

#![warn(rust_2018_idioms)]

pub(crate) mod config;
pub(crate) mod engine;
pub mod error;
pub mod message;
pub(crate) mod names;
pub(crate) mod socket;
pub(crate) mod transceiver;

pub use config::EngineConfig;
pub use engine::{
    Engine, ResolveHostNameCallback, Section, ServiceInstance, ServiceInstanceCallback,
    AGGREGATION_WINDOW, TTL_CANCELLED,
};
pub use socket::MulticastSocket;
pub use transceiver::{
    AddressFamily, Transceiver, ALL_INTERFACES, MDNS_DEST_ADDR_V4, MDNS_DEST_ADDR_V6,
    MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT,
};
