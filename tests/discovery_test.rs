//! Integration tests for mdns-engine.
//!
//! Two engines are joined by an in-memory wire: every datagram one engine
//! hands its transceiver is fed into the other engine's inbound path. No
//! network I/O, no real sleeping; time is simulated by driving
//! `handle_timeout` at the deadlines the engines ask for.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::rc::Rc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use mdns_engine::message::Message;
use mdns_engine::{
    AddressFamily, Engine, EngineConfig, ServiceInstance, Transceiver, MDNS_PORT,
};

/// Serializes outbound messages onto an in-memory wire.
struct WireTransceiver {
    wire: Rc<RefCell<VecDeque<BytesMut>>>,
}

impl Transceiver for WireTransceiver {
    fn enable_interface(&mut self, _name: &str, _family: AddressFamily) {}

    fn start(&mut self, _host_full_name: &str) -> bool {
        true
    }

    fn send_message(&mut self, message: &Message, _dest: SocketAddr, _interface: u32) {
        let packed = message.pack().expect("outbound message must pack");
        self.wire.borrow_mut().push_back(BytesMut::from(&packed[..]));
    }

    fn stop(&mut self) {}
}

struct Endpoint {
    engine: Engine,
    outbound: Rc<RefCell<VecDeque<BytesMut>>>,
    addr: SocketAddr,
}

fn endpoint(v4: Ipv4Addr) -> Endpoint {
    let outbound = Rc::new(RefCell::new(VecDeque::new()));
    let transceiver = WireTransceiver {
        wire: outbound.clone(),
    };
    let config = EngineConfig::default().with_local_v4(v4);
    Endpoint {
        engine: Engine::new(config, Box::new(transceiver)),
        outbound,
        addr: SocketAddr::new(IpAddr::V4(v4), MDNS_PORT),
    }
}

/// Delivers queued datagrams in both directions until the wire is quiet.
fn pump(a: &mut Endpoint, b: &mut Endpoint, now: Instant) {
    loop {
        let mut progressed = false;
        while let Some(datagram) = a.outbound.borrow_mut().pop_front() {
            b.engine.receive_message(&datagram, a.addr, 0, now);
            progressed = true;
        }
        while let Some(datagram) = b.outbound.borrow_mut().pop_front() {
            a.engine.receive_message(&datagram, b.addr, 0, now);
            progressed = true;
        }
        if !progressed {
            return;
        }
    }
}

/// Runs both engines forward to `until`, honoring every timer deadline and
/// exchanging datagrams along the way.
fn run(a: &mut Endpoint, b: &mut Endpoint, from: Instant, until: Instant) {
    let mut now = from;
    pump(a, b, now);
    loop {
        let next = match (a.engine.poll_timeout(), b.engine.poll_timeout()) {
            (Some(ta), Some(tb)) => ta.min(tb),
            (Some(ta), None) => ta,
            (None, Some(tb)) => tb,
            (None, None) => break,
        };
        if next > until {
            break;
        }
        now = next.max(now);
        a.engine.handle_timeout(now);
        b.engine.handle_timeout(now);
        pump(a, b, now);
    }
}

type Resolved = Rc<RefCell<Option<(Option<Ipv4Addr>, Option<Ipv6Addr>)>>>;

fn resolve(engine: &mut Engine, host: &str, deadline: Instant) -> Resolved {
    let resolved: Resolved = Rc::new(RefCell::new(None));
    let resolved_in_cb = resolved.clone();
    engine
        .resolve_host_name(
            host,
            deadline,
            Box::new(move |v4, v6| {
                *resolved_in_cb.borrow_mut() = Some((v4, v6));
            }),
        )
        .unwrap();
    resolved
}

type Snapshots = Rc<RefCell<Vec<(u64, Vec<ServiceInstance>)>>>;

fn subscribe(engine: &mut Engine, service: &str) -> Snapshots {
    let snapshots: Snapshots = Rc::new(RefCell::new(vec![]));
    let snapshots_in_cb = snapshots.clone();
    engine
        .subscribe_to_service(
            service,
            Box::new(move |version, instances| {
                snapshots_in_cb
                    .borrow_mut()
                    .push((version, instances.to_vec()));
            }),
        )
        .unwrap();
    snapshots
}

#[test]
fn test_resolve_present_host() {
    let mut bob = endpoint(Ipv4Addr::new(10, 0, 0, 5));
    bob.engine.start("bob").unwrap();

    let mut alice = endpoint(Ipv4Addr::new(10, 0, 0, 7));
    alice.engine.start("alice").unwrap();

    let start = Instant::now();
    let resolved = resolve(
        &mut alice.engine,
        "bob",
        start + Duration::from_secs(2),
    );

    run(&mut alice, &mut bob, start, start + Duration::from_secs(1));

    assert_eq!(
        *resolved.borrow(),
        Some((Some(Ipv4Addr::new(10, 0, 0, 5)), None))
    );
}

#[test]
fn test_resolve_absent_host() {
    let mut alice = endpoint(Ipv4Addr::new(10, 0, 0, 7));
    alice.engine.start("alice").unwrap();

    let mut bob = endpoint(Ipv4Addr::new(10, 0, 0, 5));
    bob.engine.start("bob").unwrap();

    let start = Instant::now();
    let resolved = resolve(
        &mut alice.engine,
        "ghost",
        start + Duration::from_millis(500),
    );

    run(&mut alice, &mut bob, start, start + Duration::from_secs(1));

    // The deadline passed with no answer, exactly once, and with the
    // resolver gone a second resolve starts from scratch.
    assert_eq!(*resolved.borrow(), Some((None, None)));
}

#[test]
fn test_resolve_host_with_v6() {
    let outbound = Rc::new(RefCell::new(VecDeque::new()));
    let transceiver = WireTransceiver {
        wire: outbound.clone(),
    };
    let v6 = Ipv6Addr::new(0xfe80, 0, 0, 0, 0, 0, 0, 0x21);
    let config = EngineConfig::default()
        .with_local_v4(Ipv4Addr::new(10, 0, 0, 5))
        .with_local_v6(v6);
    let mut bob = Endpoint {
        engine: Engine::new(config, Box::new(transceiver)),
        outbound,
        addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), MDNS_PORT),
    };
    bob.engine.start("bob").unwrap();

    let mut alice = endpoint(Ipv4Addr::new(10, 0, 0, 7));
    alice.engine.start("alice").unwrap();

    let start = Instant::now();
    let resolved = resolve(&mut alice.engine, "bob", start + Duration::from_secs(2));

    run(&mut alice, &mut bob, start, start + Duration::from_secs(1));

    assert_eq!(
        *resolved.borrow(),
        Some((Some(Ipv4Addr::new(10, 0, 0, 5)), Some(v6)))
    );
}

#[test]
fn test_publish_and_discover() {
    let mut alice = endpoint(Ipv4Addr::new(10, 0, 0, 5));
    alice.engine.start("alice").unwrap();
    alice
        .engine
        .publish_service_instance("_foo._tcp", "bar", 1234, vec!["k=v".to_owned()])
        .unwrap();

    let mut bob = endpoint(Ipv4Addr::new(10, 0, 0, 7));
    bob.engine.start("bob").unwrap();
    let snapshots = subscribe(&mut bob.engine, "_foo._tcp");

    let start = Instant::now();
    run(&mut alice, &mut bob, start, start + Duration::from_secs(5));

    let snapshots = snapshots.borrow();
    let (version, instances) = snapshots.last().expect("a snapshot must have arrived");
    assert!(*version > 0);
    assert_eq!(instances.len(), 1);

    let instance = &instances[0];
    assert_eq!(instance.service_name, "_foo._tcp");
    assert_eq!(instance.instance_name, "bar");
    assert_eq!(instance.target, "alice.local.");
    assert_eq!(instance.port, 1234);
    assert_eq!(instance.v4, Some(Ipv4Addr::new(10, 0, 0, 5)));
    assert_eq!(instance.text, vec!["k=v".to_owned()]);
}

#[test]
fn test_goodbye_propagates() {
    let mut alice = endpoint(Ipv4Addr::new(10, 0, 0, 5));
    alice.engine.start("alice").unwrap();
    alice
        .engine
        .publish_service_instance("_foo._tcp", "bar", 1234, vec![])
        .unwrap();

    let mut bob = endpoint(Ipv4Addr::new(10, 0, 0, 7));
    bob.engine.start("bob").unwrap();
    let snapshots = subscribe(&mut bob.engine, "_foo._tcp");

    let start = Instant::now();
    run(&mut alice, &mut bob, start, start + Duration::from_secs(5));
    assert_eq!(
        snapshots.borrow().last().map(|(_, i)| i.len()),
        Some(1),
        "the instance must be discovered before the goodbye"
    );
    let discovered_version = snapshots.borrow().last().map(|(v, _)| *v).unwrap();

    alice
        .engine
        .unpublish_service_instance("_foo._tcp", "bar")
        .unwrap();
    let now = Instant::now();
    pump(&mut alice, &mut bob, now);

    let snapshots = snapshots.borrow();
    let (version, instances) = snapshots.last().expect("a follow-up snapshot must arrive");
    assert!(*version > discovered_version);
    assert!(instances.is_empty());
}

#[test]
fn test_silent_publisher_expires() {
    let mut alice = endpoint(Ipv4Addr::new(10, 0, 0, 5));
    alice.engine.start("alice").unwrap();
    alice
        .engine
        .publish_service_instance("_foo._tcp", "bar", 1234, vec![])
        .unwrap();

    let mut bob = endpoint(Ipv4Addr::new(10, 0, 0, 7));
    bob.engine.start("bob").unwrap();
    let snapshots = subscribe(&mut bob.engine, "_foo._tcp");

    let start = Instant::now();
    run(&mut alice, &mut bob, start, start + Duration::from_secs(5));
    assert_eq!(snapshots.borrow().last().map(|(_, i)| i.len()), Some(1));

    // Alice vanishes without a goodbye. Bob's renewer re-queries the SRV
    // record as its 120 s TTL runs down, gets nothing, and expires it.
    alice.engine.stop();
    run(
        &mut alice,
        &mut bob,
        start + Duration::from_secs(5),
        start + Duration::from_secs(180),
    );

    let snapshots = snapshots.borrow();
    let (_, instances) = snapshots.last().unwrap();
    assert!(
        instances.is_empty(),
        "the unrefreshed instance must expire: {instances:?}"
    );
}
