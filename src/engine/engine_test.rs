use std::cell::RefCell;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::rc::Rc;
use std::time::{Duration, Instant};

use super::agent::AgentOps;
use super::responder::AddressResponder;
use super::*;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::message::name::Name;
use crate::message::resource::ResourceData;
use crate::message::{DnsType, Message};
use crate::transceiver::{AddressFamily, Transceiver, MDNS_DEST_ADDR_V4};

// Records every outbound message, round-tripping it through the codec the
// way a real transceiver would serialize it.
struct TestTransceiver {
    sent: Rc<RefCell<Vec<Message>>>,
    start_result: bool,
}

impl Transceiver for TestTransceiver {
    fn enable_interface(&mut self, _name: &str, _family: AddressFamily) {}

    fn start(&mut self, _host_full_name: &str) -> bool {
        self.start_result
    }

    fn send_message(&mut self, message: &Message, dest: SocketAddr, _interface: u32) {
        assert_eq!(dest, MDNS_DEST_ADDR_V4);
        let packed = message.pack().expect("outbound message must pack");
        let mut decoded = Message::default();
        decoded.unpack(&packed).expect("outbound message must parse");
        self.sent.borrow_mut().push(decoded);
    }

    fn stop(&mut self) {}
}

const LOCAL_V4: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);

fn new_engine() -> (Engine, Rc<RefCell<Vec<Message>>>) {
    let sent = Rc::new(RefCell::new(vec![]));
    let transceiver = TestTransceiver {
        sent: sent.clone(),
        start_result: true,
    };
    let config = EngineConfig::default().with_local_v4(LOCAL_V4);
    (Engine::new(config, Box::new(transceiver)), sent)
}

fn peer_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)), 5353)
}

fn name(data: &str) -> Name {
    Name::new(data).unwrap()
}

#[test]
fn test_start_requires_interface() {
    let sent = Rc::new(RefCell::new(vec![]));
    let transceiver = TestTransceiver {
        sent,
        start_result: false,
    };
    let mut engine = Engine::new(EngineConfig::default(), Box::new(transceiver));
    assert_eq!(
        engine.start("alice"),
        Err(Error::ErrTransceiverUnavailable)
    );
    assert!(!engine.started());
    assert!(engine.poll_timeout().is_none());
}

#[test]
fn test_start_rejects_invalid_host_name() {
    let (mut engine, _sent) = new_engine();
    assert_eq!(engine.start("a.b"), Err(Error::ErrInvalidHostName));
    assert_eq!(engine.start(""), Err(Error::ErrInvalidHostName));

    engine.start("alice").unwrap();
    assert_eq!(engine.host_full_name(), "alice.local.");
    assert_eq!(engine.start("alice"), Err(Error::ErrAlreadyStarted));
}

#[test]
fn test_publish_requires_start() {
    let (mut engine, _sent) = new_engine();
    assert_eq!(
        engine.publish_service_instance("_foo._tcp", "bar", 1234, vec![]),
        Err(Error::ErrNotStarted)
    );
}

#[test]
fn test_invalid_service_name() {
    let (mut engine, _sent) = new_engine();
    engine.start("alice").unwrap();
    assert_eq!(
        engine.subscribe_to_service("foo", Box::new(|_, _| {})),
        Err(Error::ErrInvalidServiceName)
    );
    assert_eq!(
        engine.publish_service_instance("_foo._icmp", "bar", 1, vec![]),
        Err(Error::ErrInvalidServiceName)
    );
}

// Entries due within the aggregation window leave in one datagram.
#[test]
fn test_coalescing_window() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let mut ops = AgentOps::new(now);
    ops.send_question(
        Rc::new(crate::message::question::Question::new(
            name("bob.local."),
            DnsType::A,
        )),
        now + Duration::from_millis(5),
    );
    ops.send_resource(
        Rc::new(RefCell::new(crate::message::resource::Resource::a(
            name("alice.local."),
            LOCAL_V4,
            120,
        ))),
        Section::Answer,
        now + Duration::from_millis(30),
    );
    engine.apply_ops(AddressResponder::KEY, ops);

    engine.handle_timeout(now);

    let sent = sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].questions.len(), 1);
    assert_eq!(sent[0].answers.len(), 1);
    // A message carrying a question is a query.
    assert!(!sent[0].header.response);
}

#[test]
fn test_entries_beyond_window_wait() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let mut ops = AgentOps::new(now);
    ops.send_question(
        Rc::new(crate::message::question::Question::new(
            name("bob.local."),
            DnsType::A,
        )),
        now + Duration::from_millis(500),
    );
    engine.apply_ops(AddressResponder::KEY, ops);

    engine.handle_timeout(now);
    assert!(sent.borrow().is_empty());

    // The reschedule covers the entry.
    let deadline = engine.poll_timeout().expect("a wake must be scheduled");
    assert!(deadline <= now + Duration::from_millis(500));

    engine.handle_timeout(now + Duration::from_millis(500));
    assert_eq!(sent.borrow().len(), 1);
}

#[test]
fn test_cancelled_resource_never_sent() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let resource = Rc::new(RefCell::new(crate::message::resource::Resource::a(
        name("alice.local."),
        LOCAL_V4,
        120,
    )));
    resource.borrow_mut().ttl = TTL_CANCELLED;

    let mut ops = AgentOps::new(now);
    ops.send_resource(resource, Section::Answer, now);
    engine.apply_ops(AddressResponder::KEY, ops);

    engine.handle_timeout(now);
    assert!(sent.borrow().is_empty());
}

// A record posted to two sections leaves in exactly one of them.
#[test]
fn test_identity_dedup_within_message() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let resource = Rc::new(RefCell::new(crate::message::resource::Resource::a(
        name("alice.local."),
        LOCAL_V4,
        120,
    )));

    let mut ops = AgentOps::new(now);
    ops.send_resource(resource.clone(), Section::Answer, now);
    ops.send_resource(resource, Section::Additional, now);
    engine.apply_ops(AddressResponder::KEY, ops);

    engine.handle_timeout(now);

    let sent = sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].answers.len(), 1);
    assert!(sent[0].additionals.is_empty());
}

// A goodbye is one-shot: after it is sent, queued copies are suppressed.
#[test]
fn test_goodbye_sent_once() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let resource = Rc::new(RefCell::new(crate::message::resource::Resource::a(
        name("alice.local."),
        LOCAL_V4,
        0,
    )));

    let mut ops = AgentOps::new(now);
    ops.send_resource(resource.clone(), Section::Answer, now);
    engine.apply_ops(AddressResponder::KEY, ops);
    engine.handle_timeout(now);

    assert_eq!(sent.borrow().len(), 1);
    assert_eq!(sent.borrow()[0].answers[0].ttl, 0);
    assert_eq!(resource.borrow().ttl, TTL_CANCELLED);

    // A second queued reference to the same record goes nowhere.
    let later = now + Duration::from_millis(200);
    let mut ops = AgentOps::new(later);
    ops.send_resource(resource, Section::Answer, later);
    engine.apply_ops(AddressResponder::KEY, ops);
    engine.handle_timeout(later);

    assert_eq!(sent.borrow().len(), 1);
}

#[test]
fn test_responses_are_marked_authoritative() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let mut ops = AgentOps::new(now);
    ops.send_addresses(Section::Answer, now);
    engine.apply_ops(AddressResponder::KEY, ops);
    engine.handle_timeout(now);

    let sent = sent.borrow();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].header.response);
    assert!(sent[0].header.authoritative);
    assert!(sent[0].questions.is_empty());
}

#[test]
fn test_address_responder_answers_host_queries() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let query = Message {
        questions: vec![crate::message::question::Question::new(
            name("alice.local."),
            DnsType::A,
        )],
        ..Default::default()
    };
    let packed = query.pack().unwrap();
    engine.receive_message(&packed, peer_addr(), 0, now);

    // The answer is scheduled with a random 0-120 ms tie-break delay.
    engine.handle_timeout(now + Duration::from_millis(250));

    let sent = sent.borrow();
    let responses: Vec<_> = sent.iter().filter(|m| !m.answers.is_empty()).collect();
    assert_eq!(responses.len(), 1);
    let answer = &responses[0].answers[0];
    assert_eq!(answer.name.data, "alice.local.");
    assert!(answer.cache_flush);
    match &answer.data {
        ResourceData::A(a) => assert_eq!(a.addr(), LOCAL_V4),
        other => panic!("expected A record, got {other}"),
    }
}

#[test]
fn test_address_responder_ignores_other_hosts() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let query = Message {
        questions: vec![crate::message::question::Question::new(
            name("bob.local."),
            DnsType::A,
        )],
        ..Default::default()
    };
    let packed = query.pack().unwrap();
    engine.receive_message(&packed, peer_addr(), 0, now);
    engine.handle_timeout(now + Duration::from_millis(250));

    assert!(sent.borrow().iter().all(|m| m.answers.is_empty()));
}

#[test]
fn test_resolver_receives_answer() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let resolved: Rc<RefCell<Option<(Option<Ipv4Addr>, Option<Ipv6Addr>)>>> =
        Rc::new(RefCell::new(None));
    let resolved_in_cb = resolved.clone();
    engine
        .resolve_host_name(
            "bob",
            now + Duration::from_secs(2),
            Box::new(move |v4, v6| {
                *resolved_in_cb.borrow_mut() = Some((v4, v6));
            }),
        )
        .unwrap();

    // The A and AAAA questions leave immediately.
    assert_eq!(sent.borrow().len(), 1);
    assert_eq!(sent.borrow()[0].questions.len(), 2);

    let answer = Message {
        header: crate::message::header::Header {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers: vec![crate::message::resource::Resource::a(
            name("bob.local."),
            Ipv4Addr::new(10, 0, 0, 5),
            120,
        )],
        ..Default::default()
    };
    let packed = answer.pack().unwrap();
    engine.receive_message(&packed, peer_addr(), 0, now + Duration::from_millis(50));

    assert_eq!(
        *resolved.borrow(),
        Some((Some(Ipv4Addr::new(10, 0, 0, 5)), None))
    );
    assert!(!engine.agents_by_name.contains_key("bob.local."));
}

#[test]
fn test_resolver_timeout() {
    let (mut engine, _sent) = new_engine();
    engine.start("alice").unwrap();

    let now = Instant::now();
    let resolved: Rc<RefCell<Option<(Option<Ipv4Addr>, Option<Ipv6Addr>)>>> =
        Rc::new(RefCell::new(None));
    let resolved_in_cb = resolved.clone();
    engine
        .resolve_host_name(
            "ghost",
            now + Duration::from_millis(500),
            Box::new(move |v4, v6| {
                *resolved_in_cb.borrow_mut() = Some((v4, v6));
            }),
        )
        .unwrap();

    engine.handle_timeout(now + Duration::from_millis(400));
    assert!(resolved.borrow().is_none());

    engine.handle_timeout(now + Duration::from_millis(500));
    assert_eq!(*resolved.borrow(), Some((None, None)));
    assert!(!engine.agents_by_name.contains_key("ghost.local."));
}

#[test]
fn test_publisher_announces_and_says_goodbye() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    engine
        .publish_service_instance("_foo._tcp", "bar", 1234, vec!["k=v".to_owned()])
        .unwrap();

    {
        let sent = sent.borrow();
        assert_eq!(sent.len(), 1);
        let announcement = &sent[0];
        assert!(announcement.header.response);
        assert!(announcement.header.authoritative);
        assert_eq!(announcement.answers.len(), 3);
        assert_eq!(announcement.additionals.len(), 1);

        let srv = announcement
            .answers
            .iter()
            .find(|r| matches!(r.data, ResourceData::Srv(_)))
            .expect("announcement must carry the SRV record");
        assert_eq!(srv.name.data, "bar._foo._tcp.local.");
        assert_eq!(srv.ttl, 120);
        match &srv.data {
            ResourceData::Srv(srv) => {
                assert_eq!(srv.port, 1234);
                assert_eq!(srv.target.data, "alice.local.");
            }
            _ => unreachable!(),
        }

        let ptr = announcement
            .answers
            .iter()
            .find(|r| matches!(r.data, ResourceData::Ptr(_)))
            .expect("announcement must carry the PTR record");
        assert_eq!(ptr.name.data, "_foo._tcp.local.");
        assert_eq!(ptr.ttl, 4500);
    }

    engine
        .unpublish_service_instance("_foo._tcp", "bar")
        .unwrap();

    {
        let sent = sent.borrow();
        assert_eq!(sent.len(), 2);
        let goodbye = &sent[1];
        assert_eq!(goodbye.answers.len(), 3);
        assert!(goodbye.answers.iter().all(|r| r.ttl == 0));
    }

    // Nothing further leaves for this instance: pending announcement wakes
    // only remove the ending agent, and its records are retired.
    let later = Instant::now() + Duration::from_secs(10);
    engine.handle_timeout(later);
    assert_eq!(sent.borrow().len(), 2);
    assert!(!engine.agents_by_name.contains_key("bar._foo._tcp.local."));
}

#[test]
fn test_publisher_answers_service_queries() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    engine
        .publish_service_instance("_foo._tcp", "bar", 1234, vec![])
        .unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let query = Message {
        questions: vec![crate::message::question::Question::new(
            name("_foo._tcp.local."),
            DnsType::Ptr,
        )],
        ..Default::default()
    };
    let packed = query.pack().unwrap();
    engine.receive_message(&packed, peer_addr(), 0, now);
    engine.handle_timeout(now + Duration::from_millis(250));

    let sent = sent.borrow();
    let response = sent
        .iter()
        .find(|m| !m.answers.is_empty())
        .expect("the publisher must answer a PTR query");
    assert!(matches!(response.answers[0].data, ResourceData::Ptr(_)));
    // SRV, TXT and the address record ride along as additionals.
    assert_eq!(response.additionals.len(), 3);
}

#[test]
fn test_republish_replaces_publisher() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();

    engine
        .publish_service_instance("_foo._tcp", "bar", 1234, vec![])
        .unwrap();
    engine
        .publish_service_instance("_foo._tcp", "bar", 4321, vec![])
        .unwrap();

    // Latest wins; one agent, no goodbye in between.
    assert_eq!(
        engine
            .agents_by_name
            .keys()
            .filter(|k| k.as_str() == "bar._foo._tcp.local.")
            .count(),
        1
    );
    assert!(sent
        .borrow()
        .iter()
        .all(|m| m.answers.iter().all(|r| r.ttl != 0)));
}

#[test]
fn test_unsubscribe_removes_subscriber() {
    let (mut engine, _sent) = new_engine();
    engine.start("alice").unwrap();

    engine
        .subscribe_to_service("_foo._tcp", Box::new(|_, _| {}))
        .unwrap();
    assert!(engine.agents_by_name.contains_key("_foo._tcp.local."));

    engine.unsubscribe_to_service("_foo._tcp").unwrap();
    assert!(!engine.agents_by_name.contains_key("_foo._tcp.local."));
}

#[test]
fn test_subscriber_backoff() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let start = Instant::now();
    engine
        .subscribe_to_service("_foo._tcp", Box::new(|_, _| {}))
        .unwrap();

    // The initial PTR question leaves immediately.
    assert_eq!(sent.borrow().len(), 1);
    assert_eq!(sent.borrow()[0].questions[0].typ, DnsType::Ptr);
    assert_eq!(sent.borrow()[0].questions[0].name.data, "_foo._tcp.local.");

    // Re-queries back off 1, 2, 4, ... seconds, capped at 60.
    let mut now = start;
    let mut expected = 1;
    for interval in [1u64, 2, 4, 8, 16, 32, 60, 60] {
        now += Duration::from_secs(interval) + Duration::from_millis(50);
        engine.handle_timeout(now);
        expected += 1;
        assert_eq!(sent.borrow().len(), expected, "after {interval}s interval");
    }
}

// An overfull cycle caps the message, sets TC, and sends the rest next
// cycle.
#[test]
fn test_overfull_cycle_truncates() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let now = Instant::now();
    let mut ops = AgentOps::new(now);
    for i in 0..70 {
        ops.send_resource(
            Rc::new(RefCell::new(crate::message::resource::Resource::a(
                name(&format!("host{i}.local.")),
                LOCAL_V4,
                120,
            ))),
            Section::Answer,
            now,
        );
    }
    engine.apply_ops(AddressResponder::KEY, ops);

    engine.handle_timeout(now);
    {
        let sent = sent.borrow();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].answers.len(), 64);
        assert!(sent[0].header.truncated);
    }

    // The overflow is rescheduled immediately.
    assert!(engine.poll_timeout().is_some());
    engine.handle_timeout(now + Duration::from_millis(1));
    {
        let sent = sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].answers.len(), 6);
        assert!(!sent[1].header.truncated);
    }
}

// Renewal questions land in the RFC 6762 §5.2 bands, and an unanswered
// record expires at its TTL.
#[test]
fn test_renewal_schedule() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let start = Instant::now();
    let record =
        crate::message::resource::Resource::a(name("peer.local."), Ipv4Addr::new(10, 0, 0, 9), 10);
    let mut ops = AgentOps::new(start);
    ops.renew(&record);
    engine.apply_ops(AddressResponder::KEY, ops);

    let mut emissions = vec![];
    let mut t = Duration::from_secs(7);
    while t <= Duration::from_millis(10_500) {
        let before = sent.borrow().len();
        engine.handle_timeout(start + t);
        if sent.borrow().len() > before {
            emissions.push(t.as_secs_f64());
        }
        t += Duration::from_millis(25);
    }

    let bands = [(8.0, 8.2), (8.5, 8.7), (9.0, 9.2), (9.5, 9.7)];
    assert_eq!(emissions.len(), bands.len(), "emissions: {emissions:?}");
    for (emission, (lo, hi)) in emissions.iter().zip(bands) {
        assert!(
            *emission >= lo && *emission <= hi + 0.03,
            "renewal at {emission}s outside [{lo}, {hi}]"
        );
    }

    // Each emission was a single A question for the record.
    for message in sent.borrow().iter() {
        assert_eq!(message.questions.len(), 1);
        assert_eq!(message.questions[0].typ, DnsType::A);
        assert_eq!(message.questions[0].name.data, "peer.local.");
    }
}

#[test]
fn test_renewal_reset_by_fresh_answer() {
    let (mut engine, sent) = new_engine();
    engine.start("alice").unwrap();
    sent.borrow_mut().clear();

    let start = Instant::now();
    let record =
        crate::message::resource::Resource::a(name("peer.local."), Ipv4Addr::new(10, 0, 0, 9), 10);
    let mut ops = AgentOps::new(start);
    ops.renew(&record);
    engine.apply_ops(AddressResponder::KEY, ops);

    // A refresh at t=5s pushes the whole schedule out.
    let refresh = Message {
        header: crate::message::header::Header {
            response: true,
            authoritative: true,
            ..Default::default()
        },
        answers: vec![record],
        ..Default::default()
    };
    let packed = refresh.pack().unwrap();
    engine.receive_message(&packed, peer_addr(), 0, start + Duration::from_secs(5));

    // The original 8.0-9.7s renewal window stays quiet.
    let mut t = Duration::from_secs(7);
    while t <= Duration::from_secs(10) {
        engine.handle_timeout(start + t);
        t += Duration::from_millis(100);
    }
    assert!(sent.borrow().is_empty());

    // The reset schedule fires 80% past the refresh instead.
    let mut emitted = false;
    let mut t = Duration::from_secs(10);
    while t <= Duration::from_millis(13_300) {
        let before = sent.borrow().len();
        engine.handle_timeout(start + t);
        if sent.borrow().len() > before {
            emitted = true;
            break;
        }
        t += Duration::from_millis(25);
    }
    assert!(emitted, "renewal must fire in the 13.0-13.2s band");
}
