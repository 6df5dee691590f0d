//! The mDNS engine: a cooperative scheduler that owns a set of protocol
//! agents and coalesces their outbound questions and resource records into
//! as few datagrams as possible.
//!
//! The engine is sans-I/O: it performs no socket operations and never
//! sleeps. Outbound messages go to the [`Transceiver`] it owns; inbound
//! datagrams are fed in through [`Engine::receive_message`]; timers are
//! driven by calling [`Engine::handle_timeout`] whenever the deadline from
//! [`Engine::poll_timeout`] is reached.

#[cfg(test)]
mod engine_test;

pub(crate) mod agent;
pub(crate) mod publisher;
pub(crate) mod renewer;
pub(crate) mod resolver;
pub(crate) mod responder;
pub(crate) mod subscriber;

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::net::{Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::time::{Duration, Instant};

use crate::config::{EngineConfig, SHORT_TTL};
use crate::error::{Error, Result};
use crate::message::question::Question;
use crate::message::resource::Resource;
use crate::message::Message;
use crate::names;
use crate::transceiver::{AddressFamily, Transceiver, ALL_INTERFACES, MDNS_DEST_ADDR_V4};

use agent::{Agent, AgentOps, SharedResource};
use publisher::InstancePublisher;
use renewer::ResourceRenewer;
use resolver::HostNameResolver;
use responder::AddressResponder;
use subscriber::InstanceSubscriber;

pub use agent::Section;
pub use resolver::ResolveHostNameCallback;
pub use subscriber::{ServiceInstance, ServiceInstanceCallback};

/// How far ahead of its deadline an entry may be transmitted. Draining
/// everything due within the window yields fewer packets and keeps
/// rapid-fire sequences posted by one agent inside one message.
pub const AGGREGATION_WINDOW: Duration = Duration::from_millis(100);

/// Sentinel TTL marking a record withdrawn from the outbound queues before
/// transmission. Never emitted on the wire.
pub const TTL_CANCELLED: u32 = u32::MAX;

// Key under which the renewer receives wake entries. Agent keys are either
// full names (ending in a dot) or the responder key, so this cannot clash.
const RENEWER_KEY: &str = "resource-renewer";

// Cap on resource records per outbound message, keeping datagrams within a
// typical path MTU. Overflow stays queued for the next cycle and the
// message is marked truncated (RFC 6762 §18.5).
const MAX_CYCLE_RESOURCES: usize = 64;

struct WakeEntry {
    when: Instant,
    seq: u64,
    agent_key: String,
}

struct QuestionEntry {
    when: Instant,
    seq: u64,
    question: Rc<Question>,
}

struct ResourceEntry {
    when: Instant,
    seq: u64,
    resource: SharedResource,
    section: Section,
}

// The queues order by deadline, insertion order breaking ties so that
// coalescing is stable.
macro_rules! impl_entry_ord {
    ($entry:ident) => {
        impl PartialEq for $entry {
            fn eq(&self, other: &Self) -> bool {
                self.when == other.when && self.seq == other.seq
            }
        }
        impl Eq for $entry {}
        impl PartialOrd for $entry {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for $entry {
            fn cmp(&self, other: &Self) -> Ordering {
                (self.when, self.seq).cmp(&(other.when, other.seq))
            }
        }
    };
}

impl_entry_ord!(WakeEntry);
impl_entry_ord!(QuestionEntry);
impl_entry_ord!(ResourceEntry);

/// The mDNS engine.
///
/// See the [crate docs](crate) for the drive loop. All methods must be
/// called from one thread; agent callbacks run inline and must not
/// re-enter the engine.
pub struct Engine {
    config: EngineConfig,
    verbose: bool,
    started: bool,
    host_full_name: crate::message::name::Name,
    transceiver: Box<dyn Transceiver>,

    agents_by_name: BTreeMap<String, Rc<RefCell<dyn Agent>>>,
    resource_renewer: Rc<RefCell<ResourceRenewer>>,

    // Shared address record(s) for the local host. Agents enqueue these
    // through `AgentOps::send_addresses`, so every reference in a message
    // dedups to one copy.
    address_placeholders: Vec<SharedResource>,

    wake_queue: BinaryHeap<Reverse<WakeEntry>>,
    question_queue: BinaryHeap<Reverse<QuestionEntry>>,
    resource_queue: BinaryHeap<Reverse<ResourceEntry>>,

    // Deadlines the driver has been asked to call `handle_timeout` for.
    post_task_queue: BTreeSet<Instant>,

    seq: u64,
}

impl Engine {
    pub fn new(config: EngineConfig, transceiver: Box<dyn Transceiver>) -> Self {
        Engine {
            config,
            verbose: false,
            started: false,
            host_full_name: Default::default(),
            transceiver,
            agents_by_name: BTreeMap::new(),
            resource_renewer: Rc::new(RefCell::new(ResourceRenewer::new())),
            address_placeholders: vec![],
            wake_queue: BinaryHeap::new(),
            question_queue: BinaryHeap::new(),
            resource_queue: BinaryHeap::new(),
            post_task_queue: BTreeSet::new(),
            seq: 0,
        }
    }

    /// Marks a link-local interface for use. Forwarded to the transceiver.
    pub fn enable_interface(&mut self, name: &str, family: AddressFamily) {
        self.transceiver.enable_interface(name, family);
    }

    /// Enables logging of full inbound and outbound messages.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// The fully-qualified local host name (e.g. `alice.local.`), empty
    /// before [`start`](Engine::start).
    pub fn host_full_name(&self) -> &str {
        &self.host_full_name.data
    }

    /// Starts the engine as `host_name` (an unqualified label such as
    /// `alice`). Joins the multicast groups through the transceiver and
    /// starts every agent.
    ///
    /// # Errors
    ///
    /// [`Error::ErrInvalidHostName`] if `host_name` is not a single label;
    /// [`Error::ErrTransceiverUnavailable`] if no interface could be
    /// initialized, in which case the engine remains stopped.
    pub fn start(&mut self, host_name: &str) -> Result<()> {
        if self.started {
            return Err(Error::ErrAlreadyStarted);
        }
        self.host_full_name = names::local_host_full_name(host_name)?;

        self.address_placeholders.clear();
        let v4 = self.config.local_v4.unwrap_or(Ipv4Addr::UNSPECIFIED);
        let mut placeholder = Resource::a(self.host_full_name.clone(), v4, SHORT_TTL);
        placeholder.cache_flush = true;
        self.address_placeholders
            .push(Rc::new(RefCell::new(placeholder)));
        if let Some(v6) = self.config.local_v6 {
            let mut placeholder = Resource::aaaa(self.host_full_name.clone(), v6, SHORT_TTL);
            placeholder.cache_flush = true;
            self.address_placeholders
                .push(Rc::new(RefCell::new(placeholder)));
        }

        self.agents_by_name.insert(
            AddressResponder::KEY.to_owned(),
            Rc::new(RefCell::new(AddressResponder::new(
                self.host_full_name.clone(),
            ))),
        );
        self.resource_renewer = Rc::new(RefCell::new(ResourceRenewer::new()));

        if !self.transceiver.start(&self.host_full_name.data) {
            return Err(Error::ErrTransceiverUnavailable);
        }
        self.started = true;
        log::info!("mDNS engine started as {}", self.host_full_name);

        let now = Instant::now();
        for (key, agent) in self.agents_snapshot() {
            let mut ops = AgentOps::new(now);
            agent.borrow_mut().start(&mut ops);
            self.apply_ops(&key, ops);
        }
        self.send_cycle(now);
        self.post_task();
        Ok(())
    }

    /// Stops the transceiver. Agents and queues are retained; a subsequent
    /// [`start`](Engine::start) resumes them.
    pub fn stop(&mut self) {
        self.transceiver.stop();
        self.started = false;
        log::info!("mDNS engine stopped");
    }

    /// Resolves `host_name` to its addresses. The callback fires once: with
    /// at least one address as soon as an answer arrives, or with none at
    /// `deadline`.
    pub fn resolve_host_name(
        &mut self,
        host_name: &str,
        deadline: Instant,
        callback: ResolveHostNameCallback,
    ) -> Result<()> {
        let host_full_name = names::local_host_full_name(host_name)?;
        let key = host_full_name.data.clone();
        self.add_agent(
            key,
            Rc::new(RefCell::new(HostNameResolver::new(
                host_full_name,
                deadline,
                callback,
            ))),
        );
        Ok(())
    }

    /// Subscribes to instances of `service_name` (`_service._proto` form).
    /// The callback receives a version-stamped snapshot after every change.
    pub fn subscribe_to_service(
        &mut self,
        service_name: &str,
        callback: ServiceInstanceCallback,
    ) -> Result<()> {
        let service_full_name = names::local_service_full_name(service_name)?;
        let key = service_full_name.data.clone();
        self.add_agent(
            key,
            Rc::new(RefCell::new(InstanceSubscriber::new(
                service_name.to_owned(),
                service_full_name,
                self.config.query_backoff_cap,
                callback,
            ))),
        );
        Ok(())
    }

    /// Ends a subscription created by
    /// [`subscribe_to_service`](Engine::subscribe_to_service).
    pub fn unsubscribe_to_service(&mut self, service_name: &str) -> Result<()> {
        let service_full_name = names::local_service_full_name(service_name)?;
        self.tell_agent_to_quit(&service_full_name.data);
        Ok(())
    }

    /// Publishes a service instance under the local host name. Publishing
    /// an instance that is already published replaces it; the previous
    /// publisher is dropped without a goodbye.
    ///
    /// # Errors
    ///
    /// [`Error::ErrNotStarted`] before [`start`](Engine::start), since the
    /// published records point at the local host name.
    pub fn publish_service_instance(
        &mut self,
        service_name: &str,
        instance_name: &str,
        port: u16,
        text: Vec<String>,
    ) -> Result<()> {
        if !self.started {
            return Err(Error::ErrNotStarted);
        }
        let instance_full_name = names::local_instance_full_name(instance_name, service_name)?;
        let service_full_name = names::local_service_full_name(service_name)?;
        let key = instance_full_name.data.clone();
        self.add_agent(
            key,
            Rc::new(RefCell::new(InstancePublisher::new(
                self.host_full_name.clone(),
                instance_full_name,
                service_full_name,
                port,
                text,
            ))),
        );
        Ok(())
    }

    /// Withdraws a published instance with a goodbye round.
    pub fn unpublish_service_instance(
        &mut self,
        service_name: &str,
        instance_name: &str,
    ) -> Result<()> {
        let instance_full_name = names::local_instance_full_name(instance_name, service_name)?;
        self.tell_agent_to_quit(&instance_full_name.data);
        Ok(())
    }

    /// The earliest deadline [`handle_timeout`](Engine::handle_timeout)
    /// should be called for, if any.
    pub fn poll_timeout(&self) -> Option<Instant> {
        if !self.started {
            return None;
        }
        self.post_task_queue.iter().next().copied()
    }

    /// Dispatches due wake entries, runs a send cycle, and reschedules.
    pub fn handle_timeout(&mut self, now: Instant) {
        if !self.started {
            return;
        }
        self.post_task_queue.retain(|when| *when > now);

        loop {
            let due = matches!(self.wake_queue.peek(), Some(Reverse(entry)) if entry.when <= now);
            if !due {
                break;
            }
            if let Some(Reverse(entry)) = self.wake_queue.pop() {
                let mut ops = AgentOps::new(now);
                if entry.agent_key == RENEWER_KEY {
                    let renewer = self.resource_renewer.clone();
                    renewer.borrow_mut().wake(&mut ops);
                } else if let Some(agent) = self.agents_by_name.get(&entry.agent_key).cloned() {
                    agent.borrow_mut().wake(&mut ops);
                }
                self.apply_ops(&entry.agent_key, ops);
            }
        }

        self.send_cycle(now);
        self.post_task();
    }

    /// Feeds one received datagram into the engine: the transceiver's
    /// inbound path. Malformed datagrams are dropped.
    pub fn receive_message(
        &mut self,
        datagram: &[u8],
        source: SocketAddr,
        interface: u32,
        now: Instant,
    ) {
        if !self.started {
            return;
        }

        let mut message = Message::default();
        if let Err(err) = message.unpack(datagram) {
            log::debug!("malformed message from {source}: {err}");
            return;
        }
        if self.verbose {
            log::info!("inbound message from {source} through interface {interface}: {message}");
        }

        let agents = self.agents_snapshot();

        // Renewer doesn't need questions.
        for question in &message.questions {
            for (key, agent) in &agents {
                let mut ops = AgentOps::new(now);
                agent.borrow_mut().receive_question(question, &mut ops);
                self.apply_ops(key, ops);
            }
        }

        let sections = [
            (&message.answers, Section::Answer),
            (&message.authorities, Section::Authority),
            (&message.additionals, Section::Additional),
        ];
        for (resources, section) in sections {
            for resource in resources {
                // Renewer is always first, so TTL schedules exist before
                // any agent reacts.
                let renewer = self.resource_renewer.clone();
                let mut ops = AgentOps::new(now);
                renewer
                    .borrow_mut()
                    .receive_resource(resource, section, &mut ops);
                self.apply_ops(RENEWER_KEY, ops);

                for (key, agent) in &agents {
                    let mut ops = AgentOps::new(now);
                    agent
                        .borrow_mut()
                        .receive_resource(resource, section, &mut ops);
                    self.apply_ops(key, ops);
                }
            }
        }

        let renewer = self.resource_renewer.clone();
        let mut ops = AgentOps::new(now);
        renewer.borrow_mut().end_of_message(&mut ops);
        self.apply_ops(RENEWER_KEY, ops);
        for (key, agent) in &agents {
            let mut ops = AgentOps::new(now);
            agent.borrow_mut().end_of_message(&mut ops);
            self.apply_ops(key, ops);
        }

        self.send_cycle(now);
        self.post_task();
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn agents_snapshot(&self) -> Vec<(String, Rc<RefCell<dyn Agent>>)> {
        self.agents_by_name
            .iter()
            .map(|(key, agent)| (key.clone(), agent.clone()))
            .collect()
    }

    fn add_agent(&mut self, key: String, agent: Rc<RefCell<dyn Agent>>) {
        if self
            .agents_by_name
            .insert(key.clone(), agent.clone())
            .is_some()
        {
            // Latest wins. The replaced agent is dropped without a goodbye.
            log::debug!("agent {key} replaced");
        }
        if self.started {
            let now = Instant::now();
            let mut ops = AgentOps::new(now);
            agent.borrow_mut().start(&mut ops);
            self.apply_ops(&key, ops);
            self.send_cycle(now);
            self.post_task();
        }
    }

    fn tell_agent_to_quit(&mut self, key: &str) {
        if let Some(agent) = self.agents_by_name.get(key).cloned() {
            let now = Instant::now();
            let mut ops = AgentOps::new(now);
            agent.borrow_mut().quit(&mut ops);
            self.apply_ops(key, ops);
            self.send_cycle(now);
            self.post_task();
        }
    }

    // Applies everything an agent posted into its ops sink.
    fn apply_ops(&mut self, agent_key: &str, ops: AgentOps) {
        let AgentOps {
            now,
            wakes,
            questions,
            resources,
            addresses,
            renewals,
            removed,
        } = ops;

        for when in wakes {
            let seq = self.next_seq();
            self.wake_queue.push(Reverse(WakeEntry {
                when,
                seq,
                agent_key: agent_key.to_owned(),
            }));
        }
        for (when, question) in questions {
            let seq = self.next_seq();
            self.question_queue
                .push(Reverse(QuestionEntry { when, seq, question }));
        }
        for (when, resource, section) in resources {
            if section == Section::Expired {
                // Expirations are distributed to local agents, never sent.
                self.distribute_expired(resource, now);
            } else {
                let seq = self.next_seq();
                self.resource_queue.push(Reverse(ResourceEntry {
                    when,
                    seq,
                    resource,
                    section,
                }));
            }
        }
        for (when, section) in addresses {
            for resource in self.address_placeholders.clone() {
                let seq = self.next_seq();
                self.resource_queue.push(Reverse(ResourceEntry {
                    when,
                    seq,
                    resource,
                    section,
                }));
            }
        }
        for resource in renewals {
            let renewer = self.resource_renewer.clone();
            let mut renewer_ops = AgentOps::new(now);
            renewer.borrow_mut().renew(&resource, &mut renewer_ops);
            self.apply_ops(RENEWER_KEY, renewer_ops);
        }
        if removed {
            self.agents_by_name.remove(agent_key);
            log::trace!("agent {agent_key} removed");
        }
    }

    fn distribute_expired(&mut self, resource: SharedResource, now: Instant) {
        let expired = resource.borrow().clone();
        for (key, agent) in self.agents_snapshot() {
            let mut ops = AgentOps::new(now);
            agent
                .borrow_mut()
                .receive_resource(&expired, Section::Expired, &mut ops);
            self.apply_ops(&key, ops);
        }
    }

    // Drains everything due within the aggregation window into one message
    // and hands it to the transceiver.
    fn send_cycle(&mut self, now: Instant) {
        let cutoff = now + AGGREGATION_WINDOW;
        let mut message = Message::default();

        loop {
            let due =
                matches!(self.question_queue.peek(), Some(Reverse(entry)) if entry.when <= cutoff);
            if !due {
                break;
            }
            if let Some(Reverse(entry)) = self.question_queue.pop() {
                message.questions.push((*entry.question).clone());
            }
        }

        let mut picked: Vec<SharedResource> = vec![];
        loop {
            let due =
                matches!(self.resource_queue.peek(), Some(Reverse(entry)) if entry.when <= cutoff);
            if !due {
                break;
            }
            if picked.len() >= MAX_CYCLE_RESOURCES {
                // Leave the rest queued for the next cycle.
                message.header.truncated = true;
                break;
            }
            if let Some(Reverse(entry)) = self.resource_queue.pop() {
                if entry.resource.borrow().ttl == TTL_CANCELLED {
                    // Cancelled while in the queue.
                    continue;
                }
                if picked.iter().any(|r| Rc::ptr_eq(r, &entry.resource)) {
                    // Already in this message.
                    continue;
                }
                picked.push(entry.resource.clone());
                let resource = entry.resource.borrow().clone();
                match entry.section {
                    Section::Answer => message.answers.push(resource),
                    Section::Authority => message.authorities.push(resource),
                    Section::Additional => message.additionals.push(resource),
                    Section::Expired => {}
                }
            }
        }

        if message.questions.is_empty() && picked.is_empty() {
            return;
        }

        // A message with no questions is an unsolicited response.
        if message.questions.is_empty() {
            message.header.response = true;
            message.header.authoritative = true;
        }

        if self.verbose {
            log::info!("outbound message: {message}");
        }

        // V6 transceivers treat this destination as the V6 group.
        self.transceiver
            .send_message(&message, MDNS_DEST_ADDR_V4, ALL_INTERFACES);

        // Goodbyes are one-shot: retire every sent record that carried
        // TTL 0 so queued copies are suppressed.
        for resource in picked {
            let mut resource = resource.borrow_mut();
            if resource.ttl == 0 {
                resource.ttl = TTL_CANCELLED;
            }
        }
    }

    // Makes sure the driver will call `handle_timeout` by the earliest
    // queue deadline.
    fn post_task(&mut self) {
        let mut when: Option<Instant> = None;
        if let Some(Reverse(entry)) = self.wake_queue.peek() {
            when = Some(entry.when);
        }
        if let Some(Reverse(entry)) = self.question_queue.peek() {
            when = Some(when.map_or(entry.when, |w| w.min(entry.when)));
        }
        if let Some(Reverse(entry)) = self.resource_queue.peek() {
            when = Some(when.map_or(entry.when, |w| w.min(entry.when)));
        }
        let when = match when {
            Some(when) => when,
            None => return,
        };

        if let Some(first) = self.post_task_queue.iter().next() {
            if *first <= when {
                // We're already scheduled to wake up by then.
                return;
            }
        }
        self.post_task_queue.insert(when);
    }
}
