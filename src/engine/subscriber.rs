use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;
use std::time::Duration;

use crate::config::INITIAL_QUERY_INTERVAL;
use crate::message::question::Question;
use crate::message::resource::{Resource, ResourceData};
use crate::message::DnsType;
use crate::message::name::Name;
use crate::names;

use super::agent::{Agent, AgentOps, Section};

/// One discovered instance of a subscribed service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInstance {
    /// The service, e.g. `_foo._tcp`.
    pub service_name: String,
    /// The instance label, e.g. `bar`.
    pub instance_name: String,
    /// Full name of the host publishing the instance.
    pub target: String,
    pub port: u16,
    pub v4: Option<Ipv4Addr>,
    pub v6: Option<Ipv6Addr>,
    pub text: Vec<String>,
}

/// Receives instance snapshots for a subscribed service. `version`
/// increases with every change.
pub type ServiceInstanceCallback = Box<dyn FnMut(u64, &[ServiceInstance])>;

#[derive(Default)]
struct InstanceState {
    instance_name: String,
    target: Option<Name>,
    port: u16,
    v4: Option<Ipv4Addr>,
    v6: Option<Ipv6Addr>,
    text: Vec<String>,
}

// An InstanceSubscriber discovers instances of one service. It chases the
// DNS-SD record chain (PTR, then SRV/TXT, then A/AAAA for the target host),
// re-queries with exponential back-off, and emits a version-stamped
// snapshot after every inbound message that changed something.
pub(crate) struct InstanceSubscriber {
    service_name: String,
    service_full_name: Name,
    callback: ServiceInstanceCallback,
    // Keyed by the lowercased instance full name.
    instances: BTreeMap<String, InstanceState>,
    version: u64,
    dirty: bool,
    query_interval: Duration,
    query_backoff_cap: Duration,
}

impl InstanceSubscriber {
    pub(crate) fn new(
        service_name: String,
        service_full_name: Name,
        query_backoff_cap: Duration,
        callback: ServiceInstanceCallback,
    ) -> Self {
        InstanceSubscriber {
            service_name,
            service_full_name,
            callback,
            instances: BTreeMap::new(),
            version: 0,
            dirty: false,
            query_interval: INITIAL_QUERY_INTERVAL,
            query_backoff_cap,
        }
    }

    fn send_service_question(&self, ops: &mut AgentOps) {
        ops.send_question(
            Rc::new(Question::new(self.service_full_name.clone(), DnsType::Ptr)),
            ops.now,
        );
    }

    fn receive_ptr(&mut self, resource: &Resource, target: &Name, ops: &mut AgentOps) {
        if !resource.name.eq_ignore_case(&self.service_full_name) {
            return;
        }
        let instance_name = match names::instance_label(target, &self.service_full_name) {
            Some(label) => label,
            None => return,
        };
        if self.instances.contains_key(&target.key()) {
            ops.renew(resource);
            return;
        }

        log::debug!("new instance {target} of {}", self.service_full_name);
        self.instances.insert(
            target.key(),
            InstanceState {
                instance_name,
                ..Default::default()
            },
        );
        self.dirty = true;
        ops.renew(resource);

        // The PTR alone tells us nothing useful; chase the rest of the
        // record chain.
        ops.send_question(
            Rc::new(Question::new(target.clone(), DnsType::Srv)),
            ops.now,
        );
        ops.send_question(
            Rc::new(Question::new(target.clone(), DnsType::Txt)),
            ops.now,
        );
    }

    fn receive_srv(&mut self, resource: &Resource, ops: &mut AgentOps) {
        let (port, target) = match &resource.data {
            ResourceData::Srv(srv) => (srv.port, srv.target.clone()),
            _ => return,
        };
        let instance = match self.instances.get_mut(&resource.name.key()) {
            Some(instance) => instance,
            None => return,
        };

        let known_target = instance
            .target
            .as_ref()
            .map(|t| t.eq_ignore_case(&target))
            .unwrap_or(false);
        if !known_target || instance.port != port {
            instance.port = port;
            instance.target = Some(target.clone());
            instance.v4 = None;
            instance.v6 = None;
            self.dirty = true;
        }
        ops.renew(resource);

        if instance.v4.is_none() && instance.v6.is_none() {
            ops.send_question(Rc::new(Question::new(target.clone(), DnsType::A)), ops.now);
            ops.send_question(Rc::new(Question::new(target, DnsType::Aaaa)), ops.now);
        }
    }

    fn receive_txt(&mut self, resource: &Resource, ops: &mut AgentOps) {
        let text = match &resource.data {
            ResourceData::Txt(txt) => txt.txt.clone(),
            _ => return,
        };
        if let Some(instance) = self.instances.get_mut(&resource.name.key()) {
            if instance.text != text {
                instance.text = text;
                self.dirty = true;
            }
            ops.renew(resource);
        }
    }

    fn receive_address(&mut self, resource: &Resource, ops: &mut AgentOps) {
        let mut renew = false;
        for instance in self.instances.values_mut() {
            let matches = instance
                .target
                .as_ref()
                .map(|t| t.eq_ignore_case(&resource.name))
                .unwrap_or(false);
            if !matches {
                continue;
            }
            match &resource.data {
                ResourceData::A(a) => {
                    if instance.v4 != Some(a.addr()) {
                        instance.v4 = Some(a.addr());
                        self.dirty = true;
                    }
                    renew = true;
                }
                ResourceData::Aaaa(aaaa) => {
                    if instance.v6 != Some(aaaa.addr()) {
                        instance.v6 = Some(aaaa.addr());
                        self.dirty = true;
                    }
                    renew = true;
                }
                _ => {}
            }
        }
        if renew {
            ops.renew(resource);
        }
    }

    fn receive_expired(&mut self, resource: &Resource) {
        match &resource.data {
            ResourceData::Ptr(ptr) => {
                if resource.name.eq_ignore_case(&self.service_full_name)
                    && self.instances.remove(&ptr.ptr.key()).is_some()
                {
                    self.dirty = true;
                }
            }
            // An instance without a live SRV record is unreachable.
            ResourceData::Srv(_) => {
                if self.instances.remove(&resource.name.key()).is_some() {
                    self.dirty = true;
                }
            }
            ResourceData::Txt(_) => {
                if let Some(instance) = self.instances.get_mut(&resource.name.key()) {
                    if !instance.text.is_empty() {
                        instance.text.clear();
                        self.dirty = true;
                    }
                }
            }
            ResourceData::A(_) | ResourceData::Aaaa(_) => {
                for instance in self.instances.values_mut() {
                    let matches = instance
                        .target
                        .as_ref()
                        .map(|t| t.eq_ignore_case(&resource.name))
                        .unwrap_or(false);
                    if !matches {
                        continue;
                    }
                    match resource.data {
                        ResourceData::A(_) if instance.v4.is_some() => {
                            instance.v4 = None;
                            self.dirty = true;
                        }
                        ResourceData::Aaaa(_) if instance.v6.is_some() => {
                            instance.v6 = None;
                            self.dirty = true;
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    fn flush(&mut self) {
        if self.dirty {
            self.dirty = false;
            self.version += 1;
            let snapshot = self.snapshot();
            (self.callback)(self.version, &snapshot);
        }
    }

    fn snapshot(&self) -> Vec<ServiceInstance> {
        self.instances
            .values()
            .map(|instance| ServiceInstance {
                service_name: self.service_name.clone(),
                instance_name: instance.instance_name.clone(),
                target: instance
                    .target
                    .as_ref()
                    .map(|t| t.data.clone())
                    .unwrap_or_default(),
                port: instance.port,
                v4: instance.v4,
                v6: instance.v6,
                text: instance.text.clone(),
            })
            .collect()
    }
}

impl Agent for InstanceSubscriber {
    fn start(&mut self, ops: &mut AgentOps) {
        self.send_service_question(ops);
        ops.wake_at(ops.now + self.query_interval);
    }

    fn receive_resource(&mut self, resource: &Resource, section: Section, ops: &mut AgentOps) {
        if section == Section::Expired {
            // Expirations can arrive outside any inbound message, so flush
            // right away instead of waiting for an end-of-message.
            self.receive_expired(resource);
            self.flush();
            return;
        }
        if resource.ttl == 0 {
            // A goodbye. Removal arrives through the renewer's Expired
            // delivery; treating it as fresh data would resurrect state.
            return;
        }
        match &resource.data {
            ResourceData::Ptr(ptr) => {
                let target = ptr.ptr.clone();
                self.receive_ptr(resource, &target, ops);
            }
            ResourceData::Srv(_) => self.receive_srv(resource, ops),
            ResourceData::Txt(_) => self.receive_txt(resource, ops),
            ResourceData::A(_) | ResourceData::Aaaa(_) => self.receive_address(resource, ops),
            _ => {}
        }
    }

    fn end_of_message(&mut self, _ops: &mut AgentOps) {
        self.flush();
    }

    fn wake(&mut self, ops: &mut AgentOps) {
        // Re-query with exponential back-off until told to quit.
        self.send_service_question(ops);
        self.query_interval = (self.query_interval * 2).min(self.query_backoff_cap);
        ops.wake_at(ops.now + self.query_interval);
    }

    fn quit(&mut self, ops: &mut AgentOps) {
        ops.remove_self();
    }
}
