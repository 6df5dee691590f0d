use std::net::{Ipv4Addr, Ipv6Addr};
use std::rc::Rc;
use std::time::Instant;

use crate::message::question::Question;
use crate::message::resource::{Resource, ResourceData};
use crate::message::DnsType;
use crate::message::name::Name;

use super::agent::{Agent, AgentOps, Section};

/// Receives the result of [`Engine::resolve_host_name`](crate::Engine::resolve_host_name).
/// Both addresses are `None` when the host did not answer by the deadline.
pub type ResolveHostNameCallback = Box<dyn FnOnce(Option<Ipv4Addr>, Option<Ipv6Addr>)>;

// A HostNameResolver resolves one host name to its addresses. It posts one
// A and one AAAA question, collects matching answers, and finishes on the
// first end-of-message that produced an address, or at the caller's
// deadline with empty hands.
pub(crate) struct HostNameResolver {
    host_full_name: Name,
    deadline: Instant,
    v4: Option<Ipv4Addr>,
    v6: Option<Ipv6Addr>,
    callback: Option<ResolveHostNameCallback>,
}

impl HostNameResolver {
    pub(crate) fn new(
        host_full_name: Name,
        deadline: Instant,
        callback: ResolveHostNameCallback,
    ) -> Self {
        HostNameResolver {
            host_full_name,
            deadline,
            v4: None,
            v6: None,
            callback: Some(callback),
        }
    }

    fn finish(&mut self, ops: &mut AgentOps) {
        if let Some(callback) = self.callback.take() {
            callback(self.v4, self.v6);
        }
        ops.remove_self();
    }
}

impl Agent for HostNameResolver {
    fn start(&mut self, ops: &mut AgentOps) {
        let now = ops.now;
        ops.send_question(
            Rc::new(Question::new(self.host_full_name.clone(), DnsType::A)),
            now,
        );
        ops.send_question(
            Rc::new(Question::new(self.host_full_name.clone(), DnsType::Aaaa)),
            now,
        );
        ops.wake_at(self.deadline);
    }

    fn receive_resource(&mut self, resource: &Resource, section: Section, _ops: &mut AgentOps) {
        if section == Section::Expired || resource.ttl == 0 {
            return;
        }
        if !resource.name.eq_ignore_case(&self.host_full_name) {
            return;
        }
        match &resource.data {
            ResourceData::A(a) => self.v4 = Some(a.addr()),
            ResourceData::Aaaa(aaaa) => self.v6 = Some(aaaa.addr()),
            _ => {}
        }
    }

    fn end_of_message(&mut self, ops: &mut AgentOps) {
        if self.v4.is_some() || self.v6.is_some() {
            log::debug!(
                "resolved {}: v4 {:?}, v6 {:?}",
                self.host_full_name,
                self.v4,
                self.v6
            );
            self.finish(ops);
        }
    }

    fn wake(&mut self, ops: &mut AgentOps) {
        if ops.now >= self.deadline {
            log::debug!("resolution of {} timed out", self.host_full_name);
            self.finish(ops);
        }
    }

    fn quit(&mut self, ops: &mut AgentOps) {
        self.finish(ops);
    }
}
