use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::config::{LONG_TTL, SHORT_TTL};
use crate::message::question::Question;
use crate::message::resource::Resource;
use crate::message::DnsType;
use crate::message::name::Name;

use super::agent::{Agent, AgentOps, Section, SharedResource};

// Wake delays between re-announcements after the initial one (RFC 6762
// §8.3 doubling).
const ANNOUNCE_DELAYS_SECS: [u64; 4] = [1, 1, 2, 4];

// An InstancePublisher advertises one service instance: PTR from the
// service to the instance, SRV and TXT for the instance, and the shared
// host address records alongside. The three records are shared with the
// outbound queues, so overlapping announcements and query responses
// coalesce to one copy per message.
//
// On quit, the records are re-posted once with TTL 0 (a goodbye); the send
// cycle retires them afterwards, so nothing for this instance is ever sent
// again.
pub(crate) struct InstancePublisher {
    instance_full_name: Name,
    service_full_name: Name,
    ptr: SharedResource,
    srv: SharedResource,
    txt: SharedResource,
    announcements_sent: usize,
    ending: bool,
}

impl InstancePublisher {
    pub(crate) fn new(
        host_full_name: Name,
        instance_full_name: Name,
        service_full_name: Name,
        port: u16,
        text: Vec<String>,
    ) -> Self {
        let ptr = Resource::ptr(
            service_full_name.clone(),
            instance_full_name.clone(),
            LONG_TTL,
        );

        // SRV and TXT are unique to this instance, so they carry the
        // cache-flush bit (RFC 6762 §10.2).
        let mut srv = Resource::srv(
            instance_full_name.clone(),
            0,
            0,
            port,
            host_full_name,
            SHORT_TTL,
        );
        srv.cache_flush = true;

        let mut txt = Resource::txt(instance_full_name.clone(), text, LONG_TTL);
        txt.cache_flush = true;

        InstancePublisher {
            instance_full_name,
            service_full_name,
            ptr: Rc::new(RefCell::new(ptr)),
            srv: Rc::new(RefCell::new(srv)),
            txt: Rc::new(RefCell::new(txt)),
            announcements_sent: 0,
            ending: false,
        }
    }

    fn announce(&mut self, ops: &mut AgentOps) {
        let now = ops.now;
        ops.send_resource(self.ptr.clone(), Section::Answer, now);
        ops.send_resource(self.srv.clone(), Section::Answer, now);
        ops.send_resource(self.txt.clone(), Section::Answer, now);
        ops.send_addresses(Section::Additional, now);
        self.announcements_sent += 1;
    }
}

impl Agent for InstancePublisher {
    fn start(&mut self, ops: &mut AgentOps) {
        log::debug!("publishing {}", self.instance_full_name);
        self.announce(ops);
        ops.wake_at(ops.now + Duration::from_secs(ANNOUNCE_DELAYS_SECS[0]));
    }

    fn receive_question(&mut self, question: &Question, ops: &mut AgentOps) {
        if self.ending {
            return;
        }
        let now = ops.now;

        if question.name.eq_ignore_case(&self.service_full_name) {
            if let DnsType::Ptr | DnsType::All = question.typ {
                ops.send_resource(self.ptr.clone(), Section::Answer, now);
                ops.send_resource(self.srv.clone(), Section::Additional, now);
                ops.send_resource(self.txt.clone(), Section::Additional, now);
                ops.send_addresses(Section::Additional, now);
            }
            return;
        }

        if question.name.eq_ignore_case(&self.instance_full_name) {
            match question.typ {
                DnsType::Srv => {
                    ops.send_resource(self.srv.clone(), Section::Answer, now);
                    ops.send_addresses(Section::Additional, now);
                }
                DnsType::Txt => {
                    ops.send_resource(self.txt.clone(), Section::Answer, now);
                }
                DnsType::All => {
                    ops.send_resource(self.srv.clone(), Section::Answer, now);
                    ops.send_resource(self.txt.clone(), Section::Answer, now);
                    ops.send_addresses(Section::Additional, now);
                }
                _ => {}
            }
        }
    }

    fn wake(&mut self, ops: &mut AgentOps) {
        if self.ending {
            // The goodbye left with the previous send cycle.
            ops.remove_self();
            return;
        }
        self.announce(ops);
        if self.announcements_sent <= ANNOUNCE_DELAYS_SECS.len() {
            let delay = ANNOUNCE_DELAYS_SECS[self.announcements_sent - 1];
            ops.wake_at(ops.now + Duration::from_secs(delay));
        }
    }

    fn quit(&mut self, ops: &mut AgentOps) {
        if self.ending {
            return;
        }
        self.ending = true;
        log::debug!("unpublishing {}", self.instance_full_name);

        let now = ops.now;
        self.ptr.borrow_mut().ttl = 0;
        self.srv.borrow_mut().ttl = 0;
        self.txt.borrow_mut().ttl = 0;
        ops.send_resource(self.ptr.clone(), Section::Answer, now);
        ops.send_resource(self.srv.clone(), Section::Answer, now);
        ops.send_resource(self.txt.clone(), Section::Answer, now);

        // Stick around long enough for the goodbye to be sent.
        ops.wake_at(now);
    }
}
