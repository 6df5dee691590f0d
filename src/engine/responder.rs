use std::time::Duration;

use rand::Rng;

use crate::message::question::Question;
use crate::message::DnsType;
use crate::message::name::Name;

use super::agent::{Agent, AgentOps, Section};

// Maximum random answer delay, the mDNS shared-record tie-break policy
// (RFC 6762 §6).
const MAX_ANSWER_DELAY_MS: u64 = 120;

// The AddressResponder answers A/AAAA/ANY queries for the local host name
// with the engine's shared address placeholder records. It is a pure
// reactive: it never posts questions and never wakes.
pub(crate) struct AddressResponder {
    host_full_name: Name,
}

impl AddressResponder {
    // Registration key; host and service keys always end in a dot, so this
    // can never collide with one.
    pub(crate) const KEY: &'static str = "address-responder";

    pub(crate) fn new(host_full_name: Name) -> Self {
        AddressResponder { host_full_name }
    }
}

impl Agent for AddressResponder {
    fn start(&mut self, _ops: &mut AgentOps) {}

    fn receive_question(&mut self, question: &Question, ops: &mut AgentOps) {
        if !question.name.eq_ignore_case(&self.host_full_name) {
            return;
        }
        match question.typ {
            DnsType::A | DnsType::Aaaa | DnsType::All => {}
            _ => return,
        }

        let delay = Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_ANSWER_DELAY_MS));
        log::trace!(
            "answering {} question for {} in {:?}",
            question.typ,
            question.name,
            delay
        );
        ops.send_addresses(Section::Answer, ops.now + delay);
    }

    fn quit(&mut self, ops: &mut AgentOps) {
        ops.remove_self();
    }
}
