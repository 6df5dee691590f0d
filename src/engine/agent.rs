use std::cell::RefCell;
use std::rc::Rc;
use std::time::Instant;

use crate::message::question::Question;
use crate::message::resource::Resource;

// A record shared between agents and the outbound queues. Dedup within one
// outbound message is by pointer identity, and the engine retires sent
// goodbyes by rewriting the TTL through the shared cell.
pub(crate) type SharedResource = Rc<RefCell<Resource>>;

/// The message section a resource was seen in or is destined for.
///
/// `Expired` is local-only: the renewer uses it to tell agents that a
/// record they relied on has died. Expired resources are never transmitted.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Section {
    Answer,
    Authority,
    Additional,
    Expired,
}

// AgentOps is how agents talk back to the engine. Every agent callback
// receives a fresh sink; the engine applies it when the callback returns.
// This keeps agents free of engine back-pointers.
pub(crate) struct AgentOps {
    pub(crate) now: Instant,
    pub(crate) wakes: Vec<Instant>,
    pub(crate) questions: Vec<(Instant, Rc<Question>)>,
    pub(crate) resources: Vec<(Instant, SharedResource, Section)>,
    pub(crate) addresses: Vec<(Instant, Section)>,
    pub(crate) renewals: Vec<Resource>,
    pub(crate) removed: bool,
}

impl AgentOps {
    pub(crate) fn new(now: Instant) -> Self {
        AgentOps {
            now,
            wakes: vec![],
            questions: vec![],
            resources: vec![],
            addresses: vec![],
            renewals: vec![],
            removed: false,
        }
    }

    /// Asks the engine to call `wake` at `when`.
    pub(crate) fn wake_at(&mut self, when: Instant) {
        self.wakes.push(when);
    }

    /// Enqueues a question for transmission no earlier than `when` minus
    /// the aggregation window.
    pub(crate) fn send_question(&mut self, question: Rc<Question>, when: Instant) {
        self.questions.push((when, question));
    }

    /// Enqueues a resource for transmission in `section`. With
    /// [`Section::Expired`], the resource is instead delivered synchronously
    /// to every local agent and never transmitted.
    pub(crate) fn send_resource(&mut self, resource: SharedResource, section: Section, when: Instant) {
        self.resources.push((when, resource, section));
    }

    /// Enqueues the engine's shared address placeholder record(s).
    pub(crate) fn send_addresses(&mut self, section: Section, when: Instant) {
        self.addresses.push((when, section));
    }

    /// Asks the resource renewer to keep `resource` current.
    pub(crate) fn renew(&mut self, resource: &Resource) {
        self.renewals.push(resource.clone());
    }

    /// Asks the engine to drop this agent once the callback returns.
    pub(crate) fn remove_self(&mut self) {
        self.removed = true;
    }
}

// An Agent is a pluggable handler registered in the engine under a unique
// key. All callbacks run on the engine's single-threaded context and must
// not block; long-lived work is re-armed through `ops.wake_at`.
pub(crate) trait Agent {
    // The engine has started, or the agent was added to a started engine.
    fn start(&mut self, ops: &mut AgentOps);

    // A question arrived in an inbound message.
    fn receive_question(&mut self, _question: &Question, _ops: &mut AgentOps) {}

    // A resource arrived in an inbound message, or expired locally.
    fn receive_resource(&mut self, _resource: &Resource, _section: Section, _ops: &mut AgentOps) {}

    // All questions and resources of the current inbound message have been
    // delivered; flush any batched work.
    fn end_of_message(&mut self, _ops: &mut AgentOps) {}

    // A deadline requested via `ops.wake_at` has been reached.
    fn wake(&mut self, _ops: &mut AgentOps) {}

    // The agent should wind down and eventually call `ops.remove_self`
    // (immediately, or after a goodbye round).
    fn quit(&mut self, ops: &mut AgentOps);
}
