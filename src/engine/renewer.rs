use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use rand::Rng;

use crate::message::question::Question;
use crate::message::resource::{Resource, ResourceKey};

use super::agent::{Agent, AgentOps, Section};

// Renewal query times as permille of the TTL, per RFC 6762 §5.2. A random
// jitter of up to 20 permille (2%) is added to each, keeping queries inside
// the [80,82] / [85,87] / [90,92] / [95,97] percent bands.
const RENEWAL_PERMILLE: [u32; 4] = [800, 850, 900, 950];
const RENEWAL_JITTER_PERMILLE: u32 = 20;

struct Renewal {
    // Latest copy of the record being kept alive.
    resource: Resource,
    // When the current TTL interval began.
    seen: Instant,
    ttl: u32,
    // Renewal queries issued without a refreshing answer. At 4, the record
    // expires.
    strikes: usize,
    next_time: Instant,
}

impl Renewal {
    fn interval(&self) -> Option<Instant> {
        if self.strikes >= RENEWAL_PERMILLE.len() {
            // No more queries; next event is the expiry itself.
            return None;
        }
        let permille = RENEWAL_PERMILLE[self.strikes]
            + rand::thread_rng().gen_range(0..=RENEWAL_JITTER_PERMILLE);
        let millis = self.ttl as u64 * permille as u64;
        Some(self.seen + Duration::from_millis(millis))
    }

    fn expiry(&self) -> Instant {
        self.seen + Duration::from_secs(self.ttl as u64)
    }

    fn reset(&mut self, resource: &Resource, now: Instant) {
        self.resource = resource.clone();
        self.seen = now;
        self.ttl = resource.ttl;
        self.strikes = 0;
        self.next_time = self.interval().unwrap_or_else(|| self.expiry());
    }
}

// The ResourceRenewer keeps cached records alive on behalf of other agents.
// It is not registered in the agents-by-name map; the engine holds it
// directly and always offers it inbound resources first, so TTL schedules
// are registered before any agent reacts.
#[derive(Default)]
pub(crate) struct ResourceRenewer {
    renewals: HashMap<ResourceKey, Renewal>,
}

impl ResourceRenewer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    // Starts keeping `resource` current. A record already being renewed is
    // left on its existing schedule; inbound refreshes reset it.
    pub(crate) fn renew(&mut self, resource: &Resource, ops: &mut AgentOps) {
        if resource.ttl == 0 {
            return;
        }
        let key = resource.key();
        if self.renewals.contains_key(&key) {
            return;
        }
        let mut renewal = Renewal {
            resource: resource.clone(),
            seen: ops.now,
            ttl: resource.ttl,
            strikes: 0,
            next_time: ops.now,
        };
        renewal.next_time = renewal.interval().unwrap_or_else(|| renewal.expiry());
        ops.wake_at(renewal.next_time);
        self.renewals.insert(key, renewal);
    }

    fn expire(&mut self, key: &ResourceKey, ops: &mut AgentOps) {
        if let Some(renewal) = self.renewals.remove(key) {
            let mut expired = renewal.resource;
            expired.ttl = 0;
            log::debug!("record expired: {expired}");
            ops.send_resource(
                Rc::new(RefCell::new(expired)),
                Section::Expired,
                ops.now,
            );
        }
    }
}

impl Agent for ResourceRenewer {
    fn start(&mut self, _ops: &mut AgentOps) {}

    fn receive_resource(&mut self, resource: &Resource, section: Section, ops: &mut AgentOps) {
        if section == Section::Expired {
            return;
        }
        let key = resource.key();
        if !self.renewals.contains_key(&key) {
            return;
        }
        if resource.ttl == 0 {
            // The publisher said goodbye; expire right away.
            self.expire(&key, ops);
            return;
        }
        if let Some(renewal) = self.renewals.get_mut(&key) {
            renewal.reset(resource, ops.now);
            ops.wake_at(renewal.next_time);
        }
    }

    fn wake(&mut self, ops: &mut AgentOps) {
        let now = ops.now;

        let due: Vec<ResourceKey> = self
            .renewals
            .iter()
            .filter(|(_, renewal)| renewal.next_time <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in due {
            let expired = {
                let renewal = match self.renewals.get_mut(&key) {
                    Some(r) => r,
                    None => continue,
                };
                if now >= renewal.expiry() {
                    true
                } else {
                    // Ask again for the record before it lapses.
                    let question = Question::new(
                        renewal.resource.name.clone(),
                        renewal.resource.dns_type(),
                    );
                    ops.send_question(Rc::new(question), now);
                    renewal.strikes += 1;
                    renewal.next_time = renewal.interval().unwrap_or_else(|| renewal.expiry());
                    ops.wake_at(renewal.next_time);
                    false
                }
            };
            if expired {
                self.expire(&key, ops);
            }
        }
    }

    fn quit(&mut self, _ops: &mut AgentOps) {
        self.renewals.clear();
    }
}
