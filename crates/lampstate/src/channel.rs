//! Single-slot mailbox between input producers and the render loop.
//!
//! Producers overwrite whatever is pending; the render loop takes the slot
//! once per frame. Only the latest request matters for what the lamp shows,
//! so dropped intermediate transitions are expected and not reported as
//! errors.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::fsm::Transition;

const EMPTY: u8 = 0;

fn encode(transition: Transition) -> u8 {
    match transition {
        Transition::SetRed => 1,
        Transition::SetBlinking => 2,
        Transition::SetGreen => 3,
        Transition::SetNextTargetState => 4,
    }
}

fn decode(raw: u8) -> Option<Transition> {
    match raw {
        1 => Some(Transition::SetRed),
        2 => Some(Transition::SetBlinking),
        3 => Some(Transition::SetGreen),
        4 => Some(Transition::SetNextTargetState),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Slot {
    pending: AtomicU8,
}

/// Constructor for the publisher/consumer pair.
pub struct StateChannel;

impl StateChannel {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> (StatePublisher, StateConsumer) {
        let slot = Arc::new(Slot::default());
        (
            StatePublisher { slot: slot.clone() },
            StateConsumer { slot },
        )
    }
}

/// Write side. Cheap to clone and safe to use from any thread.
#[derive(Debug, Clone)]
pub struct StatePublisher {
    slot: Arc<Slot>,
}

impl StatePublisher {
    /// Stores `transition` as the pending request, replacing any unread one.
    ///
    /// Never blocks. Returns true when an unread transition was dropped.
    pub fn publish(&self, transition: Transition) -> bool {
        let previous = self.slot.pending.swap(encode(transition), Ordering::AcqRel);
        let overwritten = decode(previous);
        if let Some(dropped) = overwritten {
            tracing::trace!(?dropped, replacement = ?transition, "overwrote unread transition");
        }
        overwritten.is_some()
    }
}

/// Read side, owned by the render loop. Deliberately not `Clone`.
#[derive(Debug)]
pub struct StateConsumer {
    slot: Arc<Slot>,
}

impl StateConsumer {
    /// Takes the pending transition, leaving the slot empty.
    pub fn consume_if_any(&self) -> Option<Transition> {
        decode(self.slot.pending.swap(EMPTY, Ordering::AcqRel))
    }

    /// Creates another publisher feeding this consumer.
    pub fn publisher(&self) -> StatePublisher {
        StatePublisher {
            slot: self.slot.clone(),
        }
    }
}
