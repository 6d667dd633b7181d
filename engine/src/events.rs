//! Explicit event fan-out for the presentation layer.
//!
//! The bus is owned by the engine state and injected wherever a component
//! needs to signal; there is no module-global listener list. The UI drains
//! it on its own cadence.

use std::collections::VecDeque;

use sweepdraw_common::{DrawId, TicketSource};

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    TicketsIssued {
        draw_id: DrawId,
        numbers: Vec<u32>,
        source: TicketSource,
        local_fallback: bool,
    },
    DrawResolved {
        draw_id: DrawId,
        winning_number: u32,
        is_winner: bool,
    },
    MissedResultsFound {
        count: usize,
    },
    CreditsHeld {
        amount: u64,
    },
    CreditsReverted {
        amount: u64,
    },
}

#[derive(Default, Debug)]
pub struct EventBus {
    pending: VecDeque<EngineEvent>,
}

impl EventBus {
    pub fn emit(&mut self, event: EngineEvent) {
        self.pending.push_back(event);
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.pending.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties_in_order() {
        let mut bus = EventBus::default();
        bus.emit(EngineEvent::CreditsHeld { amount: 10 });
        bus.emit(EngineEvent::CreditsReverted { amount: 10 });
        assert_eq!(bus.len(), 2);

        let drained = bus.drain();
        assert_eq!(drained[0], EngineEvent::CreditsHeld { amount: 10 });
        assert_eq!(drained[1], EngineEvent::CreditsReverted { amount: 10 });
        assert!(bus.is_empty());
    }
}
