//! Read-only views over the engine state for the presentation layer.

use sweepdraw_common::{Draw, DrawId, DrawStatus, Ticket};

use crate::state::EngineState;

pub fn active_tickets<'a>(state: &'a EngineState, draw_id: Option<&DrawId>) -> Vec<&'a Ticket> {
    match draw_id {
        Some(id) => state.tickets.active_for_draw(id),
        None => state.tickets.active().iter().collect(),
    }
}

pub fn resolved_tickets<'a>(state: &'a EngineState, draw_id: Option<&DrawId>) -> Vec<&'a Ticket> {
    match draw_id {
        Some(id) => state.tickets.resolved_for_draw(id),
        None => state.tickets.resolved().iter().collect(),
    }
}

pub fn has_stake(state: &EngineState, draw_id: &DrawId) -> bool {
    state.tickets.has_stake(draw_id)
}

pub fn draw<'a>(state: &'a EngineState, draw_id: &DrawId) -> Option<&'a Draw> {
    state.draws.get(draw_id)
}

/// Completed draws known locally, capped.
pub fn draw_history(state: &EngineState, limit: usize) -> Vec<&Draw> {
    state
        .draws
        .iter()
        .filter(|d| d.status == DrawStatus::Completed)
        .take(limit)
        .collect()
}

pub fn seen_draws(state: &EngineState) -> Vec<&DrawId> {
    state.seen.iter().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreditBalanceView {
    pub confirmed: u64,
    pub held: u64,
    pub available: u64,
}

pub fn credit_balance(state: &EngineState) -> CreditBalanceView {
    CreditBalanceView {
        confirmed: state.credits.balance(),
        held: state.credits.held(),
        available: state.credits.available(),
    }
}
