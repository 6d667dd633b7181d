//! Single entry point for "give user U exactly N tickets for draw D".
//!
//! Two strategies sit behind it: the authoritative path (server-side
//! transactional allocation, the correctness-bearing one) and the local
//! degraded path (on-device best-effort numbers). Selection depends on the
//! account class, the backend toggle, and the ticket source; a transient
//! backend failure falls back to the local path, a business rejection never
//! does.

use chrono::{DateTime, Utc};
use sweepdraw_common::wire::{AssignNumbersRequest, RequestSource};
use sweepdraw_common::{derive_draw_id, DrawId, DrawStatus, Ticket, TicketAssignment, TicketSource};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::backend::AuthoritativeClient;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::state::{AccountClass, EngineState, Env};

pub struct RequestTicketsParams {
    pub prize_id: u64,
    pub round_start: DateTime<Utc>,
    pub quantity: u32,
    pub source: TicketSource,
}

/// Assign `quantity` tickets to the current user for the draw identified by
/// `(prize_id, round_start)`.
///
/// Each issued number is committed to the active partition before the next
/// is produced, so a failure mid-batch never loses what was already
/// assigned. Once the local fallback has produced numbers the authoritative
/// request is never retried for the same batch (that would double-issue).
pub fn request_tickets(
    state: &mut EngineState,
    backend: &mut dyn AuthoritativeClient,
    env: &Env,
    params: RequestTicketsParams,
) -> Result<Vec<TicketAssignment>, EngineError> {
    let RequestTicketsParams {
        prize_id,
        round_start,
        quantity,
        source,
    } = params;

    if quantity == 0 {
        return Err(EngineError::InvalidQuantity { quantity });
    }

    let draw_id = derive_draw_id(prize_id, round_start);
    state.draws.ensure(&draw_id, prize_id, round_start, env.now);
    if let Some(draw) = state.draws.get(&draw_id) {
        if draw.status == DrawStatus::Completed {
            return Err(EngineError::DrawAlreadyCompleted { draw_id });
        }
    }

    // Tentative debit for credit purchases: confirmed once numbers are
    // committed, released on a business rejection.
    let hold = match source {
        TicketSource::CreditSpend => {
            let amount = state.config.credit_cost_per_ticket * u64::from(quantity);
            let id = state.credits.place_hold(amount)?;
            state.events.emit(EngineEvent::CreditsHeld { amount });
            Some(id)
        }
        _ => None,
    };

    // Referral and bonus grants are client-issued and never hit the paid
    // allocation endpoint, so they have no remote source.
    let wire_source = RequestSource::for_source(source);
    let use_remote = state.config.backend_enabled
        && state.config.account_class == AccountClass::Registered;

    let remote_numbers = match wire_source {
        Some(wire_source) if use_remote => {
            let request = AssignNumbersRequest {
                prize_id,
                quantity,
                source: wire_source,
            };
            match backend.assign_numbers(&request) {
                Ok(response) if response.assigned_numbers.len() == quantity as usize => {
                    Some(response.assigned_numbers)
                }
                Ok(response) => {
                    // The server allocates whole batches; a short response is
                    // infrastructure trouble, not a partial grant.
                    warn!(
                        expected = quantity,
                        got = response.assigned_numbers.len(),
                        "allocation response length mismatch; using local numbers"
                    );
                    None
                }
                Err(err) if err.is_transient() => {
                    warn!(error = %err, draw_id = %draw_id, "authoritative allocation failed; using local fallback");
                    None
                }
                Err(err) => {
                    if let Some(hold) = hold {
                        let amount = state.credits.release(hold);
                        state.events.emit(EngineEvent::CreditsReverted { amount });
                    }
                    return Err(err.into());
                }
            }
        }
        _ => None,
    };

    let local_fallback = remote_numbers.is_none();
    let mut assignments = Vec::with_capacity(quantity as usize);
    match remote_numbers {
        Some(numbers) => {
            for number in numbers {
                commit_ticket(state, &draw_id, prize_id, number, source, env, false, &mut assignments);
            }
        }
        None => {
            for _ in 0..quantity {
                let number = state.pool.generate(&draw_id, env);
                commit_ticket(state, &draw_id, prize_id, number, source, env, true, &mut assignments);
            }
        }
    }

    if let Some(hold) = hold {
        state.credits.confirm(hold);
    }

    debug!(
        draw_id = %draw_id,
        count = assignments.len(),
        local_fallback,
        "tickets issued"
    );
    state.events.emit(EngineEvent::TicketsIssued {
        draw_id,
        numbers: assignments.iter().map(|a| a.ticket_number).collect(),
        source,
        local_fallback,
    });

    Ok(assignments)
}

#[allow(clippy::too_many_arguments)]
fn commit_ticket(
    state: &mut EngineState,
    draw_id: &DrawId,
    prize_id: u64,
    number: u32,
    source: TicketSource,
    env: &Env,
    local_fallback: bool,
    out: &mut Vec<TicketAssignment>,
) {
    state.pool.register(draw_id, number);
    let ticket = Ticket {
        ticket_id: Uuid::new_v4(),
        ticket_number: number,
        user_id: state.user_id.clone(),
        draw_id: draw_id.clone(),
        prize_id,
        source,
        created_at: env.now,
        is_winner: false,
        won_at: None,
        prize_name: None,
        prize_image: None,
    };
    out.push(TicketAssignment {
        ticket_id: ticket.ticket_id,
        draw_id: draw_id.clone(),
        ticket_number: number,
        local_fallback,
    });
    state.tickets.push_active(ticket);
}
