//! Applies a known winning number against the local ticket set.
//!
//! The winning number is decided by the authoritative resolver; this module
//! never picks a winner for a real draw on its own, so two devices can
//! never disagree about an outcome. What it does own is the local
//! migration: tickets of a completed draw move from the active partition to
//! the resolved one, exactly once.

use sha2::{Digest, Sha256};
use sweepdraw_common::wire::RelayMessage;
use sweepdraw_common::{DrawId, DrawStatus, ExtractionResult};
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::relay::ResultRelay;
use crate::state::{EngineState, Env};

pub struct ResolveDrawParams {
    pub draw_id: DrawId,
    pub prize_id: u64,
    pub winning_number: u32,
    pub prize_name: String,
    pub prize_image: String,
}

pub struct ForceResolveParams {
    pub draw_id: DrawId,
    pub prize_id: u64,
    pub prize_name: String,
    pub prize_image: String,
}

/// Move a draw into the countdown phase. Stale or repeated calls are
/// discarded by the forward-only transition rule.
pub fn begin_countdown(state: &mut EngineState, draw_id: &DrawId) -> Result<bool, EngineError> {
    state.draws.advance(draw_id, DrawStatus::Countdown)
}

/// Apply `winning_number` to the user's tickets for a draw and migrate them
/// to the resolved partition.
///
/// Completion is terminal and idempotent: resolving an already-completed
/// draw reports the recorded outcome and touches nothing. When `relay` is
/// given, the result is published for other ticket holders of the round;
/// pass `None` when the result itself arrived over the relay.
pub fn resolve_draw(
    state: &mut EngineState,
    relay: Option<&mut dyn ResultRelay>,
    env: &Env,
    params: ResolveDrawParams,
) -> Result<ExtractionResult, EngineError> {
    let ResolveDrawParams {
        draw_id,
        prize_id,
        winning_number,
        prize_name,
        prize_image,
    } = params;

    if let Some(draw) = state.draws.get(&draw_id) {
        if draw.status == DrawStatus::Completed {
            let resolved = state.tickets.resolved_for_draw(&draw_id);
            return Ok(ExtractionResult {
                is_winner: resolved.iter().any(|t| t.is_winner),
                winning_number: draw.winning_number.unwrap_or(winning_number),
                user_numbers: resolved.iter().map(|t| t.ticket_number).collect(),
                prize_id,
                prize_name,
                prize_image,
            });
        }
        // Transient "resolution in flight" marker, then terminal completion.
        state.draws.advance(&draw_id, DrawStatus::Extracting)?;
        let total_issued = state.pool.assigned_count(&draw_id);
        state.draws.complete(&draw_id, winning_number, total_issued)?;
    }

    let outcome = state
        .tickets
        .settle_draw(&draw_id, winning_number, env.now, &prize_name, &prize_image);

    // Record as seen so a later reconcile pass never re-surfaces a draw the
    // user just watched resolve.
    state.seen.record(draw_id.clone(), state.config.seen_draws_cap);

    if let Some(relay) = relay {
        if let Some(draw) = state.draws.get(&draw_id) {
            let message = RelayMessage {
                prize_id,
                winning_number,
                status: DrawStatus::Completed,
                round_version: draw.round_version(),
                extracted_at: env.now,
            };
            if let Err(err) = relay.publish(&message) {
                // Fan-out is best effort; other clients fall back to polling.
                warn!(error = %err, draw_id = %draw_id, "relay publish failed");
            }
        }
    }

    debug!(
        draw_id = %draw_id,
        winning_number,
        is_winner = outcome.is_winner,
        "draw resolved"
    );
    state.events.emit(EngineEvent::DrawResolved {
        draw_id,
        winning_number,
        is_winner: outcome.is_winner,
    });
    state.presenting_result = true;

    Ok(ExtractionResult {
        is_winner: outcome.is_winner,
        winning_number,
        user_numbers: outcome.user_numbers,
        prize_id,
        prize_name,
        prize_image,
    })
}

/// Operator/debug variant: instead of drawing from the pool it
/// deterministically awards the caller's first active ticket number. Wired
/// only to test and operator tooling, never to real draws.
pub fn resolve_draw_forced(
    state: &mut EngineState,
    relay: Option<&mut dyn ResultRelay>,
    env: &Env,
    params: ForceResolveParams,
) -> Result<ExtractionResult, EngineError> {
    let ForceResolveParams {
        draw_id,
        prize_id,
        prize_name,
        prize_image,
    } = params;

    let winning_number = state
        .tickets
        .active_for_draw(&draw_id)
        .first()
        .map(|t| t.ticket_number)
        .ok_or_else(|| EngineError::NoActiveTickets {
            draw_id: draw_id.clone(),
        })?;

    resolve_draw(
        state,
        relay,
        env,
        ResolveDrawParams {
            draw_id,
            prize_id,
            winning_number,
            prize_name,
            prize_image,
        },
    )
}

/// Uniform winning-number selection in `[1, total_issued]`.
///
/// This is the authoritative-side derivation; the client only ever applies
/// a number it was handed. It lives here so server simulations and operator
/// tooling share one algorithm with the contract stated in one place.
pub fn pick_winning_number(total_issued: u64, seed: &[u8]) -> Option<u32> {
    if total_issued == 0 {
        return None;
    }
    let digest: [u8; 32] = Sha256::digest(seed).into();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[0..16]);
    let raw = u128::from_be_bytes(bytes);
    Some((raw % u128::from(total_issued)) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use sweepdraw_common::{derive_draw_id, Ticket, TicketSource};
    use uuid::Uuid;

    use crate::relay::{MemoryRelay, RelayListener, RelayPoll};
    use crate::state::{EngineConfig, EngineState};

    fn env() -> Env {
        Env::at(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap())
    }

    fn state_with_tickets(numbers: &[u32]) -> (EngineState, DrawId) {
        let mut state = EngineState::new(EngineConfig::default(), "u1", 0).unwrap();
        let draw_id = derive_draw_id(4, env().now);
        state.draws.ensure(&draw_id, 4, env().now, env().now);
        for &n in numbers {
            state.pool.register(&draw_id, n);
            state.tickets.push_active(Ticket {
                ticket_id: Uuid::new_v4(),
                ticket_number: n,
                user_id: "u1".to_string(),
                draw_id: draw_id.clone(),
                prize_id: 4,
                source: TicketSource::AdWatch,
                created_at: env().now,
                is_winner: false,
                won_at: None,
                prize_name: None,
                prize_image: None,
            });
        }
        (state, draw_id)
    }

    fn resolve_params(draw_id: &DrawId, winning_number: u32) -> ResolveDrawParams {
        ResolveDrawParams {
            draw_id: draw_id.clone(),
            prize_id: 4,
            winning_number,
            prize_name: "Console".to_string(),
            prize_image: "console.png".to_string(),
        }
    }

    #[test]
    fn test_resolve_marks_winner_and_empties_active() {
        let (mut state, draw_id) = state_with_tickets(&[10, 20, 30, 40, 50]);
        let result =
            resolve_draw(&mut state, None, &env(), resolve_params(&draw_id, 30)).unwrap();

        assert!(result.is_winner);
        assert_eq!(result.user_numbers, vec![10, 20, 30, 40, 50]);

        assert!(state.tickets.active_for_draw(&draw_id).is_empty());
        let resolved = state.tickets.resolved_for_draw(&draw_id);
        assert_eq!(resolved.len(), 5);
        let winner = resolved.iter().find(|t| t.is_winner).unwrap();
        assert_eq!(winner.ticket_number, 30);
        assert!(winner.won_at.is_some());
        assert_eq!(winner.prize_name.as_deref(), Some("Console"));
        assert_eq!(resolved.iter().filter(|t| !t.is_winner).count(), 4);

        let draw = state.draws.get(&draw_id).unwrap();
        assert_eq!(draw.status, DrawStatus::Completed);
        assert_eq!(draw.winning_number, Some(30));
        assert_eq!(draw.total_issued, 5);
    }

    #[test]
    fn test_no_stake_never_wins() {
        let (mut state, draw_id) = state_with_tickets(&[]);
        let result =
            resolve_draw(&mut state, None, &env(), resolve_params(&draw_id, 30)).unwrap();
        assert!(!result.is_winner);
        assert!(result.user_numbers.is_empty());
    }

    #[test]
    fn test_second_resolve_is_noop() {
        let (mut state, draw_id) = state_with_tickets(&[10, 20]);
        resolve_draw(&mut state, None, &env(), resolve_params(&draw_id, 20)).unwrap();
        let resolved_before = state.tickets.resolved().to_vec();

        // Even a different number cannot reopen a completed draw
        let replay =
            resolve_draw(&mut state, None, &env(), resolve_params(&draw_id, 10)).unwrap();
        assert_eq!(replay.winning_number, 20);
        assert!(replay.is_winner);
        assert_eq!(state.tickets.resolved(), resolved_before.as_slice());
    }

    #[test]
    fn test_resolve_publishes_round_versioned_result() {
        let (mut state, draw_id) = state_with_tickets(&[10, 20]);
        let mut relay = MemoryRelay::default();
        resolve_draw(
            &mut state,
            Some(&mut relay),
            &env(),
            resolve_params(&draw_id, 20),
        )
        .unwrap();

        let expected_version = state.draws.get(&draw_id).unwrap().round_version();
        let listener = RelayListener::open(4, expected_version, &env(), 5);
        match listener.poll(&relay, &env()) {
            RelayPoll::Ready(msg) => {
                assert_eq!(msg.winning_number, 20);
                assert_eq!(msg.round_version, expected_version);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[test]
    fn test_forced_resolve_awards_first_active_number() {
        let (mut state, draw_id) = state_with_tickets(&[44, 55]);
        let result = resolve_draw_forced(
            &mut state,
            None,
            &env(),
            ForceResolveParams {
                draw_id: draw_id.clone(),
                prize_id: 4,
                prize_name: "Console".to_string(),
                prize_image: "console.png".to_string(),
            },
        )
        .unwrap();
        assert!(result.is_winner);
        assert_eq!(result.winning_number, 44);
    }

    #[test]
    fn test_forced_resolve_without_stake_errors() {
        let (mut state, draw_id) = state_with_tickets(&[]);
        let err = resolve_draw_forced(
            &mut state,
            None,
            &env(),
            ForceResolveParams {
                draw_id,
                prize_id: 4,
                prize_name: String::new(),
                prize_image: String::new(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::NoActiveTickets { .. }));
    }

    #[test]
    fn test_pick_winning_number_bounds() {
        assert_eq!(pick_winning_number(0, b"seed"), None);
        for total in [1u64, 2, 5, 1000] {
            for seed in 0u32..50 {
                let n = pick_winning_number(total, &seed.to_be_bytes()).unwrap();
                assert!((1..=total as u32).contains(&n));
            }
        }
        // Deterministic for a fixed seed
        assert_eq!(
            pick_winning_number(1000, b"fixed"),
            pick_winning_number(1000, b"fixed")
        );
    }
}
