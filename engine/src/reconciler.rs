//! Catch-up pass for draws that completed while the client was away.
//!
//! On resume the client compares the remote draw list against its seen-draws
//! ledger, fetches results for completed draws it has not processed, and
//! surfaces the ones where the user actually held a stake — each exactly
//! once. Failure handling is asymmetric on purpose: a failed list fetch
//! aborts the pass with nothing marked (retried next resume), a failed
//! single-draw fetch is logged, skipped, and still marked seen to avoid a
//! retry storm.

use sweepdraw_common::{DrawId, DrawStatus, MissedExtraction};
use tracing::{debug, warn};

use crate::backend::AuthoritativeClient;
use crate::error::EngineError;
use crate::events::EngineEvent;
use crate::state::{EngineState, Env};

/// Find outcomes the client missed, newest first.
///
/// The caller presents one entry at a time and calls [`dismiss_result`]
/// between them; while anything is being presented the pass refuses to run.
pub fn reconcile(
    state: &mut EngineState,
    backend: &dyn AuthoritativeClient,
    env: &Env,
) -> Result<Vec<MissedExtraction>, EngineError> {
    if state.presenting_result {
        return Err(EngineError::ResultPresentationActive);
    }

    let summaries = backend.recent_draws(state.config.reconcile_depth)?;

    // First run on this device: everything but the newest draw predates the
    // ledger and must not trigger retroactive notices.
    if state.seen.is_empty() {
        for summary in summaries.iter().skip(1) {
            state
                .seen
                .record(DrawId::new(summary.id.clone()), state.config.seen_draws_cap);
        }
    }

    let mut missed = Vec::new();
    for summary in &summaries {
        let draw_id = DrawId::new(summary.id.clone());
        if summary.status != DrawStatus::Completed || state.seen.contains(&draw_id) {
            continue;
        }

        let result = match backend.draw_result(&draw_id) {
            Ok(result) => result,
            Err(err) => {
                warn!(draw_id = %draw_id, error = %err, "skipping unreadable draw result");
                state.seen.record(draw_id, state.config.seen_draws_cap);
                continue;
            }
        };

        // Checked means seen, stake or not — it is never re-checked.
        state.seen.record(draw_id.clone(), state.config.seen_draws_cap);

        let held_locally = state.tickets.has_stake(&draw_id);
        if result.user_numbers.is_empty() && !held_locally {
            continue;
        }

        // Mirror the live resolver's migration so the active view never
        // still lists tickets for a draw we are about to announce.
        let outcome = state.tickets.settle_draw(
            &draw_id,
            result.winning_number,
            env.now,
            &summary.prize_name,
            &summary.prize_image,
        );
        if state.draws.get(&draw_id).is_some() {
            let total_issued = state.pool.assigned_count(&draw_id);
            state
                .draws
                .complete(&draw_id, result.winning_number, total_issued)?;
        }

        let user_numbers = if result.user_numbers.is_empty() {
            outcome.user_numbers.clone()
        } else {
            result.user_numbers.clone()
        };

        missed.push(MissedExtraction {
            draw_id,
            prize_id: summary.prize_id,
            prize_name: summary.prize_name.clone(),
            prize_image: summary.prize_image.clone(),
            winning_number: result.winning_number,
            user_numbers,
            is_winner: result.is_winner || outcome.is_winner,
            extracted_at: summary.extracted_at,
        });
    }

    debug!(checked = summaries.len(), missed = missed.len(), "reconcile pass done");
    if !missed.is_empty() {
        state
            .events
            .emit(EngineEvent::MissedResultsFound { count: missed.len() });
        state.presenting_result = true;
    }

    // Summaries arrive newest first, so the output already is too.
    Ok(missed)
}

/// Clear the presentation guard once the caller dismisses a result modal.
pub fn dismiss_result(state: &mut EngineState) {
    state.presenting_result = false;
}
