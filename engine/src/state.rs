use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sweepdraw_common::{Draw, DrawId, DrawStatus, Ticket};

use crate::credits::CreditLedger;
use crate::error::EngineError;
use crate::events::EventBus;
use crate::number_pool::NumberPool;

/// Account classes the allocator switches strategy on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccountClass {
    /// Signed-in account with a server-side balance; allocation goes through
    /// the authoritative path.
    Registered,
    /// Anonymous/offline-class account; allocation is always local.
    Anonymous,
}

/// Execution context passed into every operation. Time is injected rather
/// than read ambiently so operations stay deterministic under test.
#[derive(Clone, Copy, Debug)]
pub struct Env {
    pub now: DateTime<Utc>,
}

impl Env {
    pub fn at(now: DateTime<Utc>) -> Self {
        Env { now }
    }
}

pub const DEFAULT_RECONCILE_DEPTH: usize = 10;
pub const DEFAULT_SEEN_DRAWS_CAP: usize = 50;
pub const DEFAULT_RELAY_WAIT_SECONDS: i64 = 5;
const MAX_RELAY_WAIT_SECONDS: i64 = 60;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub account_class: AccountClass,
    /// When false the authoritative backend is treated as unreachable and
    /// every allocation uses the local path.
    pub backend_enabled: bool,
    pub credit_cost_per_ticket: u64,
    /// How many recent draws one reconcile pass examines.
    pub reconcile_depth: usize,
    /// Bound on the seen-draws ledger; oldest entries are evicted first.
    pub seen_draws_cap: usize,
    /// How long a relay listener waits before falling back to a direct query.
    pub relay_wait_seconds: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            account_class: AccountClass::Registered,
            backend_enabled: true,
            credit_cost_per_ticket: 10,
            reconcile_depth: DEFAULT_RECONCILE_DEPTH,
            seen_draws_cap: DEFAULT_SEEN_DRAWS_CAP,
            relay_wait_seconds: DEFAULT_RELAY_WAIT_SECONDS,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.reconcile_depth == 0 {
            return Err(EngineError::InvalidConfig {
                reason: "reconcile_depth must be positive".to_string(),
            });
        }
        if self.seen_draws_cap < self.reconcile_depth {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "seen_draws_cap ({}) below reconcile_depth ({})",
                    self.seen_draws_cap, self.reconcile_depth
                ),
            });
        }
        if self.relay_wait_seconds <= 0 || self.relay_wait_seconds > MAX_RELAY_WAIT_SECONDS {
            return Err(EngineError::InvalidConfig {
                reason: format!(
                    "relay_wait_seconds must be in 1..={}",
                    MAX_RELAY_WAIT_SECONDS
                ),
            });
        }
        Ok(())
    }
}

/// Registry of draws known to this device, keyed by draw id.
#[derive(Default, Debug)]
pub struct DrawBook {
    draws: BTreeMap<DrawId, Draw>,
}

impl DrawBook {
    pub fn get(&self, id: &DrawId) -> Option<&Draw> {
        self.draws.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Draw> {
        self.draws.values()
    }

    /// A draw exists from the first ticket request for its (prize, round)
    /// pair; creation is implicit and idempotent.
    pub fn ensure(
        &mut self,
        id: &DrawId,
        prize_id: u64,
        round_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> &Draw {
        self.draws.entry(id.clone()).or_insert_with(|| Draw {
            id: id.clone(),
            prize_id,
            status: DrawStatus::Pending,
            winning_number: None,
            total_issued: 0,
            round_start,
            created_at: now,
        })
    }

    /// Forward-only status transition. A stale write can never move a draw
    /// backward (e.g. knock an in-flight countdown back to pending); such
    /// writes are discarded, returning `false`.
    pub fn advance(&mut self, id: &DrawId, status: DrawStatus) -> Result<bool, EngineError> {
        let draw = self
            .draws
            .get_mut(id)
            .ok_or_else(|| EngineError::DrawNotFound {
                draw_id: id.clone(),
            })?;
        if status.rank() <= draw.status.rank() {
            return Ok(false);
        }
        draw.status = status;
        Ok(true)
    }

    /// Terminal, idempotent completion: the winning number is fixed exactly
    /// once; a second call is a no-op returning `false`.
    pub fn complete(
        &mut self,
        id: &DrawId,
        winning_number: u32,
        total_issued: u64,
    ) -> Result<bool, EngineError> {
        let draw = self
            .draws
            .get_mut(id)
            .ok_or_else(|| EngineError::DrawNotFound {
                draw_id: id.clone(),
            })?;
        if draw.status == DrawStatus::Completed {
            return Ok(false);
        }
        draw.status = DrawStatus::Completed;
        draw.winning_number = Some(winning_number);
        draw.total_issued = total_issued;
        Ok(true)
    }
}

/// What a settle pass found among the user's tickets for one draw.
#[derive(Clone, Debug, PartialEq)]
pub struct SettleOutcome {
    pub user_numbers: Vec<u32>,
    pub is_winner: bool,
}

/// Active/resolved ticket partitions. Resolution moves tickets between the
/// partitions; nothing is ever deleted.
#[derive(Default, Debug)]
pub struct TicketBook {
    active: Vec<Ticket>,
    resolved: Vec<Ticket>,
}

impl TicketBook {
    pub fn push_active(&mut self, ticket: Ticket) {
        self.active.push(ticket);
    }

    pub fn active(&self) -> &[Ticket] {
        &self.active
    }

    pub fn resolved(&self) -> &[Ticket] {
        &self.resolved
    }

    pub fn active_for_draw(&self, id: &DrawId) -> Vec<&Ticket> {
        self.active.iter().filter(|t| &t.draw_id == id).collect()
    }

    pub fn resolved_for_draw(&self, id: &DrawId) -> Vec<&Ticket> {
        self.resolved.iter().filter(|t| &t.draw_id == id).collect()
    }

    pub fn has_stake(&self, id: &DrawId) -> bool {
        self.active.iter().any(|t| &t.draw_id == id)
            || self.resolved.iter().any(|t| &t.draw_id == id)
    }

    /// Move every ticket of `draw_id` out of the active partition. The ticket
    /// matching `winning_number` (if any) is marked winner, stamped with
    /// `won_at` and the prize display metadata; the rest migrate as losers.
    ///
    /// At most one ticket takes the win, even if a degraded-path collision
    /// ever slipped a duplicate number into the draw.
    pub fn settle_draw(
        &mut self,
        draw_id: &DrawId,
        winning_number: u32,
        won_at: DateTime<Utc>,
        prize_name: &str,
        prize_image: &str,
    ) -> SettleOutcome {
        let drained = std::mem::take(&mut self.active);
        let mut user_numbers = Vec::new();
        let mut is_winner = false;

        for mut ticket in drained {
            if &ticket.draw_id != draw_id {
                self.active.push(ticket);
                continue;
            }
            user_numbers.push(ticket.ticket_number);
            if ticket.ticket_number == winning_number && !is_winner {
                ticket.is_winner = true;
                ticket.won_at = Some(won_at);
                ticket.prize_name = Some(prize_name.to_string());
                ticket.prize_image = Some(prize_image.to_string());
                is_winner = true;
            }
            self.resolved.push(ticket);
        }

        SettleOutcome {
            user_numbers,
            is_winner,
        }
    }
}

/// Persisted record of draw ids this client has already reconciled. Bounded:
/// once past the cap, the oldest entries are evicted first.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeenDrawsLedger {
    entries: VecDeque<DrawId>,
}

impl SeenDrawsLedger {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn contains(&self, id: &DrawId) -> bool {
        self.entries.iter().any(|e| e == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawId> {
        self.entries.iter()
    }

    pub fn record(&mut self, id: DrawId, cap: usize) {
        if self.contains(&id) {
            return;
        }
        self.entries.push_back(id);
        while self.entries.len() > cap {
            self.entries.pop_front();
        }
    }
}

/// All device-local state the engine operates on. Single-writer: mutated
/// only by the operations in this crate, on the UI-thread event loop.
#[derive(Debug)]
pub struct EngineState {
    pub config: EngineConfig,
    pub user_id: String,
    pub draws: DrawBook,
    pub tickets: TicketBook,
    pub pool: NumberPool,
    pub seen: SeenDrawsLedger,
    pub credits: CreditLedger,
    pub events: EventBus,
    /// Set while a result modal is on screen; reconcile refuses to run until
    /// the caller dismisses it.
    pub presenting_result: bool,
}

impl EngineState {
    pub fn new(
        config: EngineConfig,
        user_id: impl Into<String>,
        starting_credits: u64,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(EngineState {
            config,
            user_id: user_id.into(),
            draws: DrawBook::default(),
            tickets: TicketBook::default(),
            pool: NumberPool::new(),
            seen: SeenDrawsLedger::default(),
            credits: CreditLedger::new(starting_credits),
            events: EventBus::default(),
            presenting_result: false,
        })
    }
}
