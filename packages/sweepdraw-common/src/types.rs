use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Identifier of one prize round.
///
/// Derived deterministically from the prize and the round-start timestamp so
/// two devices computing it independently from the same inputs converge on
/// the same id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DrawId(String);

impl DrawId {
    pub fn new(raw: impl Into<String>) -> Self {
        DrawId(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DrawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the draw id for a (prize, round-start) pair.
///
/// `draw_id = "{prize_id}-" || hex(sha256(prize_id_be || round_start_millis_be))[..12]`
pub fn derive_draw_id(prize_id: u64, round_start: DateTime<Utc>) -> DrawId {
    let mut hasher = Sha256::new();
    hasher.update(prize_id.to_be_bytes());
    hasher.update(round_start.timestamp_millis().to_be_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    DrawId(format!("{}-{}", prize_id, &hex::encode(digest)[..12]))
}

/// Version token for one round of a prize.
///
/// The relay fences deliveries with this token: a listener opened for round
/// `X` must never be satisfied by a message carrying a different version.
pub fn round_version(round_start: DateTime<Utc>) -> u64 {
    round_start.timestamp_millis().max(0) as u64
}

/// The client-observed lifecycle of a draw.
///
/// Transitions only move forward; `Completed` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawStatus {
    Pending,
    Countdown,
    Extracting,
    Completed,
}

impl DrawStatus {
    /// Ordering rank used to reject backward transitions (a stale write must
    /// not knock a draw out of an in-flight countdown or extraction).
    pub fn rank(self) -> u8 {
        match self {
            DrawStatus::Pending => 0,
            DrawStatus::Countdown => 1,
            DrawStatus::Extracting => 2,
            DrawStatus::Completed => 3,
        }
    }
}

/// How a ticket was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketSource {
    AdWatch,
    CreditSpend,
    Referral,
    Bonus,
}

/// One prize round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Draw {
    pub id: DrawId,
    pub prize_id: u64,
    pub status: DrawStatus,
    /// Present only once `status == Completed`.
    pub winning_number: Option<u32>,
    /// Count of tickets issued into this draw's pool at resolution time.
    pub total_issued: u64,
    pub round_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Draw {
    pub fn round_version(&self) -> u64 {
        round_version(self.round_start)
    }
}

/// One entry in a draw's pool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Globally unique, safe to generate concurrently on multiple devices.
    pub ticket_id: Uuid,
    /// Unique within the draw — the allocation invariant.
    pub ticket_number: u32,
    pub user_id: String,
    pub draw_id: DrawId,
    pub prize_id: u64,
    pub source: TicketSource,
    pub created_at: DateTime<Utc>,
    /// False until resolution; set exactly once.
    pub is_winner: bool,
    pub won_at: Option<DateTime<Utc>>,
    pub prize_name: Option<String>,
    pub prize_image: Option<String>,
}

/// What the allocator hands back for each issued ticket.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TicketAssignment {
    pub ticket_id: Uuid,
    pub draw_id: DrawId,
    pub ticket_number: u32,
    /// True when the number came from the degraded on-device path.
    pub local_fallback: bool,
}

/// Outcome of applying a winning number against the caller's tickets.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub is_winner: bool,
    pub winning_number: u32,
    pub user_numbers: Vec<u32>,
    pub prize_id: u64,
    pub prize_name: String,
    pub prize_image: String,
}

/// A draw that completed while this client was not watching.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MissedExtraction {
    pub draw_id: DrawId,
    pub prize_id: u64,
    pub prize_name: String,
    pub prize_image: String,
    pub winning_number: u32,
    pub user_numbers: Vec<u32>,
    pub is_winner: bool,
    pub extracted_at: Option<DateTime<Utc>>,
}
