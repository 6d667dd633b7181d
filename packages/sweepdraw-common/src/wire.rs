//! Boundary DTOs for the authoritative backend and the realtime relay.
//!
//! Upstream payloads arrive with either snake_case or camelCase field names
//! depending on which service produced them. Normalization happens here,
//! once: every accepted spelling is declared as a serde alias on the DTO,
//! and the rest of the engine only ever sees the canonical snake_case shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{DrawStatus, TicketSource};

/// Sources accepted by the paid allocation endpoint.
///
/// Referral and bonus grants are issued on-device and never hit this
/// endpoint, so they have no wire representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    Ad,
    Credits,
}

impl RequestSource {
    pub fn for_source(source: TicketSource) -> Option<Self> {
        match source {
            TicketSource::AdWatch => Some(RequestSource::Ad),
            TicketSource::CreditSpend => Some(RequestSource::Credits),
            TicketSource::Referral | TicketSource::Bonus => None,
        }
    }
}

/// Request body for the authoritative ticket-number allocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignNumbersRequest {
    pub prize_id: u64,
    pub quantity: u32,
    pub source: RequestSource,
}

/// Successful allocation response. `assigned_numbers.len()` must equal the
/// requested quantity; the engine treats a mismatch as a malformed response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignNumbersResponse {
    #[serde(alias = "assignedNumbers")]
    pub assigned_numbers: Vec<u32>,
}

impl AssignNumbersResponse {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Result of a draw as reported by the authoritative source, scoped to the
/// querying user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawResultPayload {
    #[serde(alias = "isWinner")]
    pub is_winner: bool,
    #[serde(alias = "winningNumber")]
    pub winning_number: u32,
    #[serde(alias = "userNumbers", default)]
    pub user_numbers: Vec<u32>,
}

impl DrawResultPayload {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// One entry of the remote draw list, most recent first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawSummary {
    pub id: String,
    #[serde(alias = "prizeId")]
    pub prize_id: u64,
    #[serde(alias = "prizeName", default)]
    pub prize_name: String,
    #[serde(alias = "prizeImage", default)]
    pub prize_image: String,
    #[serde(alias = "winningNumber")]
    pub winning_number: Option<u32>,
    pub status: DrawStatus,
    #[serde(alias = "extractedAt")]
    pub extracted_at: Option<DateTime<Utc>>,
}

impl DrawSummary {
    pub fn from_json(raw: &str) -> Result<Vec<Self>, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Fan-out message published to the realtime relay, keyed by `prize_id` and
/// fenced by `round_version`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    #[serde(alias = "prizeId")]
    pub prize_id: u64,
    #[serde(alias = "winningNumber")]
    pub winning_number: u32,
    pub status: DrawStatus,
    #[serde(alias = "roundVersion")]
    pub round_version: u64,
    #[serde(alias = "extractedAt")]
    pub extracted_at: DateTime<Utc>,
}

impl RelayMessage {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
