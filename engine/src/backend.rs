//! Seam to the authoritative allocation/resolution service.
//!
//! The service is expected to perform number allocation inside a
//! transaction, so concurrent requests from different devices for the same
//! draw never receive overlapping numbers. That atomicity lives server-side;
//! nothing in this client re-implements it.

use sweepdraw_common::wire::{
    AssignNumbersRequest, AssignNumbersResponse, DrawResultPayload, DrawSummary,
};
use sweepdraw_common::DrawId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("request timed out")]
    Timeout,

    #[error("service unavailable (status {status})")]
    Unavailable { status: u16 },

    #[error("insufficient credits: need {needed}, have {available}")]
    InsufficientCredits { needed: u64, available: u64 },

    #[error("prize for draw {draw_id} already claimed")]
    AlreadyClaimed { draw_id: String },

    #[error("malformed payload: {reason}")]
    Malformed { reason: String },
}

impl BackendError {
    /// Transient infrastructure failures may be recovered by the degraded
    /// local allocation path. Business rejections must never be, since a
    /// fallback would hand out tickets the server refused.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout
                | BackendError::Unavailable { .. }
                | BackendError::Malformed { .. }
        )
    }
}

pub trait AuthoritativeClient {
    /// Allocate `request.quantity` numbers for the caller. The response must
    /// contain exactly that many numbers.
    fn assign_numbers(
        &mut self,
        request: &AssignNumbersRequest,
    ) -> Result<AssignNumbersResponse, BackendError>;

    /// Result of one completed draw, scoped to the calling user.
    fn draw_result(&self, draw_id: &DrawId) -> Result<DrawResultPayload, BackendError>;

    /// The most recent draws, newest first.
    fn recent_draws(&self, limit: usize) -> Result<Vec<DrawSummary>, BackendError>;
}
