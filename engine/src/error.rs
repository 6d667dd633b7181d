use sweepdraw_common::DrawId;
use thiserror::Error;

use crate::backend::BackendError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("invalid ticket quantity: {quantity}")]
    InvalidQuantity { quantity: u32 },

    #[error("draw {draw_id} not found")]
    DrawNotFound { draw_id: DrawId },

    #[error("draw {draw_id} is already completed")]
    DrawAlreadyCompleted { draw_id: DrawId },

    #[error("insufficient credits: need {needed}, have {available}")]
    InsufficientCredits { needed: u64, available: u64 },

    #[error("no active tickets for draw {draw_id}")]
    NoActiveTickets { draw_id: DrawId },

    #[error("a result is being presented; reconcile deferred")]
    ResultPresentationActive,

    #[error("malformed backend response: {reason}")]
    MalformedResponse { reason: String },

    #[error("invalid engine config: {reason}")]
    InvalidConfig { reason: String },
}
