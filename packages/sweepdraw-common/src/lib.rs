pub mod types;
pub mod wire;

pub use types::{
    derive_draw_id, round_version, Draw, DrawId, DrawStatus, ExtractionResult, MissedExtraction,
    Ticket, TicketAssignment, TicketSource,
};
