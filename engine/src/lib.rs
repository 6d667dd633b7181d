pub mod allocator;
pub mod backend;
pub mod credits;
pub mod error;
pub mod events;
pub mod number_pool;
pub mod query;
pub mod reconciler;
pub mod relay;
pub mod resolver;
pub mod state;

pub use allocator::{request_tickets, RequestTicketsParams};
pub use backend::{AuthoritativeClient, BackendError};
pub use error::EngineError;
pub use reconciler::{dismiss_result, reconcile};
pub use relay::{MemoryRelay, RelayListener, RelayPoll, ResultRelay};
pub use resolver::{
    begin_countdown, pick_winning_number, resolve_draw, resolve_draw_forced, ForceResolveParams,
    ResolveDrawParams,
};
pub use state::{AccountClass, EngineConfig, EngineState, Env};
