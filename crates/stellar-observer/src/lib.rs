//! HTTP API for the Stellar Exchange economy.
//!
//! - **Economy endpoints** (`/api/economy/*`) serve read-only views of
//!   markets, events, fleets and missions. Each response reflects exactly
//!   one completed tick.
//! - **Admin endpoints** (`/api/admin/economy/*`) expose snapshot history
//!   and reset. They answer `403` unless the runtime mode is development.
//!
//! All handlers go through the shared [`stellar_core::TickEngine`]; the
//! API holds no state of its own.

pub mod admin;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
