//! WebSocket front door: session state machine, connection driver and the
//! Axum router.

pub mod connection;
pub mod server;
pub mod session;

pub use connection::{handle_ws_connection, CloseReason};
pub use server::{build_router, start, AppState, ServerHandle};
pub use session::{Reply, Session, SessionDispatcher, SessionState};
