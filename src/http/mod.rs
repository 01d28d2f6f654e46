//! HTTP surface of the relay
//!
//! - GET /healthz - Liveness probe for the hosting platform
//! - GET / (WebSocket upgrade) - Stream audio in, receive final transcripts
//!
//! WebSocket upgrades on any other path are accepted as well.

mod handlers;
mod routes;
mod state;

pub use handlers::client_frame;
pub use routes::create_router;
pub use state::AppState;
