//! HTTP ingress: router assembly, shared state, request/response shapes.

mod extract;
mod handlers;
mod router;
mod state;

pub use router::build;
pub use state::AppState;
