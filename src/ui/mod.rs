//! Browser chat UI and its JSON/SSE API.

pub mod server;

pub use server::{create_router, run, AppState};
