//! `ragline-server` exposes the ragline pipeline over HTTP: one endpoint
//! each for indexing a source, deindexing it, and querying the collection.

pub mod server;

pub use server::{app_router, run_server, AppState, ServerConfig};
