//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the application layer.

mod auth;
pub mod handlers;
mod rate_limit;
mod server;

pub use handlers::AppState;
pub use server::HttpServer;
