//! Intools daemon library.
//!
//! Exposes config, state, error handling, routes and the WebSocket
//! transport so the binary and the integration tests build the same app.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod query;
pub mod routes;
pub mod state;
pub mod ws;
