//! HTTP surface for the persona chat relay.
//!
//! # Endpoints
//!
//! - `POST   /chat`         - Chat with a persona
//! - `GET    /health`       - Liveness and model readiness
//! - `GET    /sessions`     - Live session count
//! - `DELETE /sessions/:id` - Forget a session

pub mod routes;

pub use routes::{app_router, AppState};
