//! Parley HTTP gateway.
//!
//! A thin axum layer over [`parley_agent::ChatService`].

pub mod error;
pub mod handlers;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState};
