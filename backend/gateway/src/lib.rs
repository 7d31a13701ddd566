//! PhotoLens Relay HTTP Server
//!
//! Accepts photos from clients and relays them to a vision provider: one
//! endpoint streams a prose description, the other returns a structured
//! extraction document.

pub mod error;
pub mod health_api;
pub mod photos;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, start_server, GatewayState, MAX_BODY_BYTES};
