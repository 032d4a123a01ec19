//! REST API client module for the Email Manager IA backend.
//!
//! This module provides the `ApiClient` every screen talks through. The
//! client attaches the session's bearer credential to outgoing requests,
//! reacts to rejected credentials by clearing the session, and exposes one
//! typed wrapper per backend endpoint. `KeepAlive` pings the backend so an
//! idle instance is not suspended.

pub mod client;
pub mod error;
pub mod keepalive;
pub mod models;

pub use client::ApiClient;
pub use error::ApiError;
pub use keepalive::KeepAlive;
