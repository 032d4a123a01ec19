//! Core library for mailmind, a terminal front-end for the Email Manager IA
//! backend.
//!
//! - `auth`: the persisted session (bearer credential + display profile)
//! - `api`: the shared HTTP client, its typed endpoint wrappers and keep-alive
//! - `nav`: routes and the navigator the client and views drive
//! - `views`: the Microsoft sign-in and callback flows
//! - `config`: backend URL resolution and on-disk configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod nav;
pub mod views;

pub use api::{ApiClient, ApiError, KeepAlive};
pub use auth::{Session, UserProfile};
pub use config::Config;
pub use nav::{History, Navigator, Route};
