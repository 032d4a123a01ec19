//! Authentication module for managing the client-side session.
//!
//! This module provides:
//! - `Storage`: key-value persistence (file, OS keyring, or in-memory)
//! - `Session`: the single read/write/clear interface over the stored
//!   bearer credential and display profile
//! - `token`: best-effort, unverified decoding of the credential payload
//!
//! Nothing here is a trust decision. The backend enforces authorization;
//! the decoded profile exists only for display.

pub mod credentials;
pub mod session;
pub mod storage;
pub mod token;

pub use credentials::KeyringStorage;
pub use session::{Session, UserProfile, TOKEN_KEY, USER_KEY};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
