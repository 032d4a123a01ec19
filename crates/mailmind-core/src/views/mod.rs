//! The sign-in flow, independent of how it is drawn.
//!
//! - `login`: entry screen; skips ahead when a credential is stored, otherwise
//!   hands the user to the identity provider
//! - `callback`: consumes the identity provider's redirect and establishes
//!   the session

pub mod callback;
pub mod login;

pub use callback::{complete_with_code, CallbackParams, CallbackState, CallbackView, CodeExchangeError};
pub use login::{LoginActivation, LoginError, LoginView};
