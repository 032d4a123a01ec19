//! Identity provider return handling.
//!
//! The provider sends the user back to `/auth/callback` with either
//! `?token=<bearer>` or `?error=<message>`. [`CallbackView::process`] turns
//! that into a persisted session and schedules the move to the dashboard.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::api::{ApiClient, ApiError};
use crate::auth::{Session, StorageError, UserProfile};
use crate::nav::{DeferredNavigation, Navigator, Route};

/// Delay between showing success and moving to the dashboard.
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

pub const PROCESSING_MESSAGE: &str = "Processing authentication...";
pub const SUCCESS_MESSAGE: &str = "Authentication successful! Redirecting...";
pub const MISSING_TOKEN_MESSAGE: &str = "No authentication token was received";
pub const FAILURE_MESSAGE: &str = "Failed to process authentication";

/// The two query parameters the identity provider's redirect may carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub token: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// Read the parameters from a query string (with or without `?`).
    /// Empty values count as absent; the first occurrence of a key wins.
    pub fn from_query(query: &str) -> Self {
        let query = query.trim().trim_start_matches('?');
        Self::from_pairs(url::form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())))
    }

    /// Read the parameters from a full URL, a path with a query string, or a
    /// bare query string.
    pub fn from_location(location: &str) -> Result<Self, url::ParseError> {
        let location = location.trim();
        if location.contains("://") {
            let url = Url::parse(location)?;
            return Ok(Self::from_pairs(url.query_pairs().into_owned()));
        }
        let query = match location.split_once('?') {
            Some((_, query)) => query,
            None => location,
        };
        Ok(Self::from_query(query))
    }

    fn from_pairs(pairs: impl Iterator<Item = (String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "token" if params.token.is_none() => params.token = Some(value),
                "error" if params.error.is_none() => params.error = Some(value),
                _ => {}
            }
        }
        params
    }
}

/// Callback screen state. `Success` and `Error` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackState {
    Processing,
    Success,
    Error(String),
}

impl CallbackState {
    pub fn message(&self) -> &str {
        match self {
            CallbackState::Processing => PROCESSING_MESSAGE,
            CallbackState::Success => SUCCESS_MESSAGE,
            CallbackState::Error(message) => message,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallbackState::Processing)
    }
}

/// The callback screen.
pub struct CallbackView {
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
    state: CallbackState,
    redirect: Option<DeferredNavigation>,
}

impl CallbackView {
    pub fn new(session: Arc<Session>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            session,
            navigator,
            state: CallbackState::Processing,
            redirect: None,
        }
    }

    pub fn state(&self) -> &CallbackState {
        &self.state
    }

    /// Consume the redirect parameters. Runs once; later calls return the
    /// state reached by the first. Always leaves `Processing`.
    ///
    /// On success the move to the dashboard is scheduled after
    /// [`REDIRECT_DELAY`]; this needs a tokio runtime.
    pub fn process(&mut self, params: &CallbackParams) -> &CallbackState {
        if self.state.is_terminal() {
            debug!("Callback already processed");
            return &self.state;
        }

        self.state = self.resolve(params);
        &self.state
    }

    fn resolve(&mut self, params: &CallbackParams) -> CallbackState {
        if let Some(ref provider_error) = params.error {
            warn!(error = %provider_error, "Identity provider returned an error");
            return CallbackState::Error(format!("Authentication error: {}", provider_error));
        }

        let Some(ref token) = params.token else {
            warn!("Callback reached without a token");
            return CallbackState::Error(MISSING_TOKEN_MESSAGE.to_string());
        };

        let profile = UserProfile::from_token(token);
        if let Err(e) = self.session.establish(token, &profile) {
            error!(error = %e, "Error processing callback");
            return CallbackState::Error(FAILURE_MESSAGE.to_string());
        }

        info!(user_id = %profile.id, "Authentication successful");
        self.redirect = Some(DeferredNavigation::schedule(
            self.navigator.clone(),
            Route::Dashboard,
            REDIRECT_DELAY,
        ));
        CallbackState::Success
    }

    pub fn redirect_pending(&self) -> bool {
        self.redirect.as_ref().is_some_and(DeferredNavigation::is_pending)
    }

    /// "Try again" from the error screen: back to sign-in.
    pub fn retry(&mut self) {
        self.teardown();
        self.navigator.navigate(Route::Entry);
    }

    /// Cancel the pending move to the dashboard, if any.
    pub fn teardown(&mut self) {
        if let Some(redirect) = self.redirect.take() {
            redirect.cancel();
        }
    }
}

#[derive(Error, Debug)]
pub enum CodeExchangeError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to store session: {0}")]
    Storage(#[from] StorageError),
}

/// Complete sign-in through the authorization-code entry point
/// (`POST /microsoft/auth/callback`). If the backend answers with a bearer
/// credential the session is established exactly as in the query-string
/// flow and the resulting profile is returned.
pub async fn complete_with_code(
    client: &ApiClient,
    session: &Session,
    code: &str,
) -> Result<Option<UserProfile>, CodeExchangeError> {
    let response = client.microsoft_exchange_code(code).await?;
    let Some(token) = response.token.filter(|t| !t.is_empty()) else {
        info!("Code exchange completed without issuing a token");
        return Ok(None);
    };

    let profile = UserProfile::from_token(&token);
    session.establish(&token, &profile)?;
    Ok(Some(profile))
}
