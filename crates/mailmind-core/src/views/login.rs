use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::api::{ApiClient, ApiError};
use crate::auth::Session;
use crate::nav::{Navigator, Route};

/// Shown when the authorization URL cannot be obtained.
pub const CONNECT_ERROR_MESSAGE: &str =
    "Could not connect to Microsoft. Please check that the server is running.";

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("{message}", message = CONNECT_ERROR_MESSAGE)]
    AuthUrl(#[source] ApiError),
}

/// What activating the sign-in screen did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginActivation {
    /// A credential was stored; the user was sent to the landing route.
    Redirected,
    /// No credential; the call-to-action should be shown.
    ShowPrompt,
}

/// The sign-in screen.
pub struct LoginView {
    client: ApiClient,
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
    alert: Option<String>,
}

impl LoginView {
    pub fn new(client: ApiClient, session: Arc<Session>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            client,
            session,
            navigator,
            alert: None,
        }
    }

    /// Skip straight to the landing route if a credential is stored. Its
    /// validity is not checked here; a later 401 handles stale credentials.
    pub fn activate(&mut self) -> LoginActivation {
        if self.session.is_authenticated() {
            info!("Token found, redirecting to dashboard");
            self.navigator.navigate(Route::Dashboard);
            LoginActivation::Redirected
        } else {
            LoginActivation::ShowPrompt
        }
    }

    /// Ask the backend for the identity provider's authorization URL and
    /// leave the application for it. On failure the error is kept as a
    /// blocking alert and the screen stays put.
    pub async fn sign_in(&mut self) -> Result<(), LoginError> {
        info!("Requesting Microsoft authorization URL");
        match self.client.microsoft_auth_url().await {
            Ok(response) => {
                self.alert = None;
                self.navigator.assign(&response.auth_url);
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to get authorization URL");
                let err = LoginError::AuthUrl(e);
                self.alert = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// The pending blocking alert, if the last attempt failed.
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::UserProfile;
    use crate::nav::History;
    use mockito::Server;

    fn view_for(url: &str) -> (LoginView, Arc<Session>, Arc<History>) {
        let session = Arc::new(Session::in_memory());
        let history = Arc::new(History::new(Route::Entry));
        let client = ApiClient::new(&format!("{}/api", url), session.clone(), history.clone()).unwrap();
        let view = LoginView::new(client, session.clone(), history.clone());
        (view, session, history)
    }

    #[tokio::test]
    async fn test_activate_with_stored_token_redirects() {
        let server = Server::new_async().await;
        let (mut view, session, history) = view_for(&server.url());
        session.establish("any-token-even-invalid", &UserProfile::placeholder()).unwrap();

        assert_eq!(view.activate(), LoginActivation::Redirected);
        assert_eq!(history.current_route(), Some(Route::Dashboard));
    }

    #[tokio::test]
    async fn test_activate_without_token_shows_prompt() {
        let server = Server::new_async().await;
        let (mut view, _, history) = view_for(&server.url());

        assert_eq!(view.activate(), LoginActivation::ShowPrompt);
        assert_eq!(history.current_route(), Some(Route::Entry));
        assert_eq!(history.visits(), vec!["/"]);
    }

    #[tokio::test]
    async fn test_sign_in_leaves_for_authorization_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/microsoft/auth/login")
            .with_status(200)
            .with_body(r#"{"auth_url":"https://login.microsoftonline.com/common/oauth2/v2.0/authorize?client_id=x"}"#)
            .create_async()
            .await;

        let (mut view, _, history) = view_for(&server.url());
        view.sign_in().await.unwrap();

        assert_eq!(
            history.take_external().as_deref(),
            Some("https://login.microsoftonline.com/common/oauth2/v2.0/authorize?client_id=x")
        );
        assert_eq!(history.current_route(), Some(Route::Entry));
        assert!(view.alert().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sign_in_failure_raises_alert_and_stays() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/microsoft/auth/login")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let (mut view, _, history) = view_for(&server.url());
        let err = view.sign_in().await.unwrap_err();

        assert!(matches!(err, LoginError::AuthUrl(ApiError::ServerError(_))));
        assert_eq!(view.alert(), Some(CONNECT_ERROR_MESSAGE));
        assert_eq!(history.take_external(), None);
        assert_eq!(history.current_route(), Some(Route::Entry));
        mock.assert_async().await;

        view.dismiss_alert();
        assert!(view.alert().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_unreachable_backend() {
        // Nothing listens on the discard port
        let (mut view, _, history) = view_for("http://127.0.0.1:9");
        let err = view.sign_in().await.unwrap_err();

        assert!(matches!(err, LoginError::AuthUrl(ApiError::NetworkError(_))));
        assert!(view.alert().is_some());
        assert_eq!(history.take_external(), None);
    }
}
