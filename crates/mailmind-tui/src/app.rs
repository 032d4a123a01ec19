//! Application state management for mailmind.
//!
//! `App` owns the session, the navigation history and the API client, and
//! keeps the screen shown in step with the current route.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use mailmind_core::api::{ApiClient, KeepAlive};
use mailmind_core::auth::{Session, UserProfile};
use mailmind_core::config::Config;
use mailmind_core::nav::{History, Navigator, Route};
use mailmind_core::views::{CallbackParams, CallbackView, LoginView};

// ============================================================================
// Constants
// ============================================================================

/// Maximum length accepted for a pasted redirect URL.
const MAX_REDIRECT_INPUT_LENGTH: usize = 8192;

// ============================================================================
// UI State Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ConfirmingQuit,
    Quitting,
}

/// Data shown on the landing screen.
#[derive(Debug, Default)]
pub struct Dashboard {
    pub profile: Option<UserProfile>,
    pub status: Option<Value>,
    pub status_error: Option<String>,
}

/// The screen for the current route.
pub enum Screen {
    Login(LoginView),
    Callback(CallbackView),
    Dashboard(Dashboard),
}

pub struct App {
    pub state: AppState,
    pub screen: Screen,
    pub api_url: String,

    /// Set once the identity provider was opened; the user pastes the
    /// redirect URL back in.
    pub awaiting_redirect: bool,
    pub redirect_input: String,
    pub status_message: Option<String>,

    session: Arc<Session>,
    history: Arc<History>,
    api: ApiClient,
    shown_path: Option<String>,
    _keep_alive: KeepAlive,
}

impl App {
    pub fn new(config: &Config, api_url: String) -> Result<Self> {
        let storage = config.open_storage()?;
        Self::with_session(Arc::new(Session::from_boxed(storage)), api_url)
    }

    pub fn with_session(session: Arc<Session>, api_url: String) -> Result<Self> {
        let history = Arc::new(History::new(Route::Entry));
        let api = ApiClient::new(&api_url, session.clone(), history.clone())
            .context("Failed to create API client")?;
        let keep_alive = KeepAlive::spawn(api.clone());
        let login = LoginView::new(api.clone(), session.clone(), history.clone());

        info!(api_url = %api_url, "Backend configured");

        Ok(Self {
            state: AppState::Normal,
            screen: Screen::Login(login),
            api_url,
            awaiting_redirect: false,
            redirect_input: String::new(),
            status_message: None,
            session,
            history,
            api,
            shown_path: None,
            _keep_alive: keep_alive,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_path(&self) -> String {
        self.history.current_path()
    }

    // =========================================================================
    // Routing
    // =========================================================================

    /// Bring the shown screen in line with the current route, and hand any
    /// external location to the system browser.
    pub async fn sync_route(&mut self) {
        if let Some(url) = self.history.take_external() {
            self.open_external(&url);
        }

        // Entering a screen may navigate again (e.g. sign-in with a stored token)
        loop {
            let path = self.history.current_path();
            if self.shown_path.as_deref() == Some(path.as_str()) {
                break;
            }
            self.shown_path = Some(path.clone());

            if let Screen::Callback(ref mut view) = self.screen {
                view.teardown();
            }
            self.screen = self.enter(&path).await;
        }
    }

    async fn enter(&mut self, path: &str) -> Screen {
        debug!(path, "Entering screen");
        match Route::from_path(path) {
            Some(Route::Callback) => {
                self.awaiting_redirect = false;
                let query = self.history.query().unwrap_or_default();
                let mut view = CallbackView::new(self.session.clone(), self.history.clone());
                view.process(&CallbackParams::from_query(&query));
                Screen::Callback(view)
            }
            Some(Route::Dashboard) if self.session.is_authenticated() => {
                let mut dashboard = Dashboard {
                    profile: self.session.profile(),
                    ..Dashboard::default()
                };
                self.load_status(&mut dashboard).await;
                Screen::Dashboard(dashboard)
            }
            Some(Route::Dashboard) => {
                info!("Not signed in, returning to sign-in");
                self.history.navigate(Route::Entry);
                Screen::Login(self.login_view())
            }
            Some(Route::Entry) | None => {
                let mut view = self.login_view();
                view.activate();
                Screen::Login(view)
            }
        }
    }

    fn login_view(&self) -> LoginView {
        LoginView::new(self.api.clone(), self.session.clone(), self.history.clone())
    }

    fn open_external(&mut self, url: &str) {
        info!("Opening identity provider in browser");
        if let Err(e) = open::that(url) {
            warn!(error = %e, "Failed to open browser");
            self.status_message = Some(format!("Open this URL to sign in: {}", url));
        } else {
            self.status_message = Some("Sign in with Microsoft in your browser".to_string());
        }
        self.awaiting_redirect = true;
        self.redirect_input.clear();
    }

    // =========================================================================
    // Sign-in
    // =========================================================================

    /// The call-to-action on the sign-in screen.
    pub async fn sign_in(&mut self) {
        if let Screen::Login(ref mut view) = self.screen {
            // The failure is kept as the view's alert
            let _ = view.sign_in().await;
        }
    }

    pub fn dismiss_alert(&mut self) {
        if let Screen::Login(ref mut view) = self.screen {
            view.dismiss_alert();
        }
    }

    pub fn paste(&mut self, text: &str) {
        if !self.awaiting_redirect {
            return;
        }
        for c in text.chars().filter(|c| !c.is_control()) {
            self.push_redirect_char(c);
        }
    }

    pub fn push_redirect_char(&mut self, c: char) {
        if self.redirect_input.len() < MAX_REDIRECT_INPUT_LENGTH {
            self.redirect_input.push(c);
        }
    }

    pub fn cancel_redirect(&mut self) {
        self.awaiting_redirect = false;
        self.redirect_input.clear();
        self.status_message = None;
    }

    /// The user came back from the browser with the redirect URL.
    pub fn submit_redirect(&mut self) {
        let input = self.redirect_input.trim().to_string();
        if input.is_empty() {
            return;
        }
        self.arrive(&input);
    }

    /// Treat `location` as the browser returning to the application.
    pub fn arrive(&mut self, location: &str) {
        match self.history.arrive(location) {
            Ok(()) => {
                self.awaiting_redirect = false;
                self.redirect_input.clear();
                self.status_message = None;
            }
            Err(e) => {
                warn!(error = %e, "Rejected redirect location");
                self.status_message = Some(format!("Not a valid URL: {}", e));
            }
        }
    }

    // =========================================================================
    // Callback
    // =========================================================================

    pub fn retry_sign_in(&mut self) {
        if let Screen::Callback(ref mut view) = self.screen {
            view.retry();
        }
    }

    // =========================================================================
    // Dashboard
    // =========================================================================

    async fn load_status(&self, dashboard: &mut Dashboard) {
        match self.api.microsoft_status().await {
            Ok(status) => {
                dashboard.status = Some(status);
                dashboard.status_error = None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch Microsoft status");
                dashboard.status_error = Some(e.to_string());
            }
        }
    }

    pub async fn refresh_status(&mut self) {
        let mut dashboard = match std::mem::replace(&mut self.screen, Screen::Dashboard(Dashboard::default())) {
            Screen::Dashboard(dashboard) => dashboard,
            other => {
                self.screen = other;
                return;
            }
        };
        self.load_status(&mut dashboard).await;
        self.screen = Screen::Dashboard(dashboard);
    }

    /// Sign out on the backend (best effort), then forget the session.
    pub async fn logout(&mut self) {
        if let Err(e) = self.api.logout().await {
            debug!(error = %e, "Backend logout failed");
        }
        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session");
        }
        self.history.navigate(Route::Entry);
        self.status_message = Some("Signed out".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stored_session_lands_on_dashboard() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/microsoft/status")
            .with_status(200)
            .with_body(r#"{"connected":true}"#)
            .create_async()
            .await;

        let session = Arc::new(Session::in_memory());
        session.establish("a.eyJzdWIiOiJ1LTEifQ.b", &UserProfile::with_id("u-1")).unwrap();
        let mut app = App::with_session(session, format!("{}/api", server.url())).unwrap();

        app.sync_route().await;
        assert_eq!(app.current_path(), "/dashboard");
        let Screen::Dashboard(ref dashboard) = app.screen else {
            panic!("expected dashboard");
        };
        assert_eq!(dashboard.profile.as_ref().map(|p| p.id.as_str()), Some("u-1"));
        assert_eq!(dashboard.status.as_ref().map(|s| s["connected"].clone()), Some(Value::Bool(true)));
    }

    #[tokio::test]
    async fn test_rejected_session_returns_to_sign_in() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/microsoft/status")
            .with_status(401)
            .create_async()
            .await;

        let session = Arc::new(Session::in_memory());
        session.establish("expired", &UserProfile::placeholder()).unwrap();
        let mut app = App::with_session(session, format!("{}/api", server.url())).unwrap();

        app.sync_route().await;
        assert_eq!(app.current_path(), "/");
        assert!(matches!(app.screen, Screen::Login(_)));
        assert!(!app.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_pasted_redirect_enters_callback() {
        let server = mockito::Server::new_async().await;
        let mut app =
            App::with_session(Arc::new(Session::in_memory()), format!("{}/api", server.url())).unwrap();
        app.sync_route().await;
        assert!(matches!(app.screen, Screen::Login(_)));

        app.awaiting_redirect = true;
        app.paste("http://localhost:5178/auth/callback?error=access_denied");
        app.submit_redirect();
        app.sync_route().await;

        let Screen::Callback(ref view) = app.screen else {
            panic!("expected callback screen");
        };
        assert!(view.state().message().contains("access_denied"));
        assert!(!app.awaiting_redirect);
    }

    #[tokio::test]
    async fn test_invalid_redirect_keeps_prompt() {
        let server = mockito::Server::new_async().await;
        let mut app =
            App::with_session(Arc::new(Session::in_memory()), format!("{}/api", server.url())).unwrap();
        app.sync_route().await;

        app.awaiting_redirect = true;
        app.paste("http://[broken");
        app.submit_redirect();

        assert!(app.awaiting_redirect);
        assert!(app.status_message.as_deref().is_some_and(|m| m.starts_with("Not a valid URL")));
        assert_eq!(app.current_path(), "/");
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/microsoft/status")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        server
            .mock("POST", "/api/auth/logout")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let session = Arc::new(Session::in_memory());
        session.establish("t.o.k", &UserProfile::placeholder()).unwrap();
        let mut app = App::with_session(session, format!("{}/api", server.url())).unwrap();
        app.sync_route().await;

        app.logout().await;
        app.sync_route().await;

        assert!(!app.session().is_authenticated());
        assert!(matches!(app.screen, Screen::Login(_)));
    }
}
