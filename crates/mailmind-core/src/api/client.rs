//! API client for communicating with the Email Manager IA REST API.
//!
//! Every request goes through [`ApiClient::execute`], which plays the part of
//! a request/response interceptor pair: the bearer credential is attached on
//! the way out, and a 401 on the way back clears the session and sends the
//! user back to the sign-in screen.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::Session;
use crate::nav::{Navigator, Route};

use super::models::{
    AuthUrlResponse, CodeExchangeRequest, CodeExchangeResponse, EmailQuery, LoginCredentials,
    Urgency,
};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Endpoints that must never carry the bearer credential.
const AUTH_ENDPOINTS: [&str; 2] = ["/microsoft/auth/login", "/microsoft/auth/callback"];

/// How much of a token may appear in debug logs.
const TOKEN_LOG_PREFIX_LEN: usize = 20;

fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(TOKEN_LOG_PREFIX_LEN) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}

/// API client for the Email Manager IA backend.
/// Clone is cheap - reqwest::Client, the session and the navigator are shared.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<Session>,
    navigator: Arc<dyn Navigator>,
}

impl ApiClient {
    /// Create a client for `base_url` (e.g. `http://localhost:5000/api`).
    pub fn new(
        base_url: &str,
        session: Arc<Session>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
            navigator,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn is_auth_endpoint(path: &str) -> bool {
        AUTH_ENDPOINTS.iter().any(|endpoint| path.contains(endpoint))
    }

    /// Attach the stored credential unless `path` is an auth endpoint. A
    /// missing credential is not an error here; the backend decides.
    fn authorize(&self, path: &str, request: RequestBuilder) -> RequestBuilder {
        if Self::is_auth_endpoint(path) {
            debug!(path, "Skipping token for auth endpoint");
            return request;
        }

        match self.session.token() {
            Some(token) => {
                debug!(path, token = %token_prefix(&token), "Adding Authorization header");
                request.bearer_auth(token)
            }
            None => {
                debug!(path, "No stored token, sending unauthenticated");
                request
            }
        }
    }

    /// The backend rejected the credential. Outside the callback screen the
    /// session is dropped and the user is sent back to sign in.
    fn handle_unauthorized(&self) {
        let current = self.navigator.current_path();
        if current.contains(Route::Callback.path()) {
            debug!("Ignoring 401 while a session is being established");
            return;
        }

        if let Err(e) = self.session.clear() {
            warn!(error = %e, "Failed to clear session after 401");
        }

        if current != Route::Entry.path() {
            info!(from = %current, "Credential rejected, returning to sign-in");
            self.navigator.assign(Route::Entry.path());
        }
    }

    async fn execute(&self, path: &str, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = self.authorize(path, request).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            self.handle_unauthorized();
        }

        let body = response.text().await.unwrap_or_default();
        warn!(path, status = %status, "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let text = response.text().await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        Ok(serde_json::from_str(text)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.client.get(self.url(path));
        Self::parse(self.execute(path, request).await?).await
    }

    async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let request = self.client.get(self.url(path)).query(query);
        Self::parse(self.execute(path, request).await?).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = self.client.post(self.url(path)).json(body);
        Self::parse(self.execute(path, request).await?).await
    }

    async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let request = self.client.post(self.url(path));
        Self::parse(self.execute(path, request).await?).await
    }

    // =========================================================================
    // Health
    // =========================================================================

    /// `GET /ping`
    pub async fn ping(&self) -> Result<Value, ApiError> {
        self.get("/ping").await
    }

    // =========================================================================
    // Microsoft sign-in
    // =========================================================================

    /// `GET /microsoft/auth/login` - authorization URL for the identity provider
    pub async fn microsoft_auth_url(&self) -> Result<AuthUrlResponse, ApiError> {
        self.get("/microsoft/auth/login").await
    }

    /// `POST /microsoft/auth/callback` - exchange an authorization code
    pub async fn microsoft_exchange_code(&self, code: &str) -> Result<CodeExchangeResponse, ApiError> {
        self.post("/microsoft/auth/callback", &CodeExchangeRequest { code })
            .await
    }

    /// `GET /microsoft/status`
    pub async fn microsoft_status(&self) -> Result<Value, ApiError> {
        self.get("/microsoft/status").await
    }

    /// `GET /microsoft/profile`
    pub async fn microsoft_profile(&self) -> Result<Value, ApiError> {
        self.get("/microsoft/profile").await
    }

    /// `POST /microsoft/auth/disconnect`
    pub async fn microsoft_disconnect(&self) -> Result<Value, ApiError> {
        self.post_empty("/microsoft/auth/disconnect").await
    }

    /// `GET /microsoft/test-permissions`
    pub async fn microsoft_test_permissions(&self) -> Result<Value, ApiError> {
        self.get("/microsoft/test-permissions").await
    }

    // =========================================================================
    // Backend accounts
    // =========================================================================

    /// `POST /auth/login`
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<Value, ApiError> {
        self.post("/auth/login", credentials).await
    }

    /// `POST /auth/logout`
    pub async fn logout(&self) -> Result<Value, ApiError> {
        self.post_empty("/auth/logout").await
    }

    /// `GET /auth/me`
    pub async fn me(&self) -> Result<Value, ApiError> {
        self.get("/auth/me").await
    }

    // =========================================================================
    // Emails
    // =========================================================================

    /// `GET /emails/accounts`
    pub async fn email_accounts(&self) -> Result<Value, ApiError> {
        self.get("/emails/accounts").await
    }

    /// `POST /emails/connect`
    pub async fn connect_account<B: Serialize + ?Sized>(&self, account: &B) -> Result<Value, ApiError> {
        self.post("/emails/connect", account).await
    }

    /// `GET /emails/` with pagination and filters as query parameters
    pub async fn emails(&self, query: &EmailQuery) -> Result<Value, ApiError> {
        self.get_with_query("/emails/", query).await
    }

    /// `GET /emails/urgency/<bucket>`
    pub async fn emails_by_urgency(&self, urgency: Urgency) -> Result<Value, ApiError> {
        self.get(&format!("/emails/urgency/{}", urgency)).await
    }

    /// `POST /emails/<id>/mark-read`
    pub async fn mark_email_read(&self, email_id: i64) -> Result<Value, ApiError> {
        self.post_empty(&format!("/emails/{}/mark-read", email_id))
            .await
    }

    /// `POST /emails/sync`
    pub async fn sync_emails<B: Serialize + ?Sized>(&self, request: &B) -> Result<Value, ApiError> {
        self.post("/emails/sync", request).await
    }

    /// `POST /emails/sync-status`
    pub async fn sync_email_statuses<B: Serialize + ?Sized>(&self, request: &B) -> Result<Value, ApiError> {
        self.post("/emails/sync-status", request).await
    }

    /// `POST /emails/send`
    pub async fn send_email<B: Serialize + ?Sized>(&self, message: &B) -> Result<Value, ApiError> {
        self.post("/emails/send", message).await
    }

    /// `POST /emails/<id>/reply`
    pub async fn reply_to_email<B: Serialize + ?Sized>(
        &self,
        email_id: i64,
        reply: &B,
    ) -> Result<Value, ApiError> {
        self.post(&format!("/emails/{}/reply", email_id), reply)
            .await
    }

    /// `GET /emails/sent`
    pub async fn sent_emails(&self, query: &EmailQuery) -> Result<Value, ApiError> {
        self.get_with_query("/emails/sent", query).await
    }

    /// `POST /emails/auto-classify`
    pub async fn auto_classify_emails(&self) -> Result<Value, ApiError> {
        self.post_empty("/emails/auto-classify").await
    }

    /// `POST /emails/classify-retry`
    pub async fn retry_classification(&self) -> Result<Value, ApiError> {
        self.post_empty("/emails/classify-retry").await
    }
}
