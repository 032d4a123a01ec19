//! Routes and navigation.
//!
//! The API client and the views never touch the terminal directly; they ask a
//! [`Navigator`] to move. [`History`] is the navigator the TUI renders from.
//! Deferred moves are owned by a [`DeferredNavigation`] handle so that a view
//! going away cancels its pending redirect.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use url::Url;

/// The screens of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `/` - sign-in screen
    Entry,
    /// `/auth/callback` - identity provider return
    Callback,
    /// `/dashboard` - authenticated landing screen
    Dashboard,
}

impl Route {
    pub const fn path(self) -> &'static str {
        match self {
            Route::Entry => "/",
            Route::Callback => "/auth/callback",
            Route::Dashboard => "/dashboard",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        match path.trim_end_matches('/') {
            "" => Some(Route::Entry),
            "/auth/callback" => Some(Route::Callback),
            "/dashboard" => Some(Route::Dashboard),
            _ => None,
        }
    }
}

/// Something that can move the user between screens.
pub trait Navigator: Send + Sync {
    /// Path of the screen currently shown.
    fn current_path(&self) -> String;

    /// In-app navigation to a known route.
    fn navigate(&self, route: Route);

    /// Full navigation, replacing the current page. `location` is either an
    /// in-app path or an absolute URL outside the application.
    fn assign(&self, location: &str);
}

#[derive(Debug)]
struct HistoryState {
    path: String,
    query: Option<String>,
    external: Option<String>,
    #[cfg(test)]
    visits: Vec<String>,
}

/// In-process navigation state: the current path and query, plus any
/// pending navigation to a location outside the application.
#[derive(Debug)]
pub struct History {
    state: Mutex<HistoryState>,
}

impl History {
    pub fn new(route: Route) -> Self {
        Self {
            state: Mutex::new(HistoryState {
                path: route.path().to_string(),
                query: None,
                external: None,
                #[cfg(test)]
                visits: vec![route.path().to_string()],
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HistoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current_route(&self) -> Option<Route> {
        Route::from_path(&self.lock().path)
    }

    /// Query string of the current location, without the leading `?`.
    pub fn query(&self) -> Option<String> {
        self.lock().query.clone()
    }

    /// Every path visited so far, oldest first.
    #[cfg(test)]
    pub(crate) fn visits(&self) -> Vec<String> {
        self.lock().visits.clone()
    }

    /// Take the pending external location, if a full navigation left the app.
    pub fn take_external(&self) -> Option<String> {
        self.lock().external.take()
    }

    /// Arrive at a location from outside, e.g. the browser handing back the
    /// identity provider's redirect. Accepts an absolute URL or a path with
    /// an optional query string.
    pub fn arrive(&self, location: &str) -> Result<(), url::ParseError> {
        let location = location.trim();
        let (path, query) = if location.contains("://") {
            let url = Url::parse(location)?;
            (url.path().to_string(), url.query().map(str::to_string))
        } else {
            match location.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (location.to_string(), None),
            }
        };
        let path = if path.is_empty() { "/".to_string() } else { path };

        info!(path = %path, "Arrived from external location");
        self.visit(path, query);
        Ok(())
    }

    fn visit(&self, path: String, query: Option<String>) {
        let mut state = self.lock();
        #[cfg(test)]
        state.visits.push(path.clone());
        state.path = path;
        state.query = query;
    }
}

impl Navigator for History {
    fn current_path(&self) -> String {
        self.lock().path.clone()
    }

    fn navigate(&self, route: Route) {
        debug!(to = route.path(), "Navigating");
        self.visit(route.path().to_string(), None);
    }

    fn assign(&self, location: &str) {
        if location.starts_with('/') {
            let (path, query) = match location.split_once('?') {
                Some((path, query)) => (path.to_string(), Some(query.to_string())),
                None => (location.to_string(), None),
            };
            debug!(to = %path, "Full navigation");
            self.visit(path, query);
        } else {
            info!("Leaving application for external location");
            self.lock().external = Some(location.to_string());
        }
    }
}

/// A navigation that fires after a delay unless cancelled first.
///
/// Dropping the handle cancels it.
#[derive(Debug)]
pub struct DeferredNavigation {
    handle: JoinHandle<()>,
}

impl DeferredNavigation {
    /// Must be called from within a tokio runtime.
    pub fn schedule(navigator: Arc<dyn Navigator>, route: Route, delay: Duration) -> Self {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            navigator.navigate(route);
        });
        Self { handle }
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_pending(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for DeferredNavigation {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
