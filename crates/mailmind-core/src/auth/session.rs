use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::storage::{MemoryStorage, Storage, StorageError};
use super::token;

/// Storage key holding the raw bearer credential
pub const TOKEN_KEY: &str = "token";

/// Storage key holding the serialized display profile
pub const USER_KEY: &str = "user";

const PLACEHOLDER_ID: &str = "microsoft-user";
const PLACEHOLDER_NAME: &str = "Usuario Microsoft";
const PLACEHOLDER_EMAIL: &str = "usuario@microsoft.com";

/// Display-only identity derived on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl UserProfile {
    /// The fixed record used when nothing can be read from the credential.
    pub fn placeholder() -> Self {
        Self::with_id(PLACEHOLDER_ID)
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: PLACEHOLDER_NAME.to_string(),
            email: PLACEHOLDER_EMAIL.to_string(),
        }
    }

    /// Derive a profile from the credential's unverified payload, falling
    /// back to the placeholder when it cannot be decoded.
    pub fn from_token(token: &str) -> Self {
        match token::decode_subject(token) {
            Ok(sub) => Self::with_id(sub),
            Err(e) => {
                warn!(error = %e, "Could not decode token payload, using placeholder profile");
                Self::placeholder()
            }
        }
    }
}

/// The client-side session: the bearer credential and its display profile.
///
/// This is the only reader and writer of the `token` and `user` keys. It is
/// shared as `Arc<Session>` by the API client and the views.
pub struct Session {
    storage: Box<dyn Storage>,
}

impl Session {
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self::from_boxed(Box::new(storage))
    }

    pub fn from_boxed(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    /// A session that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::new(MemoryStorage::new())
    }

    /// The stored bearer credential, if any.
    ///
    /// A storage read failure is logged and treated as logged out.
    pub fn token(&self) -> Option<String> {
        match self.storage.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// The stored display profile. Always `None` without a credential, even
    /// if a stale profile record remains.
    pub fn profile(&self) -> Option<UserProfile> {
        self.token()?;
        let raw = match self.storage.get(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!(error = %e, "Failed to read stored profile");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Stored profile is not valid JSON");
                None
            }
        }
    }

    /// Persist a new credential together with its profile, replacing any
    /// previous session. If the profile cannot be stored the credential is
    /// removed again, so the two are never left half-written.
    pub fn establish(&self, token: &str, profile: &UserProfile) -> Result<(), StorageError> {
        let user = serde_json::to_string(profile)?;
        self.storage.set(TOKEN_KEY, token)?;
        if let Err(e) = self.storage.set(USER_KEY, &user) {
            if let Err(rollback) = self.storage.remove(TOKEN_KEY) {
                warn!(error = %rollback, "Failed to remove token after profile write failed");
            }
            return Err(e);
        }
        debug!(user_id = %profile.id, "Session established");
        Ok(())
    }

    /// Remove both the credential and the profile.
    pub fn clear(&self) -> Result<(), StorageError> {
        let token = self.storage.remove(TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        token.and(user)?;
        debug!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_profile() {
        let profile = UserProfile::placeholder();
        assert_eq!(profile.id, "microsoft-user");
        assert_eq!(profile.name, "Usuario Microsoft");
        assert_eq!(profile.email, "usuario@microsoft.com");
    }

    #[test]
    fn test_profile_from_token() {
        assert_eq!(UserProfile::from_token("a.eyJzdWIiOiJ1LTEifQ.b").id, "u-1");
        assert_eq!(UserProfile::from_token("garbage"), UserProfile::placeholder());
        assert_eq!(UserProfile::from_token("a.%%%.b"), UserProfile::placeholder());
    }

    #[test]
    fn test_profile_serializes_like_the_stored_record() {
        let json = serde_json::to_value(UserProfile::with_id("u-1")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "id": "u-1",
                "name": "Usuario Microsoft",
                "email": "usuario@microsoft.com"
            })
        );
    }

    use std::sync::Arc;

    /// Accepts the credential but refuses to store a profile.
    struct NoProfileStorage(MemoryStorage);

    impl Storage for NoProfileStorage {
        fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == USER_KEY {
                return Err(std::io::Error::other("disk full").into());
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.0.remove(key)
        }
    }

    #[test]
    fn test_establish_and_clear() {
        let storage = Arc::new(MemoryStorage::new());
        let session = Session::new(storage.clone());
        assert!(!session.is_authenticated());
        assert_eq!(session.profile(), None);

        let profile = UserProfile::with_id("u-1");
        session.establish("a.b.c", &profile).unwrap();
        assert_eq!(session.token().as_deref(), Some("a.b.c"));
        assert_eq!(session.profile(), Some(profile));
        assert!(storage.get(USER_KEY).unwrap().is_some());

        session.clear().unwrap();
        assert!(!session.is_authenticated());
        assert_eq!(session.profile(), None);
        assert_eq!(storage.get(TOKEN_KEY).unwrap(), None);
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
    }

    #[test]
    fn test_failed_profile_write_removes_token() {
        let session = Session::new(NoProfileStorage(MemoryStorage::new()));

        let result = session.establish("a.b.c", &UserProfile::with_id("u-1"));
        assert!(matches!(result, Err(StorageError::Io(_))));
        assert!(!session.is_authenticated());
        assert_eq!(session.profile(), None);
    }

    #[test]
    fn test_stale_profile_without_token_is_logged_out() {
        let storage = MemoryStorage::new();
        storage
            .set(USER_KEY, &serde_json::to_string(&UserProfile::placeholder()).unwrap())
            .unwrap();
        let session = Session::new(storage);

        assert!(!session.is_authenticated());
        assert_eq!(session.profile(), None);
    }

    #[test]
    fn test_empty_token_is_logged_out() {
        let storage = MemoryStorage::new();
        storage.set(TOKEN_KEY, "").unwrap();
        let session = Session::new(storage);
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_new_login_overwrites_previous_session() {
        let session = Session::in_memory();
        session.establish("old.token.x", &UserProfile::with_id("old")).unwrap();
        session.establish("new.token.y", &UserProfile::with_id("new")).unwrap();

        assert_eq!(session.token().as_deref(), Some("new.token.y"));
        assert_eq!(session.profile().map(|p| p.id).as_deref(), Some("new"));
    }
}
