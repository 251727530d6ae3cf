use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::payload::Payload;

/// Timestamp format used by the login response (`.issued` / `.expires`).
pub const TOKEN_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Bearer token returned by `account/login-api`.
///
/// The engine never refreshes or persists tokens; it only renders a valid
/// one into the `Authorization` header. Expiry is enforced: a token whose
/// `expires` timestamp has passed (or cannot be parsed) is not sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,

    #[serde(rename = ".issued")]
    pub issued: String,

    #[serde(rename = ".expires")]
    pub expires: String,
}

impl AccessToken {
    /// Extract a token from a decoded login response.
    pub fn from_payload(payload: &Payload) -> Option<Self> {
        let value = payload.as_json()?;
        serde_json::from_value(value.clone()).ok()
    }

    /// The parsed expiry instant, if `expires` is well-formed.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.expires, TOKEN_TIMESTAMP_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Whether the token can still be presented to the service.
    pub fn is_valid(&self) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match self.expires_at() {
            Some(expires_at) => Utc::now() < expires_at,
            None => false,
        }
    }

    /// `Bearer <token>` when the token is valid, `None` otherwise.
    pub fn authorization(&self) -> Option<String> {
        if self.is_valid() {
            Some(format!("Bearer {}", self.access_token))
        } else {
            None
        }
    }
}

/// External credential collaborator.
///
/// The engine only ever calls [`TokenStore::get`]; `save` exists for the
/// caller side of the contract (e.g. storing the token a login returned).
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<AccessToken>;
    fn save(&self, token: AccessToken);
}

/// Process-local token store for callers without real persistence, and for
/// tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<AccessToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: RwLock::new(Some(token)),
        }
    }

    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<AccessToken> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn save(&self, token: AccessToken) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn token(expires_at: DateTime<Utc>) -> AccessToken {
        AccessToken {
            access_token: "abc123".to_string(),
            issued: (expires_at - Duration::hours(48))
                .format(TOKEN_TIMESTAMP_FORMAT)
                .to_string(),
            expires: expires_at.format(TOKEN_TIMESTAMP_FORMAT).to_string(),
        }
    }

    #[test]
    fn unexpired_token_is_valid() {
        let token = token(Utc::now() + Duration::hours(1));
        assert!(token.is_valid());
        assert_eq!(token.authorization().as_deref(), Some("Bearer abc123"));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = token(Utc::now() - Duration::hours(1));
        assert!(!token.is_valid());
        assert_eq!(token.authorization(), None);
    }

    #[test]
    fn unparseable_expiry_is_rejected() {
        let token = AccessToken {
            access_token: "abc123".to_string(),
            issued: "yesterday".to_string(),
            expires: "tomorrow".to_string(),
        };
        assert!(!token.is_valid());
    }

    #[test]
    fn token_parses_from_login_payload() {
        let expires = (Utc::now() + Duration::hours(2))
            .format(TOKEN_TIMESTAMP_FORMAT)
            .to_string();
        let payload = Payload::Json(json!({
            "access_token": "tok-1",
            ".issued": "2016-05-01T10:00:00Z",
            ".expires": expires,
        }));

        let token = AccessToken::from_payload(&payload).expect("token fields present");
        assert_eq!(token.access_token, "tok-1");
        assert!(token.is_valid());
    }

    #[test]
    fn payload_without_token_fields_yields_none() {
        let payload = Payload::Json(json!({"Message": "bad credentials"}));
        assert!(AccessToken::from_payload(&payload).is_none());
        assert!(AccessToken::from_payload(&Payload::NoContent).is_none());
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryTokenStore::new();
        assert!(store.get().is_none());

        let token = token(Utc::now() + Duration::hours(1));
        store.save(token.clone());
        assert_eq!(store.get(), Some(token));

        store.clear();
        assert!(store.get().is_none());
    }
}
