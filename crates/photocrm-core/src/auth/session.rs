use serde::{Deserialize, Serialize};

use crate::models::User;

/// Name of the durable record holding the persisted session
pub const AUTH_STORAGE_KEY: &str = "auth-storage";

/// Version written into the persisted record
const RECORD_VERSION: u32 = 0;

/// Authentication state of the client.
///
/// `is_loading` and `error` are UI feedback only and never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Session {
    /// True iff both a user and a non-empty access token are held.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Drop identity, tokens and transient fields.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn to_record(&self) -> PersistedRecord {
        PersistedRecord {
            state: PersistedState {
                user: self.user.clone(),
                access_token: self.access_token.clone(),
                refresh_token: self.refresh_token.clone(),
                is_authenticated: self.is_authenticated(),
            },
            version: RECORD_VERSION,
        }
    }

    pub fn from_record(record: PersistedRecord) -> Self {
        let state = record.state;
        Self {
            user: state.user,
            access_token: state.access_token.filter(|t| !t.is_empty()),
            refresh_token: state.refresh_token.filter(|t| !t.is_empty()),
            is_loading: false,
            error: None,
        }
    }
}

/// Durable snapshot: `{"state": {...}, "version": 0}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub state: PersistedState,
    #[serde(default)]
    pub version: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub is_authenticated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        serde_json::from_str(
            r#"{"id":"u1","email":"a@b.com","firstName":"A","lastName":"B","role":"ADMIN","createdAt":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_is_authenticated_requires_user_and_token() {
        let mut session = Session::default();
        assert!(!session.is_authenticated());

        session.access_token = Some("T1".to_string());
        assert!(!session.is_authenticated());

        session.user = Some(user());
        assert!(session.is_authenticated());

        session.access_token = Some(String::new());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_record_layout() {
        let session = Session {
            user: Some(user()),
            access_token: Some("T1".to_string()),
            refresh_token: Some("R1".to_string()),
            is_loading: true,
            error: Some("transient".to_string()),
        };

        let json = serde_json::to_value(session.to_record()).unwrap();
        assert_eq!(json["version"], 0);
        assert_eq!(json["state"]["accessToken"], "T1");
        assert_eq!(json["state"]["refreshToken"], "R1");
        assert_eq!(json["state"]["isAuthenticated"], true);
        assert_eq!(json["state"]["user"]["id"], "u1");
        assert!(json["state"].get("isLoading").is_none());
        assert!(json["state"].get("error").is_none());
    }

    #[test]
    fn test_from_record_drops_transient_and_empty_tokens() {
        let record: PersistedRecord = serde_json::from_str(
            r#"{"state":{"user":null,"accessToken":"","refreshToken":"R1","isAuthenticated":true}}"#,
        )
        .unwrap();
        let session = Session::from_record(record);
        assert!(session.access_token.is_none());
        assert_eq!(session.refresh_token.as_deref(), Some("R1"));
        // The persisted flag is not trusted; the derived value wins
        assert!(!session.is_authenticated());
    }
}
