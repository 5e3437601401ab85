use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::session::SessionData;

/// Email/password sign-in input
#[derive(Debug, Clone, Serialize)]
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

/// Refresh/sign-out input
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenInput {
    pub refresh_token: String,
}

/// Session as returned by the auth service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPayload {
    pub access_token: String,
    /// Lifetime in seconds
    #[serde(default)]
    pub access_token_expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
}

impl SessionPayload {
    pub fn into_session_data(self, issued_at: DateTime<Utc>) -> SessionData {
        let mut data = SessionData::new(self.access_token);
        data.refresh_token = self.refresh_token;
        data.access_token_expires_at = self
            .access_token_expires_in
            .map(|secs| issued_at + Duration::seconds(secs));
        data.user = self.user;
        data
    }
}

/// Sign-in response; `session` is absent when a second factor is pending.
#[derive(Debug, Clone, Deserialize)]
pub struct SignInResponse {
    #[serde(default)]
    pub session: Option<SessionPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_converts_expiry_relative_to_issue_time() -> Result<(), serde_json::Error> {
        let body = r#"{"session":{"accessToken":"a","accessTokenExpiresIn":900,"refreshToken":"r","user":{"id":"u1"}}}"#;
        let resp: SignInResponse = serde_json::from_str(body)?;
        let now = Utc::now();
        let data = resp.session.expect("session").into_session_data(now);
        assert_eq!(data.access_token, "a");
        assert_eq!(data.refresh_token.as_deref(), Some("r"));
        assert_eq!(data.access_token_expires_at, Some(now + Duration::seconds(900)));
        assert_eq!(data.user, Some(serde_json::json!({"id": "u1"})));
        Ok(())
    }

    #[test]
    fn pending_mfa_has_no_session() -> Result<(), serde_json::Error> {
        let resp: SignInResponse = serde_json::from_str(r#"{"session":null,"mfa":{"ticket":"t"}}"#)?;
        assert!(resp.session.is_none());
        Ok(())
    }
}
