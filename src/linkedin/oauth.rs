use crate::{
    error::{PostGenError, Result},
    linkedin::LinkedInClient,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::Url;
use serde::Deserialize;
use std::fmt;
use uuid::Uuid;

/// Bearer credential. Lives only in memory and never appears in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// A v4 UUID (122 random bits) as url-safe base64 without padding.
pub fn generate_state() -> String {
    URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes())
}

/// Query parameters LinkedIn appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    pub fn new(code: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            state: Some(state.into()),
            ..Default::default()
        }
    }

    /// Parses the full redirect URL a user pastes back after authorizing.
    pub fn from_redirect_url(redirect: &str) -> Result<Self> {
        let url = Url::parse(redirect.trim())
            .map_err(|e| PostGenError::OAuthError(format!("Invalid redirect URL: {}", e)))?;

        let mut params = CallbackParams::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                "error_description" => params.error_description = Some(value.into_owned()),
                _ => {}
            }
        }
        Ok(params)
    }
}

/// Per-session OAuth bookkeeping. The state value is issued once and reused
/// for every authorization URL of the session until a token is obtained.
#[derive(Debug, Default)]
pub struct OAuthSession {
    state: Option<String>,
    token: Option<AccessToken>,
}

impl OAuthSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: impl Into<String>) -> Self {
        Self {
            state: Some(state.into()),
            token: None,
        }
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn ensure_state(&mut self) -> &str {
        self.state.get_or_insert_with(generate_state)
    }

    pub fn authorization_url(&mut self, client: &LinkedInClient) -> Result<String> {
        let state = self.ensure_state().to_string();
        client.authorization_url(&state)
    }

    /// Fails with `StateMismatch` unless `returned` equals the issued state.
    pub fn verify_state(&self, returned: Option<&str>) -> Result<()> {
        match (self.state.as_deref(), returned) {
            (Some(expected), Some(actual)) if expected == actual => Ok(()),
            _ => Err(PostGenError::StateMismatch),
        }
    }

    /// Handles the redirect: provider errors and state are checked before any
    /// network traffic, then the code is exchanged and the token kept.
    pub async fn complete_authorization(
        &mut self,
        client: &LinkedInClient,
        callback: &CallbackParams,
    ) -> Result<()> {
        if let Some(error) = &callback.error {
            return Err(PostGenError::OAuthError(format!(
                "{}: {}",
                error,
                callback.error_description.as_deref().unwrap_or("authorization denied")
            )));
        }

        if let Err(e) = self.verify_state(callback.state.as_deref()) {
            log::warn!("OAuth state check failed, skipping token exchange");
            return Err(e);
        }

        let code = callback
            .code
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PostGenError::OAuthError("Redirect carried no code".into()))?;

        let token = client.exchange_code(code).await?;
        log::info!("LinkedIn connected");
        self.token = Some(token);
        self.state = None;
        Ok(())
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.token.is_some()
    }

    pub fn disconnect(&mut self) {
        self.token = None;
        self.state = None;
    }
}
