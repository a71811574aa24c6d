//! LinkedIn integration: OAuth authorization-code flow, upload-then-post
//! publishing, share links and the offline demo connection.

pub mod demo;
pub mod oauth;
pub mod publish;
pub mod share;

use crate::{
    config::LinkedInConfig,
    error::{PostGenError, Result},
    models::{TokenResponse, UserInfo},
};
use reqwest::{Client, Url};

pub use demo::{DemoConnection, DemoEvent};
pub use oauth::{generate_state, AccessToken, CallbackParams, OAuthSession};
pub use share::share_url;

pub const AUTHORIZATION_URL: &str = "https://www.linkedin.com/oauth/v2/authorization";
pub const TOKEN_URL: &str = "https://www.linkedin.com/oauth/v2/accessToken";
pub const API_BASE_URL: &str = "https://api.linkedin.com";

#[derive(Debug, Clone)]
pub struct LinkedInEndpoints {
    pub authorization_url: String,
    pub token_url: String,
    pub api_base: String,
}

impl Default for LinkedInEndpoints {
    fn default() -> Self {
        LinkedInEndpoints {
            authorization_url: AUTHORIZATION_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            api_base: API_BASE_URL.to_string(),
        }
    }
}

impl LinkedInEndpoints {
    /// Points every endpoint at one host, e.g. a local mock server.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        LinkedInEndpoints {
            authorization_url: format!("{}/oauth/v2/authorization", base),
            token_url: format!("{}/oauth/v2/accessToken", base),
            api_base: base.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct LinkedInClient {
    http: Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
    endpoints: LinkedInEndpoints,
}

impl LinkedInClient {
    pub fn new(config: &LinkedInConfig) -> Result<Self> {
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| PostGenError::ConfigError("LinkedIn client id is required".into()))?;
        let client_secret = config.client_secret.clone().ok_or_else(|| {
            PostGenError::ConfigError("LinkedIn client secret is required".into())
        })?;
        let redirect_uri = config.redirect_uri.clone().ok_or_else(|| {
            PostGenError::ConfigError("LinkedIn redirect URI is required".into())
        })?;

        Ok(Self {
            http: Client::new(),
            client_id,
            client_secret,
            redirect_uri,
            scope: config.scope.clone(),
            endpoints: LinkedInEndpoints::default(),
        })
    }

    pub fn with_endpoints(mut self, endpoints: LinkedInEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints.api_base.trim_end_matches('/'), path)
    }

    /// Authorization URL carrying `state`; the caller owns state issuance.
    pub fn authorization_url(&self, state: &str) -> Result<String> {
        let url = Url::parse_with_params(
            &self.endpoints.authorization_url,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("scope", self.scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| PostGenError::ConfigError(format!("Invalid authorization URL: {}", e)))?;
        Ok(url.to_string())
    }

    /// Trades an authorization code for a bearer token. Only call after the
    /// redirect's `state` has been verified.
    pub async fn exchange_code(&self, code: &str) -> Result<AccessToken> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.endpoints.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| PostGenError::RequestError(format!("Token request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PostGenError::from_response("LinkedIn token exchange", response).await);
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PostGenError::ResponseError(e.to_string()))?;

        if let Some(expires_in) = token.expires_in {
            log::debug!("LinkedIn token expires in {}s", expires_in);
        }

        Ok(AccessToken::new(token.access_token))
    }

    pub async fn userinfo(&self, token: &AccessToken) -> Result<UserInfo> {
        let response = self
            .http
            .get(self.api_url("/v2/userinfo"))
            .bearer_auth(token.secret())
            .send()
            .await
            .map_err(|e| PostGenError::RequestError(format!("Userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PostGenError::from_response("LinkedIn userinfo", response).await);
        }

        response
            .json()
            .await
            .map_err(|e| PostGenError::ResponseError(e.to_string()))
    }

    /// `urn:li:person:{sub}` for the token's owner, used as post author.
    pub async fn member_urn(&self, token: &AccessToken) -> Result<String> {
        let info = self.userinfo(token).await?;
        Ok(format!("urn:li:person:{}", info.sub))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LinkedInClient {
        LinkedInClient::new(
            &LinkedInConfig::new()
                .with_credentials("client-123", "shh")
                .with_redirect_uri("http://localhost:8080/auth/linkedin/callback"),
        )
        .unwrap()
    }

    #[test]
    fn test_authorization_url_has_all_parameters() {
        let url = Url::parse(&client().authorization_url("abc123").unwrap()).unwrap();
        assert_eq!(url.host_str(), Some("www.linkedin.com"));

        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["client_id"], "client-123");
        assert_eq!(
            params["redirect_uri"],
            "http://localhost:8080/auth/linkedin/callback"
        );
        assert_eq!(params["scope"], "openid profile email w_member_social");
        assert_eq!(params["state"], "abc123");
    }

    #[test]
    fn test_incomplete_config_rejected() {
        let config = LinkedInConfig::new().with_credentials("id", "secret");
        assert!(matches!(
            LinkedInClient::new(&config),
            Err(PostGenError::ConfigError(_))
        ));
    }

    #[test]
    fn test_endpoints_with_base() {
        let endpoints = LinkedInEndpoints::with_base("http://127.0.0.1:4000/");
        assert_eq!(endpoints.token_url, "http://127.0.0.1:4000/oauth/v2/accessToken");
        assert_eq!(endpoints.api_base, "http://127.0.0.1:4000");
    }
}
