//! OAuth2 token introspection (RFC 7662) against the identity provider.

use super::{AuthError, TokenVerifier};
use crate::config::OidcConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Scope a token must carry to use this service.
pub const REGISTRY_SCOPE: &str = "org_reg";

const INTROSPECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Subset of the introspection response the service relies on.
#[derive(Debug, Deserialize)]
pub struct IntrospectResponse {
    pub active: bool,
    #[serde(default)]
    pub scope: String,
    pub client_id: Option<String>,
}

impl IntrospectResponse {
    /// Active and granted [`REGISTRY_SCOPE`].
    pub fn authorize(&self) -> Result<(), AuthError> {
        if !self.active {
            return Err(AuthError::Inactive);
        }
        if !self.scope.split_whitespace().any(|s| s == REGISTRY_SCOPE) {
            return Err(AuthError::MissingScope);
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct IntrospectionVerifier {
    client: Client,
    introspect_url: String,
    admin_username: String,
    admin_password: String,
}

impl IntrospectionVerifier {
    pub fn new(cfg: &OidcConfig) -> Result<Self, AuthError> {
        let client = Client::builder().timeout(INTROSPECT_TIMEOUT).build()?;
        Ok(Self {
            client,
            introspect_url: cfg.introspect_url.clone(),
            admin_username: cfg.admin.username.clone(),
            admin_password: cfg.admin.password.clone(),
        })
    }
}

impl TokenVerifier for IntrospectionVerifier {
    async fn verify(&self, token: &str) -> Result<bool, AuthError> {
        let response = self
            .client
            .post(&self.introspect_url)
            .basic_auth(&self.admin_username, Some(&self.admin_password))
            .form(&[("token", token)])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            warn!(status = %response.status(), "introspection endpoint refused request");
            return Err(AuthError::Rejected(response.status().as_u16()));
        }

        let body: IntrospectResponse = response.json().await?;
        debug!(client_id = ?body.client_id, active = body.active, "token introspected");
        body.authorize()?;
        Ok(true)
    }
}
