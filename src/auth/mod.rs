//! Bearer-token gate in front of the reservation routes.

pub mod introspection;
pub mod middleware;

use std::future::Future;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Token is not active")]
    Inactive,
    #[error("Scope validation failed")]
    MissingScope,
    #[error("Introspect validation failed with status {0}")]
    Rejected(u16),
    #[error("Introspect request call failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Decides whether a bearer credential may call this service.
pub trait TokenVerifier: Clone + Send + Sync + 'static {
    fn verify(&self, token: &str) -> impl Future<Output = Result<bool, AuthError>> + Send;
}

/// Accepts every credential. Used when authentication is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl TokenVerifier for AllowAll {
    async fn verify(&self, _token: &str) -> Result<bool, AuthError> {
        Ok(true)
    }
}
