//! Authenticated user identity and its resolution callback.

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque user identifier. This is the only part of a user kept in the session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The user record exposed to handlers and views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebUser {
    pub id: UserId,
    pub full_name: String,
    pub username: String,
}

/// Failure reported by the application's user-resolution callback.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("user {0} not found")]
    NotFound(UserId),
    #[error("user lookup failed: {0}")]
    Failed(String),
}

type LookupFn = dyn Fn(UserId) -> BoxFuture<'static, Result<WebUser, LookupError>> + Send + Sync;

/// Application callback turning a bound identifier back into a full user.
pub struct UserResolver {
    lookup: Box<LookupFn>,
}

impl UserResolver {
    pub fn new<F, Fut>(lookup: F) -> Self
    where
        F: Fn(UserId) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<WebUser, LookupError>> + Send + 'static,
    {
        Self {
            lookup: Box::new(move |id| Box::pin(lookup(id))),
        }
    }

    pub async fn resolve(&self, id: UserId) -> Result<WebUser, LookupError> {
        (self.lookup)(id).await
    }
}

impl fmt::Debug for UserResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UserResolver")
    }
}
