use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use super::Identity;
use super::ListRequest;
use super::Page;
use super::PasswordChange;
use super::Profile;
use super::ProfileDraft;
use super::ResourceSpec;

/// Per-field problems as the server reports them: either a flat list of
/// sentences or a field-keyed map.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValidationErrors {
    Messages(Vec<String>),
    Fields(BTreeMap<String, Vec<String>>),
}

/// The three failure classes every authenticated call resolves to.
#[derive(Debug, Error)]
pub enum ApiError {
    /// 401/403, or a success body that does not parse as JSON. Treated as an
    /// implicit session expiry, never retried.
    #[error("the session is no longer valid")]
    Unauthorized,

    /// 422 with structured errors. Recovered inline, never shown as a
    /// generic failure.
    #[error("the server rejected the submitted fields")]
    Validation(ValidationErrors),

    /// Anything else: network failure, unexpected status, malformed error
    /// body.
    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> ApiError {
        return ApiError::Request(err.to_string());
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub identity: Identity,
}

/// Seam to the remote identity/admin API. List and mutation endpoints are
/// addressed through a [`ResourceSpec`] so one implementation serves every
/// entity screen.
#[async_trait]
pub trait Api: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;

    async fn fetch_profile(&self, token: &str) -> ApiResult<Profile>;
    async fn update_profile(&self, token: &str, draft: &ProfileDraft) -> ApiResult<()>;
    async fn change_password(&self, token: &str, change: &PasswordChange) -> ApiResult<()>;

    async fn list(
        &self,
        token: &str,
        spec: ResourceSpec,
        request: &ListRequest,
    ) -> ApiResult<Page<Value>>;
    async fn create(&self, token: &str, spec: ResourceSpec, draft: Value) -> ApiResult<()>;
    async fn update(&self, token: &str, spec: ResourceSpec, id: u64, draft: Value)
        -> ApiResult<()>;
    async fn delete(&self, token: &str, spec: ResourceSpec, id: u64) -> ApiResult<()>;
}

pub type ApiBox = Box<dyn Api>;
