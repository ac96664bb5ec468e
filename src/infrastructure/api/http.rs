#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use serde_json::Value;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Api;
use crate::domain::models::ApiError;
use crate::domain::models::ApiResult;
use crate::domain::models::Identity;
use crate::domain::models::ListRequest;
use crate::domain::models::LoginResponse;
use crate::domain::models::Page;
use crate::domain::models::Pagination;
use crate::domain::models::PasswordChange;
use crate::domain::models::Profile;
use crate::domain::models::ProfileDraft;
use crate::domain::models::ResourceSpec;
use crate::domain::models::ValidationErrors;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct LoginBody {
    user: Identity,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct ProfileBody {
    user: Profile,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct MessageBody {
    message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
enum WireErrors {
    Messages(Vec<String>),
    Fields(BTreeMap<String, Vec<String>>),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
struct ValidationBody {
    errors: WireErrors,
}

impl From<WireErrors> for ValidationErrors {
    fn from(errors: WireErrors) -> ValidationErrors {
        match errors {
            WireErrors::Messages(messages) => return ValidationErrors::Messages(messages),
            WireErrors::Fields(fields) => return ValidationErrors::Fields(fields),
        }
    }
}

fn wrap_singular(spec: ResourceSpec, draft: Value) -> Value {
    let mut body = serde_json::Map::new();
    body.insert(spec.singular.to_string(), draft);
    return Value::Object(body);
}

fn extract_message(text: &str, status: u16) -> String {
    if let Ok(body) = serde_json::from_str::<MessageBody>(text) {
        if let Some(message) = body.message {
            return message;
        }
    }

    return format!("unexpected status {status}");
}

/// Maps a non-2xx response onto the failure taxonomy: 401/403 expire the
/// session, 422 carries structured validation errors, everything else is a
/// generic request failure with the server's message when it sent one.
async fn failure_from(res: reqwest::Response) -> ApiError {
    let status = res.status().as_u16();
    if status == 401 || status == 403 {
        return ApiError::Unauthorized;
    }

    let text = res.text().await.unwrap_or_default();
    if status == 422 {
        if let Ok(body) = serde_json::from_str::<ValidationBody>(&text) {
            return ApiError::Validation(body.errors.into());
        }
    }

    tracing::error!(status = status, "request failed");
    return ApiError::Request(extract_message(&text, status));
}

pub struct HttpApi {
    url: String,
    timeout: String,
}

impl Default for HttpApi {
    fn default() -> HttpApi {
        return HttpApi {
            url: Config::get(ConfigKey::ApiURL),
            timeout: Config::get(ConfigKey::RequestTimeout),
        };
    }
}

impl HttpApi {
    pub fn new(url: String, timeout: String) -> HttpApi {
        return HttpApi { url, timeout };
    }

    fn endpoint(&self, path: &str) -> String {
        return format!("{url}/api/v1/{path}", url = self.url);
    }

    fn request_timeout(&self) -> ApiResult<Duration> {
        let millis = self
            .timeout
            .parse::<u64>()
            .map_err(|err| return ApiError::Request(err.to_string()))?;
        return Ok(Duration::from_millis(millis));
    }
}

#[async_trait]
impl Api for HttpApi {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let req = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };

        let res = reqwest::Client::new()
            .post(self.endpoint("auth/login"))
            .header("Content-Type", "application/json")
            .timeout(self.request_timeout()?)
            .json(&req)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ApiError::Request(extract_message(&text, status.as_u16())));
        }

        // The bearer credential lives in the authorization response header,
        // never in the body. That location is part of the contract.
        let token = res
            .headers()
            .get("authorization")
            .and_then(|value| return value.to_str().ok())
            .and_then(|value| return value.strip_prefix("Bearer "))
            .map(|value| return value.to_string());

        let Some(token) = token else {
            return Err(ApiError::Request(
                "login response is missing the authorization header".to_string(),
            ));
        };

        let text = res.text().await?;
        let body: LoginBody = serde_json::from_str(&text)
            .map_err(|err| return ApiError::Request(format!("login body did not parse: {err}")))?;

        return Ok(LoginResponse {
            token,
            identity: body.user,
        });
    }

    async fn fetch_profile(&self, token: &str) -> ApiResult<Profile> {
        let res = reqwest::Client::new()
            .get(self.endpoint("profile"))
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.request_timeout()?)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(failure_from(res).await);
        }

        let text = res.text().await?;
        let body: ProfileBody =
            serde_json::from_str(&text).map_err(|_| return ApiError::Unauthorized)?;

        return Ok(body.user);
    }

    async fn update_profile(&self, token: &str, draft: &ProfileDraft) -> ApiResult<()> {
        let res = reqwest::Client::new()
            .patch(self.endpoint("profile"))
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.request_timeout()?)
            .json(&json!({ "user": draft }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(failure_from(res).await);
        }

        return Ok(());
    }

    async fn change_password(&self, token: &str, change: &PasswordChange) -> ApiResult<()> {
        let res = reqwest::Client::new()
            .patch(self.endpoint("profile/update_password"))
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.request_timeout()?)
            .json(change)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(failure_from(res).await);
        }

        return Ok(());
    }

    async fn list(
        &self,
        token: &str,
        spec: ResourceSpec,
        request: &ListRequest,
    ) -> ApiResult<Page<Value>> {
        let res = reqwest::Client::new()
            .get(self.endpoint(spec.path))
            .query(&request.to_query())
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.request_timeout()?)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(failure_from(res).await);
        }

        let text = res.text().await?;
        // A success body that is not JSON means the session is gone and
        // something upstream answered in its place.
        let body: Value = serde_json::from_str(&text).map_err(|_| return ApiError::Unauthorized)?;

        let items = body
            .get(spec.plural)
            .and_then(|value| return value.as_array())
            .cloned()
            .ok_or_else(|| {
                return ApiError::Request(format!(
                    "response is missing the '{}' collection",
                    spec.plural
                ));
            })?;

        let pagination = body
            .get("pagination")
            .cloned()
            .and_then(|value| return serde_json::from_value::<Pagination>(value).ok())
            .ok_or_else(|| return ApiError::Request("response is missing pagination".to_string()))?;

        tracing::debug!(
            entity = spec.plural,
            page = request.page,
            count = items.len(),
            "listed"
        );

        return Ok(Page { items, pagination });
    }

    async fn create(&self, token: &str, spec: ResourceSpec, draft: Value) -> ApiResult<()> {
        let res = reqwest::Client::new()
            .post(self.endpoint(spec.path))
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.request_timeout()?)
            .json(&wrap_singular(spec, draft))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(failure_from(res).await);
        }

        return Ok(());
    }

    async fn update(
        &self,
        token: &str,
        spec: ResourceSpec,
        id: u64,
        draft: Value,
    ) -> ApiResult<()> {
        let res = reqwest::Client::new()
            .patch(self.endpoint(&format!("{path}/{id}", path = spec.path)))
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.request_timeout()?)
            .json(&wrap_singular(spec, draft))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(failure_from(res).await);
        }

        return Ok(());
    }

    async fn delete(&self, token: &str, spec: ResourceSpec, id: u64) -> ApiResult<()> {
        let res = reqwest::Client::new()
            .delete(self.endpoint(&format!("{path}/{id}", path = spec.path)))
            .header("Authorization", format!("Bearer {token}"))
            .timeout(self.request_timeout()?)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(failure_from(res).await);
        }

        return Ok(());
    }
}
