#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

use anyhow::anyhow;
use anyhow::Result;
use chrono::Utc;

use super::token;
use super::CredentialStore;
use crate::domain::models::ApiBox;
use crate::domain::models::Identity;
use crate::domain::models::SessionStatus;

/// Owns the authenticated-user state for the lifetime of the process. All
/// screens read from it; only bootstrap, login, and logout write to it.
pub struct SessionManager {
    store: CredentialStore,
    status: SessionStatus,
    credential: Option<String>,
    identity: Option<Identity>,
}

impl Default for SessionManager {
    fn default() -> SessionManager {
        return SessionManager::new(CredentialStore::default());
    }
}

impl SessionManager {
    pub fn new(store: CredentialStore) -> SessionManager {
        return SessionManager {
            store,
            status: SessionStatus::Uninitialized,
            credential: None,
            identity: None,
        };
    }

    pub fn status(&self) -> SessionStatus {
        return self.status;
    }

    pub fn current_user(&self) -> Option<&Identity> {
        return self.identity.as_ref();
    }

    pub fn credential(&self) -> Option<&str> {
        return self.credential.as_deref();
    }

    /// Restores the persisted session, once per process. No network call is
    /// made: the token is only checked structurally for a subject and a
    /// future expiry. Anything that fails the checks clears the whole pair.
    pub async fn bootstrap(&mut self) -> Result<SessionStatus> {
        if self.status != SessionStatus::Uninitialized {
            return Ok(self.status);
        }
        self.status = SessionStatus::Loading;

        let pair = self.store.load().await?;
        let Some((credential, identity)) = pair else {
            self.status = SessionStatus::Anonymous;
            return Ok(self.status);
        };

        let usable = match token::decode(&credential) {
            Ok(claims) => token::is_usable(&claims, Utc::now()),
            Err(err) => {
                tracing::warn!(error = ?err, "stored credential failed to decode");
                false
            }
        };

        if !usable {
            self.store.clear().await?;
            self.status = SessionStatus::Anonymous;
            return Ok(self.status);
        }

        self.credential = Some(credential);
        self.identity = Some(identity);
        self.status = SessionStatus::Authenticated;
        return Ok(self.status);
    }

    /// Exchanges credentials for a bearer token. The token comes from the
    /// response's authorization header, the identity from the body; both are
    /// persisted together. A failed login changes nothing.
    pub async fn login(&mut self, api: &ApiBox, email: &str, password: &str) -> Result<Identity> {
        let res = api
            .login(email, password)
            .await
            .map_err(|err| return anyhow!("Login failed: {err}"))?;

        self.store.save(&res.token, &res.identity).await?;
        self.credential = Some(res.token);
        self.identity = Some(res.identity.clone());
        self.status = SessionStatus::Authenticated;

        tracing::debug!(email = email, "logged in");
        return Ok(res.identity);
    }

    /// Clears the persisted pair and drops the in-memory session. The caller
    /// is expected to return the user to the login entry point afterwards.
    pub async fn logout(&mut self) -> Result<()> {
        self.store.clear().await?;
        self.credential = None;
        self.identity = None;
        self.status = SessionStatus::Anonymous;
        return Ok(());
    }

    /// Implicit expiry: a 401/403 or an unparsable success body from any
    /// authenticated call lands here, whatever screen triggered it.
    pub async fn expire(&mut self) -> Result<()> {
        tracing::warn!("session expired, forcing logout");
        return self.logout().await;
    }
}
