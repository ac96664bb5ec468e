#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Identity;

/// The persisted credential pair, stored as one document so the token and
/// the user record can never survive without each other.
#[derive(Serialize, Deserialize)]
struct StoredPair {
    token: String,
    user: Identity,
}

pub struct CredentialStore {
    pub file_path: path::PathBuf,
}

impl Default for CredentialStore {
    fn default() -> CredentialStore {
        return CredentialStore {
            file_path: path::PathBuf::from(Config::get(ConfigKey::CredentialsFile)),
        };
    }
}

impl CredentialStore {
    pub fn new(file_path: path::PathBuf) -> CredentialStore {
        return CredentialStore { file_path };
    }

    /// Returns the stored pair, or nothing. A document that is missing,
    /// truncated, or holds an empty token is deleted before returning so no
    /// partial pair stays persisted.
    pub async fn load(&self) -> Result<Option<(String, Identity)>> {
        if !self.file_path.exists() {
            return Ok(None);
        }

        let payload = fs::read_to_string(&self.file_path).await?;
        match serde_json::from_str::<StoredPair>(&payload) {
            Ok(pair) if !pair.token.is_empty() => return Ok(Some((pair.token, pair.user))),
            _ => {
                tracing::warn!(
                    path = ?self.file_path,
                    "stored credentials are incomplete, clearing"
                );
                self.clear().await?;
                return Ok(None);
            }
        }
    }

    pub async fn save(&self, token: &str, user: &Identity) -> Result<()> {
        let payload = serde_json::to_string(&StoredPair {
            token: token.to_string(),
            user: user.clone(),
        })?;

        if let Some(parent) = self.file_path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut file = fs::File::create(&self.file_path).await?;
        file.write_all(payload.as_bytes()).await?;

        return Ok(());
    }

    pub async fn clear(&self) -> Result<()> {
        if !self.file_path.exists() {
            return Ok(());
        }

        fs::remove_file(&self.file_path).await?;
        return Ok(());
    }
}
