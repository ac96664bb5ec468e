#[cfg(test)]
#[path = "profile_test.rs"]
mod tests;

use anyhow::Result;
use tokio::sync::mpsc;

use super::field_errors;
use super::MutationOutcome;
use crate::domain::models::ApiBox;
use crate::domain::models::ApiError;
use crate::domain::models::Event;
use crate::domain::models::Notice;
use crate::domain::models::PasswordChange;
use crate::domain::models::Profile;
use crate::domain::models::ProfileDraft;
use crate::domain::models::PASSWORD_FIELDS;
use crate::domain::models::PROFILE_FIELDS;

/// The signed-in user's own record: one fetch, two write paths. Same error
/// routing as the list screens, minus pagination.
pub struct ProfileService {
    credential: String,
    events: mpsc::UnboundedSender<Event>,
}

impl ProfileService {
    pub fn new(credential: String, events: mpsc::UnboundedSender<Event>) -> ProfileService {
        return ProfileService { credential, events };
    }

    pub async fn fetch(&self, api: &ApiBox) -> Result<Option<Profile>> {
        match api.fetch_profile(&self.credential).await {
            Ok(profile) => return Ok(Some(profile)),
            Err(ApiError::Unauthorized) => {
                self.events.send(Event::SessionExpired)?;
                return Ok(None);
            }
            Err(err) => {
                self.events
                    .send(Event::Notice(Notice::error(format!(
                        "Failed to load profile: {err}"
                    ))))?;
                return Ok(None);
            }
        }
    }

    pub async fn update(&self, api: &ApiBox, draft: &ProfileDraft) -> Result<MutationOutcome> {
        let res = api.update_profile(&self.credential, draft).await;
        return self.conclude(res, "Profile updated", PROFILE_FIELDS);
    }

    pub async fn change_password(
        &self,
        api: &ApiBox,
        change: &PasswordChange,
    ) -> Result<MutationOutcome> {
        let res = api.change_password(&self.credential, change).await;
        return self.conclude(res, "Password updated", PASSWORD_FIELDS);
    }

    fn conclude(
        &self,
        res: Result<(), ApiError>,
        success_message: &str,
        known_fields: &[&str],
    ) -> Result<MutationOutcome> {
        match res {
            Ok(()) => {
                self.events
                    .send(Event::Notice(Notice::success(success_message)))?;
                return Ok(MutationOutcome::Saved);
            }
            Err(ApiError::Validation(errors)) => {
                return Ok(MutationOutcome::Invalid(field_errors::from_server(
                    &errors,
                    known_fields,
                )));
            }
            Err(ApiError::Unauthorized) => {
                self.events.send(Event::SessionExpired)?;
                return Ok(MutationOutcome::Failed);
            }
            Err(err) => {
                self.events
                    .send(Event::Notice(Notice::error(format!("{err}"))))?;
                return Ok(MutationOutcome::Failed);
            }
        }
    }
}
