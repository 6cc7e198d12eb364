//! Request-scoped access to the datastore.
//!
//! Every decision gets its own [`Datastore`]: the shared data provider plus
//! the cancellation token of the request. All reads race the token, so a
//! cancelled request stops at its next fetch with [`DomainError::Cancelled`].

use std::sync::Arc;

use permission_sdk::{

    ANONYMOUS_USER_ID, DataProvider, DatastoreError, Id, UserId,

};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::error::DomainError;

/// Organisation wide management level of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum OrganisationLevel {
    #[default]
    None,
    CanManageUsers,
    CanManageOrganisation,
    Superadmin,
}

impl OrganisationLevel {
    fn parse(level: &str) -> Self {
        match level {
            "superadmin" => Self::Superadmin,
            "can_manage_organisation" => Self::CanManageOrganisation,
            "can_manage_users" => Self::CanManageUsers,
            _ => Self::None,
        }
    }
}

/// Datastore facade for one request.
#[derive(Clone)]
pub struct Datastore {
    provider: Arc<dyn DataProvider>,
    cancel: CancellationToken,
}

impl Datastore {
    #[must_use]
    pub fn new(provider: Arc<dyn DataProvider>, cancel: CancellationToken) -> Self {
        Self { provider, cancel }
    }

    async fn fetch(&self, fqfield: &str) -> Result<Option<Value>, DomainError> {
        let keys = [fqfield.to_owned()];
        let values = tokio::select! {
            biased;
            () = self.cancel.cancelled() => return Err(DomainError::Cancelled),
            result = self.provider.get(&keys) => result.map_err(|source| DomainError::Datastore {
                fqfield: fqfield.to_owned(),
                source,
            })?,
        };

        let [value] = <[Option<Value>; 1]>::try_from(values).map_err(|values| {
            DomainError::Datastore {
                fqfield: fqfield.to_owned(),
                source: DatastoreError::Protocol(format!(
                    "expected 1 value, got {}",
                    values.len()
                )),
            }
        })?;

        let value = value.filter(|v| !v.is_null());
        trace!(fqfield, found = value.is_some(), "datastore get");
        Ok(value)
    }

    /// Reads and decodes a field.
    ///
    /// # Errors
    ///
    /// - `DoesNotExist` if the field is absent
    /// - `Decode` if the value has the wrong type
    /// - `Datastore` / `Cancelled` if the read failed
    pub async fn get<T: DeserializeOwned>(&self, fqfield: &str) -> Result<T, DomainError> {
        self.get_opt(fqfield)
            .await?
            .ok_or_else(|| DomainError::DoesNotExist(fqfield.to_owned()))
    }

    /// Reads and decodes a field. An absent field yields `T::default()`.
    ///
    /// # Errors
    ///
    /// - `Decode` if the value has the wrong type
    /// - `Datastore` / `Cancelled` if the read failed
    pub async fn get_if_exist<T: DeserializeOwned + Default>(
        &self,
        fqfield: &str,
    ) -> Result<T, DomainError> {
        Ok(self.get_opt(fqfield).await?.unwrap_or_default())
    }

    /// Reads and decodes a field that may be absent.
    ///
    /// # Errors
    ///
    /// - `Decode` if the value has the wrong type
    /// - `Datastore` / `Cancelled` if the read failed
    pub async fn get_opt<T: DeserializeOwned>(
        &self,
        fqfield: &str,
    ) -> Result<Option<T>, DomainError> {
        self.fetch(fqfield)
            .await?
            .map(|value| {
                serde_json::from_value(value).map_err(|e| DomainError::Decode {
                    fqfield: fqfield.to_owned(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Tells whether a field has a value.
    ///
    /// # Errors
    ///
    /// `Datastore` / `Cancelled` if the read failed.
    pub async fn exists(&self, fqfield: &str) -> Result<bool, DomainError> {
        Ok(self.fetch(fqfield).await?.is_some())
    }

    /// Tells whether the object `fqid` exists.
    ///
    /// # Errors
    ///
    /// `Datastore` / `Cancelled` if the read failed.
    pub async fn model_exists(&self, fqid: &str) -> Result<bool, DomainError> {
        self.exists(&format!("{fqid}/id")).await
    }

    /// The meeting the object `fqid` belongs to.
    ///
    /// # Errors
    ///
    /// - `DoesNotExist` if the object has no meeting
    /// - `Decode` / `Datastore` / `Cancelled` if the read failed
    pub async fn meeting_from_model(&self, fqid: &str) -> Result<Id, DomainError> {
        self.get(&format!("{fqid}/meeting_id")).await
    }

    /// The meeting the object `fqid` belongs to, `None` if it has none.
    ///
    /// # Errors
    ///
    /// `Decode` / `Datastore` / `Cancelled` if the read failed.
    pub async fn meeting_of(&self, fqid: &str) -> Result<Option<Id>, DomainError> {
        self.get_opt(&format!("{fqid}/meeting_id")).await
    }

    /// The committee of a meeting, if it has one.
    ///
    /// # Errors
    ///
    /// `Decode` / `Datastore` / `Cancelled` if the read failed.
    pub async fn committee_id(&self, meeting_id: Id) -> Result<Option<Id>, DomainError> {
        let id: Id = self
            .get_if_exist(&format!("meeting/{meeting_id}/committee_id"))
            .await?;
        Ok((id != 0).then_some(id))
    }

    /// Tells whether the user manages the committee.
    ///
    /// # Errors
    ///
    /// `Decode` / `Datastore` / `Cancelled` if the read failed.
    pub async fn is_manager(&self, user_id: UserId, committee_id: Id) -> Result<bool, DomainError> {
        let managers: Vec<UserId> = self
            .get_if_exist(&format!("committee/{committee_id}/manager_ids"))
            .await?;
        Ok(managers.contains(&user_id))
    }

    /// Tells whether the user is a member of the meeting.
    ///
    /// The anonymous user is a member of every meeting with anonymous access
    /// enabled.
    ///
    /// # Errors
    ///
    /// `Decode` / `Datastore` / `Cancelled` if the read failed.
    pub async fn in_meeting(&self, user_id: UserId, meeting_id: Id) -> Result<bool, DomainError> {
        if user_id == ANONYMOUS_USER_ID {
            return self
                .get_if_exist(&format!("meeting/{meeting_id}/enable_anonymous"))
                .await;
        }

        let members: Vec<UserId> = self
            .get_if_exist(&format!("meeting/{meeting_id}/user_ids"))
            .await?;
        Ok(members.contains(&user_id))
    }

    /// The organisation management level of the user.
    ///
    /// # Errors
    ///
    /// `Decode` / `Datastore` / `Cancelled` if the read failed.
    pub async fn organisation_level(
        &self,
        user_id: UserId,
    ) -> Result<OrganisationLevel, DomainError> {
        if user_id == ANONYMOUS_USER_ID {
            return Ok(OrganisationLevel::None);
        }

        let level: String = self
            .get_if_exist(&format!("user/{user_id}/organisation_management_level"))
            .await?;
        Ok(OrganisationLevel::parse(&level))
    }

    /// Tells whether the user is a superuser.
    ///
    /// # Errors
    ///
    /// `Decode` / `Datastore` / `Cancelled` if the read failed.
    pub async fn is_superuser(&self, user_id: UserId) -> Result<bool, DomainError> {
        Ok(self.organisation_level(user_id).await? == OrganisationLevel::Superadmin)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::testing::{PendingProvider, datastore};
    use serde_json::json;

    #[tokio::test]
    async fn get_distinguishes_absence_from_decode_errors() {
        let ds = datastore(json!({
            "motion/1/title": "budget",
            "motion/1/meeting_id": "one",
        }));

        let title: String = ds.get("motion/1/title").await.unwrap();
        assert_eq!(title, "budget");

        let err = ds.get::<String>("motion/1/text").await.unwrap_err();
        assert!(matches!(err, DomainError::DoesNotExist(ref f) if f == "motion/1/text"));

        let err = ds.meeting_from_model("motion/1").await.unwrap_err();
        assert!(matches!(err, DomainError::Decode { .. }));
    }

    #[tokio::test]
    async fn absent_optional_fields_default() {
        let ds = datastore(json!({"meeting/1/user_ids": null}));

        let members: Vec<UserId> = ds.get_if_exist("meeting/1/user_ids").await.unwrap();
        assert!(members.is_empty());
        assert_eq!(ds.get_opt::<Id>("meeting/1/committee_id").await.unwrap(), None);
        assert_eq!(ds.committee_id(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn model_exists_checks_the_id_field() {
        let ds = datastore(json!({"meeting/1": {"name": "annual"}}));

        assert!(ds.model_exists("meeting/1").await.unwrap());
        assert!(!ds.model_exists("meeting/2").await.unwrap());
    }

    #[tokio::test]
    async fn membership_and_management() {
        let ds = datastore(json!({
            "meeting/1": {"user_ids": [3, 4], "committee_id": 9, "enable_anonymous": true},
            "meeting/2": {"user_ids": [3]},
            "committee/9/manager_ids": [4],
        }));

        assert!(ds.in_meeting(3, 1).await.unwrap());
        assert!(!ds.in_meeting(5, 1).await.unwrap());
        assert!(ds.in_meeting(ANONYMOUS_USER_ID, 1).await.unwrap());
        assert!(!ds.in_meeting(ANONYMOUS_USER_ID, 2).await.unwrap());

        assert_eq!(ds.committee_id(1).await.unwrap(), Some(9));
        assert!(ds.is_manager(4, 9).await.unwrap());
        assert!(!ds.is_manager(3, 9).await.unwrap());
    }

    #[tokio::test]
    async fn organisation_levels() {
        let ds = datastore(json!({
            "user/1/organisation_management_level": "superadmin",
            "user/2/organisation_management_level": "can_manage_users",
            "user/3/organisation_management_level": "something_else",
        }));

        assert!(ds.is_superuser(1).await.unwrap());
        assert!(!ds.is_superuser(2).await.unwrap());
        assert_eq!(
            ds.organisation_level(2).await.unwrap(),
            OrganisationLevel::CanManageUsers
        );
        assert_eq!(ds.organisation_level(3).await.unwrap(), OrganisationLevel::None);
        assert_eq!(ds.organisation_level(4).await.unwrap(), OrganisationLevel::None);
        assert!(!ds.is_superuser(ANONYMOUS_USER_ID).await.unwrap());
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_reads() {
        let cancel = CancellationToken::new();
        let ds = Datastore::new(Arc::new(PendingProvider), cancel.clone());

        let read = tokio::spawn(async move { ds.exists("meeting/1/id").await });
        cancel.cancel();

        let err = read.await.unwrap().unwrap_err();
        assert!(matches!(err, DomainError::Cancelled));
    }
}
