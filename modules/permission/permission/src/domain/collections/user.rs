//! Users: creation by organisation managers, and field-level read access
//! derived from the meetings viewer and user share.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{ANONYMOUS_USER_ID, FqField, Id, Payload, UserId};

use crate::domain::checker::Decision;
use crate::domain::datastore::OrganisationLevel;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{
    Connecter, HandlerRegistry, ReadChecker, RequestContext, WriteChecker, by_object,
};

/// Never readable through the service.
const PASSWORD: &str = "password";

/// Fields that need `user.can_see_extra_data`.
const EXTRA_FIELDS: &[&str] = &[
    "email",
    "comment",
    "default_password",
    "is_active",
    "last_email_send",
    "organisation_management_level",
];

/// What a viewer may see of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    None,
    See,
    Extra,
    Manage,
}

impl Level {
    fn allows(self, field: &str) -> bool {
        if field == PASSWORD {
            return false;
        }
        match self {
            Self::None => false,
            Self::See => !EXTRA_FIELDS.contains(&field),
            Self::Extra | Self::Manage => true,
        }
    }
}

/// `user.create` needs an organisation level of at least `can_manage_users`.
struct Create;

#[async_trait]
impl WriteChecker for Create {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        _payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let level = ctx.ds.organisation_level(user_id).await?;
        Ok(Decision::from_bool(level >= OrganisationLevel::CanManageUsers, || {
            format!("user {user_id} can not manage users")
        }))
    }
}

pub struct User;

impl User {
    /// The level the viewer has in one meeting.
    async fn meeting_level(
        ctx: &RequestContext,
        viewer: UserId,
        meeting_id: Id,
    ) -> Result<Level, DomainError> {
        if let Some(committee_id) = ctx.ds.committee_id(meeting_id).await?
            && ctx.ds.is_manager(viewer, committee_id).await?
        {
            return Ok(Level::Manage);
        }
        if !ctx.ds.in_meeting(viewer, meeting_id).await? {
            return Ok(Level::None);
        }

        let perms = ctx.perms(viewer, meeting_id).await?;
        Ok(if perms.has("user.can_manage") {
            Level::Manage
        } else if perms.has("user.can_see_extra_data") {
            Level::Extra
        } else if perms.has("user.can_see") {
            Level::See
        } else {
            Level::None
        })
    }
}

#[async_trait]
impl ReadChecker for User {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        let org_manager =
            ctx.ds.organisation_level(user_id).await? >= OrganisationLevel::CanManageUsers;
        let mut per_meeting: HashMap<Id, Level> = HashMap::new();

        for (id, fields) in by_object(fqfields) {
            let level = if org_manager || (user_id != ANONYMOUS_USER_ID && id == user_id) {
                Level::Manage
            } else {
                let meeting_ids: Vec<Id> = ctx
                    .ds
                    .get_if_exist(&format!("user/{id}/meeting_ids"))
                    .await?;

                let mut level = Level::None;
                for meeting_id in meeting_ids {
                    let in_meeting = match per_meeting.get(&meeting_id) {
                        Some(&known) => known,
                        None => {
                            let known = Self::meeting_level(ctx, user_id, meeting_id).await?;
                            per_meeting.insert(meeting_id, known);
                            known
                        }
                    };
                    level = level.max(in_meeting);
                }
                level
            };

            for fqfield in fields {
                if level.allows(&fqfield.field) {
                    result.insert(fqfield.to_string(), true);
                }
            }
        }
        Ok(())
    }
}

impl Connecter for User {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_write("user.create", Arc::new(Create))?;
        registry.register_read("user", Arc::new(Self))
    }
}
