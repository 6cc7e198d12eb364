//! Collections with a single fixed rule: read-only meeting collections,
//! meetings, resources and the organisation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{ANONYMOUS_USER_ID, FqField, Id, Payload, UserId};

use crate::domain::checker::Decision;
use crate::domain::datastore::OrganisationLevel;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{
    Connecter, HandlerRegistry, ReadChecker, RequestContext, WriteChecker, by_object, grant,
};

/// Who may read objects of a meeting collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadRule {
    /// Users holding the permission (see [`RequestContext::ensure`]).
    Perm(&'static str),
    /// Every member of the meeting.
    Member,
}

impl ReadRule {
    /// Decides for one meeting.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub async fn check(
        self,
        ctx: &RequestContext,
        user_id: UserId,
        meeting_id: Id,
    ) -> Result<Decision, DomainError> {
        match self {
            Self::Perm(perm) => ctx.ensure(user_id, meeting_id, &[perm]).await,
            Self::Member => {
                let member = ctx.ds.in_meeting(user_id, meeting_id).await?;
                Ok(Decision::from_bool(member, || {
                    format!("user {user_id} is not in meeting {meeting_id}")
                }))
            }
        }
    }

    /// Fills `result` for fields of `collection`: every object is visible
    /// or invisible as a whole. Objects without a meeting are invisible.
    ///
    /// # Errors
    ///
    /// Propagates read failures.
    pub async fn restrict(
        self,
        ctx: &RequestContext,
        collection: &str,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let Some(meeting_id) = ctx.ds.meeting_of(&format!("{collection}/{id}")).await? else {
                continue;
            };
            let decision = self.check(ctx, user_id, meeting_id).await?;
            grant(result, fields, decision.is_allowed());
        }
        Ok(())
    }
}

/// A meeting collection without own write actions.
pub struct ReadOnly {
    collection: &'static str,
    rule: ReadRule,
}

impl ReadOnly {
    #[must_use]
    pub fn new(collection: &'static str, rule: ReadRule) -> Self {
        Self { collection, rule }
    }
}

#[async_trait]
impl ReadChecker for ReadOnly {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        self.rule
            .restrict(ctx, self.collection, user_id, fqfields, result)
            .await
    }
}

/// Read-only collections gated by a rule.
pub struct ReadOnlyCollections(pub Vec<(&'static str, ReadRule)>);

impl Connecter for ReadOnlyCollections {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        for &(collection, rule) in &self.0 {
            registry.register_read(collection, Arc::new(ReadOnly::new(collection, rule)))?;
        }
        Ok(())
    }
}

/// Meetings are visible to their members.
pub struct Meeting;

#[async_trait]
impl ReadChecker for Meeting {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (meeting_id, fields) in by_object(fqfields) {
            let member = ctx.ds.in_meeting(user_id, meeting_id).await?;
            grant(result, fields, member);
        }
        Ok(())
    }
}

impl Connecter for Meeting {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_read("meeting", Arc::new(Self))
    }
}

/// Resources (logos, fonts) are public.
pub struct Resource;

#[async_trait]
impl ReadChecker for Resource {
    async fn restrict(
        &self,
        _ctx: &RequestContext,
        _user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        grant(result, fqfields, true);
        Ok(())
    }
}

impl Connecter for Resource {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_read("resource", Arc::new(Self))
    }
}

/// The organisation: readable when logged in, writable for organisation
/// managers.
pub struct Organisation;

#[async_trait]
impl ReadChecker for Organisation {
    async fn restrict(
        &self,
        _ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        grant(result, fqfields, user_id != ANONYMOUS_USER_ID);
        Ok(())
    }
}

#[async_trait]
impl WriteChecker for Organisation {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        _payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let level = ctx.ds.organisation_level(user_id).await?;
        Ok(Decision::from_bool(
            level >= OrganisationLevel::CanManageOrganisation,
            || format!("user {user_id} can not manage the organisation"),
        ))
    }
}

impl Connecter for Organisation {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_write("organisation.update", Arc::new(Self))?;
        registry.register_read("organisation", Arc::new(Self))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::derivate::PermissionGraph;
    use crate::domain::testing::datastore;
    use serde_json::json;

    fn ctx() -> RequestContext {
        RequestContext::new(
            datastore(json!({
                "meeting/1": {"user_ids": [3, 4]},
                "user/3/group_$1_ids": [5],
                "group/5/permissions": ["motion.can_see"],
                "user/4/group_$1_ids": [6],
                "group/6/permissions": [],
                "motion_state/10/meeting_id": 1,
                "motion_state/11/name": "orphan",
                "user/8/organisation_management_level": "can_manage_organisation",
                "user/9/organisation_management_level": "can_manage_users",
            })),
            Arc::new(PermissionGraph::openslides()),
        )
    }

    fn fields(list: &[&str]) -> Vec<FqField> {
        list.iter().map(|s| s.parse().unwrap()).collect()
    }

    #[tokio::test]
    async fn read_only_collection_follows_its_permission() {
        let ctx = ctx();
        let handler = ReadOnly::new("motion_state", ReadRule::Perm("motion.can_see"));
        let fqfields = fields(&["motion_state/10/name", "motion_state/11/name"]);

        let mut result = HashMap::new();
        handler.restrict(&ctx, 3, &fqfields, &mut result).await.unwrap();
        assert_eq!(result.get("motion_state/10/name"), Some(&true));
        assert_eq!(result.get("motion_state/11/name"), None);

        let mut result = HashMap::new();
        handler.restrict(&ctx, 4, &fqfields, &mut result).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn member_rule_only_needs_membership() {
        let ctx = ctx();
        assert!(ReadRule::Member.check(&ctx, 4, 1).await.unwrap().is_allowed());
        assert!(!ReadRule::Member.check(&ctx, 7, 1).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn meetings_are_visible_to_members() {
        let ctx = ctx();
        let mut result = HashMap::new();
        Meeting
            .restrict(&ctx, 4, &fields(&["meeting/1/name", "meeting/2/name"]), &mut result)
            .await
            .unwrap();
        assert_eq!(result, HashMap::from([("meeting/1/name".to_owned(), true)]));
    }

    #[tokio::test]
    async fn organisation_update_needs_organisation_level() {
        let ctx = ctx();
        let payload = Payload::new();
        assert!(Organisation.is_allowed(&ctx, 8, &payload).await.unwrap().is_allowed());
        assert!(!Organisation.is_allowed(&ctx, 9, &payload).await.unwrap().is_allowed());
        assert!(!Organisation.is_allowed(&ctx, 3, &payload).await.unwrap().is_allowed());
    }

    #[tokio::test]
    async fn organisation_and_resources_read() {
        let ctx = ctx();
        let org = fields(&["organisation/1/name"]);

        let mut result = HashMap::new();
        Organisation.restrict(&ctx, ANONYMOUS_USER_ID, &org, &mut result).await.unwrap();
        assert!(result.is_empty());
        Organisation.restrict(&ctx, 3, &org, &mut result).await.unwrap();
        assert_eq!(result.get("organisation/1/name"), Some(&true));

        let mut result = HashMap::new();
        Resource
            .restrict(&ctx, ANONYMOUS_USER_ID, &fields(&["resource/1/token"]), &mut result)
            .await
            .unwrap();
        assert_eq!(result.get("resource/1/token"), Some(&true));
    }
}
