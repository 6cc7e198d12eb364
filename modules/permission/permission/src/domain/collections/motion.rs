//! Motions and the collections that hang off them.
//!
//! Writes: managers may do everything. Submitters may edit their own motion
//! while the workflow state allows it. Visibility of a motion depends on the
//! `restrictions` of its current state. Submitters, change recommendations
//! and comments inherit it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{FqField, Id, Payload, UserId};
use tracing::debug;

use crate::domain::checker::Decision;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{
    Connecter, HandlerRegistry, ReadChecker, RequestContext, WriteChecker, by_object, grant,
    payload_id, payload_opt_id,
};

const CAN_MANAGE: &str = "motion.can_manage";
const CAN_MANAGE_METADATA: &str = "motion.can_manage_metadata";
const CAN_SEE: &str = "motion.can_see";
const CAN_CREATE: &str = "motion.can_create";
const CAN_CREATE_AMENDMENTS: &str = "motion.can_create_amendments";

const CREATE_FIELDS: &[&str] = &[
    "title",
    "text",
    "reason",
    "category_id",
    "statute_paragraph_id",
    "workflow_id",
    "meeting_id",
];

const AMENDMENT_FIELDS: &[&str] = &["parent_id", "amendment_paragraphs"];

/// Restriction satisfied by being a submitter of the motion.
const IS_SUBMITTER: &str = "is_submitter";

/// Tells whether `user_id` is one of the motion's submitters.
async fn is_submitter(
    ctx: &RequestContext,
    user_id: UserId,
    motion_id: Id,
) -> Result<bool, DomainError> {
    let submitter_ids: Vec<Id> = ctx
        .ds
        .get_if_exist(&format!("motion/{motion_id}/submitter_ids"))
        .await?;

    for submitter_id in submitter_ids {
        let submitter: Option<UserId> = ctx
            .ds
            .get_opt(&format!("motion_submitter/{submitter_id}/user_id"))
            .await?;
        if submitter == Some(user_id) {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn is_manager(
    ctx: &RequestContext,
    user_id: UserId,
    meeting_id: Id,
) -> Result<bool, DomainError> {
    Ok(ctx
        .ensure(user_id, meeting_id, &[CAN_MANAGE])
        .await?
        .is_allowed())
}

/// Tells whether `user_id` may see the motion.
///
/// # Errors
///
/// Propagates read failures.
pub async fn can_see_motion(
    ctx: &RequestContext,
    user_id: UserId,
    motion_id: Id,
) -> Result<bool, DomainError> {
    let Some(meeting_id) = ctx.ds.meeting_of(&format!("motion/{motion_id}")).await? else {
        return Ok(false);
    };

    if is_manager(ctx, user_id, meeting_id).await? {
        return Ok(true);
    }

    if !ctx.ensure(user_id, meeting_id, &[CAN_SEE]).await?.is_allowed() {
        return Ok(false);
    }

    let state_id: Id = ctx
        .ds
        .get_if_exist(&format!("motion/{motion_id}/state_id"))
        .await?;
    let restrictions: Vec<String> = ctx
        .ds
        .get_if_exist(&format!("motion_state/{state_id}/restrictions"))
        .await?;
    if restrictions.is_empty() {
        return Ok(true);
    }

    let perms = ctx.perms(user_id, meeting_id).await?;
    for restriction in &restrictions {
        let satisfied = if restriction == IS_SUBMITTER {
            is_submitter(ctx, user_id, motion_id).await?
        } else {
            perms.has(restriction)
        };
        if satisfied {
            return Ok(true);
        }
    }

    debug!(motion_id, ?restrictions, "motion hidden by state restrictions");
    Ok(false)
}

struct Create;

#[async_trait]
impl WriteChecker for Create {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let meeting_id = payload_id(payload, "meeting_id")?;
        if !ctx.ds.model_exists(&format!("meeting/{meeting_id}")).await? {
            return Ok(Decision::deny(format!("meeting {meeting_id} does not exist")));
        }

        if is_manager(ctx, user_id, meeting_id).await? {
            return Ok(Decision::Allow);
        }

        let is_amendment = payload_opt_id(payload, "parent_id")?.is_some();
        let perm = if is_amendment {
            CAN_CREATE_AMENDMENTS
        } else {
            CAN_CREATE
        };
        let decision = ctx.ensure(user_id, meeting_id, &[perm]).await?;
        if !decision.is_allowed() {
            return Ok(decision);
        }

        let allowed = |field: &str| {
            CREATE_FIELDS.contains(&field) || (is_amendment && AMENDMENT_FIELDS.contains(&field))
        };
        match payload.keys().find(|field| !allowed(field.as_str())) {
            Some(field) => Ok(Decision::deny(format!(
                "user {user_id} may not set field {field} without {CAN_MANAGE}"
            ))),
            None => Ok(Decision::Allow),
        }
    }
}

/// `update`, `delete` and `set_state`: managers, or submitters while the
/// state allows submitter edits.
struct Modify {
    perm: &'static str,
}

#[async_trait]
impl WriteChecker for Modify {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let motion_id = payload_id(payload, "id")?;
        let Some(meeting_id) = ctx.ds.meeting_of(&format!("motion/{motion_id}")).await? else {
            return Ok(Decision::deny(format!("motion {motion_id} does not exist")));
        };

        let decision = ctx.ensure(user_id, meeting_id, &[self.perm]).await?;
        if decision.is_allowed() {
            return Ok(decision);
        }

        if !is_submitter(ctx, user_id, motion_id).await? {
            return Ok(decision);
        }

        let state_id: Id = ctx
            .ds
            .get_if_exist(&format!("motion/{motion_id}/state_id"))
            .await?;
        let editable: bool = ctx
            .ds
            .get_if_exist(&format!("motion_state/{state_id}/allow_submitter_edit"))
            .await?;
        Ok(Decision::from_bool(editable, || {
            format!("state {state_id} of motion {motion_id} does not allow submitter edits")
        }))
    }
}

/// Motions, by state restrictions.
struct MotionRead;

#[async_trait]
impl ReadChecker for MotionRead {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            grant(result, fields, can_see_motion(ctx, user_id, id).await?);
        }
        Ok(())
    }
}

/// Objects that are visible iff their motion (`{collection}/{id}/motion_id`) is.
struct MotionChild {
    collection: &'static str,
}

#[async_trait]
impl ReadChecker for MotionChild {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let motion_id: Option<Id> = ctx
                .ds
                .get_opt(&format!("{}/{id}/motion_id", self.collection))
                .await?;
            let visible = match motion_id {
                Some(motion_id) => can_see_motion(ctx, user_id, motion_id).await?,
                None => false,
            };
            grant(result, fields, visible);
        }
        Ok(())
    }
}

/// Motion blocks: managers, or viewers for blocks that are not internal.
struct BlockRead;

#[async_trait]
impl ReadChecker for BlockRead {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let fqid = format!("motion_block/{id}");
            let Some(meeting_id) = ctx.ds.meeting_of(&fqid).await? else {
                continue;
            };

            let visible = is_manager(ctx, user_id, meeting_id).await?
                || (ctx.ensure(user_id, meeting_id, &[CAN_SEE]).await?.is_allowed()
                    && !ctx.ds.get_if_exist::<bool>(&format!("{fqid}/internal")).await?);
            grant(result, fields, visible);
        }
        Ok(())
    }
}

/// Change recommendations: managers, or viewers of the motion for
/// recommendations that are not internal.
struct ChangeRecommendationRead;

#[async_trait]
impl ReadChecker for ChangeRecommendationRead {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let fqid = format!("motion_change_recommendation/{id}");
            let Some(meeting_id) = ctx.ds.meeting_of(&fqid).await? else {
                continue;
            };

            if is_manager(ctx, user_id, meeting_id).await? {
                grant(result, fields, true);
                continue;
            }

            let internal: bool = ctx.ds.get_if_exist(&format!("{fqid}/internal")).await?;
            if internal {
                continue;
            }
            let motion_id: Option<Id> = ctx.ds.get_opt(&format!("{fqid}/motion_id")).await?;
            if let Some(motion_id) = motion_id {
                grant(result, fields, can_see_motion(ctx, user_id, motion_id).await?);
            }
        }
        Ok(())
    }
}

/// Tells whether the user is in one of the section's read groups.
async fn in_read_groups(
    ctx: &RequestContext,
    user_id: UserId,
    meeting_id: Id,
    section_id: Id,
) -> Result<bool, DomainError> {
    let read_groups: Vec<Id> = ctx
        .ds
        .get_if_exist(&format!("motion_comment_section/{section_id}/read_group_ids"))
        .await?;
    if read_groups.is_empty() {
        return Ok(false);
    }

    let perms = ctx.perms(user_id, meeting_id).await?;
    Ok(perms.is_admin() || read_groups.iter().any(|g| perms.in_group(*g)))
}

/// Comment sections: managers, or members of a read group that may see the
/// section's motion, if it references one.
struct CommentSectionRead;

#[async_trait]
impl ReadChecker for CommentSectionRead {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let fqid = format!("motion_comment_section/{id}");
            let Some(meeting_id) = ctx.ds.meeting_of(&fqid).await? else {
                continue;
            };

            if is_manager(ctx, user_id, meeting_id).await? {
                grant(result, fields, true);
                continue;
            }

            let motion_id: Option<Id> = ctx.ds.get_opt(&format!("{fqid}/motion_id")).await?;
            if let Some(motion_id) = motion_id
                && !can_see_motion(ctx, user_id, motion_id).await?
            {
                continue;
            }

            grant(
                result,
                fields,
                in_read_groups(ctx, user_id, meeting_id, id).await?,
            );
        }
        Ok(())
    }
}

/// Comments: managers, or viewers of the motion that may read the section.
struct CommentRead;

#[async_trait]
impl ReadChecker for CommentRead {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let fqid = format!("motion_comment/{id}");
            let Some(meeting_id) = ctx.ds.meeting_of(&fqid).await? else {
                continue;
            };

            if is_manager(ctx, user_id, meeting_id).await? {
                grant(result, fields, true);
                continue;
            }

            let motion_id: Option<Id> = ctx.ds.get_opt(&format!("{fqid}/motion_id")).await?;
            let section_id: Option<Id> = ctx.ds.get_opt(&format!("{fqid}/section_id")).await?;
            let (Some(motion_id), Some(section_id)) = (motion_id, section_id) else {
                continue;
            };

            let visible = can_see_motion(ctx, user_id, motion_id).await?
                && in_read_groups(ctx, user_id, meeting_id, section_id).await?;
            grant(result, fields, visible);
        }
        Ok(())
    }
}

/// Registers the motion actions and the read handlers of all motion
/// collections with own rules.
pub struct Motion;

impl Connecter for Motion {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_write("motion.create", Arc::new(Create))?;
        registry.register_write("motion.update", Arc::new(Modify { perm: CAN_MANAGE }))?;
        registry.register_write("motion.delete", Arc::new(Modify { perm: CAN_MANAGE }))?;
        registry.register_write(
            "motion.set_state",
            Arc::new(Modify {
                perm: CAN_MANAGE_METADATA,
            }),
        )?;

        registry.register_read("motion", Arc::new(MotionRead))?;
        registry.register_read(
            "motion_submitter",
            Arc::new(MotionChild {
                collection: "motion_submitter",
            }),
        )?;
        registry.register_read("motion_block", Arc::new(BlockRead))?;
        registry.register_read(
            "motion_change_recommendation",
            Arc::new(ChangeRecommendationRead),
        )?;
        registry.register_read("motion_comment_section", Arc::new(CommentSectionRead))?;
        registry.register_read("motion_comment", Arc::new(CommentRead))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::derivate::PermissionGraph;
    use crate::domain::testing::datastore;
    use serde_json::{Value, json};

    // Users in meeting 1:
    //   2 manager, 3 viewer, 4 creator, 5 submitter of motion 1 (viewer too),
    //   6 viewer with internal access, 7 member without permissions.
    fn fixture() -> Value {
        json!({
            "meeting/1": {"user_ids": [2, 3, 4, 5, 6, 7], "committee_id": 9},
            "committee/9/manager_ids": [],
            "user/2/group_$1_ids": [10],
            "user/3/group_$1_ids": [11],
            "user/4/group_$1_ids": [12],
            "user/5/group_$1_ids": [11],
            "user/6/group_$1_ids": [13],
            "user/7/group_$1_ids": [14],
            "group/10/permissions": ["motion.can_manage"],
            "group/11/permissions": ["motion.can_see"],
            "group/12/permissions": ["motion.can_create"],
            "group/13/permissions": ["motion.can_see_internal"],
            "group/14/permissions": [],
            "motion/1": {"meeting_id": 1, "state_id": 20, "submitter_ids": [30]},
            "motion/2": {"meeting_id": 1, "state_id": 21, "submitter_ids": [31]},
            "motion_submitter/30": {"user_id": 5, "motion_id": 1},
            "motion_submitter/31": {"user_id": 5, "motion_id": 2},
            "motion_state/20": {"restrictions": [], "allow_submitter_edit": false},
            "motion_state/21": {
                "restrictions": ["motion.can_see_internal", "is_submitter"],
                "allow_submitter_edit": true,
            },
            "motion_block/40": {"meeting_id": 1, "internal": true},
            "motion_block/41": {"meeting_id": 1, "internal": false},
            "motion_change_recommendation/50": {"meeting_id": 1, "motion_id": 2, "internal": false},
            "motion_change_recommendation/51": {"meeting_id": 1, "motion_id": 1, "internal": true},
            "motion_comment_section/60": {"meeting_id": 1, "read_group_ids": [13]},
            "motion_comment_section/61": {
                "meeting_id": 1,
                "motion_id": 1,
                "read_group_ids": [11, 14],
            },
            "motion_comment_section/62": {"meeting_id": 1, "motion_id": 2, "read_group_ids": [11]},
            "motion_comment/70": {"meeting_id": 1, "motion_id": 2, "section_id": 60},
        })
    }

    fn registry() -> HandlerRegistry {
        HandlerRegistry::from_connecters([&Motion as &dyn Connecter]).unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(datastore(fixture()), Arc::new(PermissionGraph::openslides()))
    }

    async fn write(name: &str, user_id: UserId, payload: Value) -> bool {
        let payload: Payload = serde_json::from_value(payload).unwrap();
        registry()
            .write_handler(name)
            .unwrap()
            .is_allowed(&ctx(), user_id, &payload)
            .await
            .unwrap()
            .is_allowed()
    }

    async fn visible(user_id: UserId, fqfields: &[&str]) -> Vec<String> {
        let fqfields: Vec<FqField> = fqfields.iter().map(|s| s.parse().unwrap()).collect();
        let registry = registry();
        let mut result = HashMap::new();
        for fields in fqfields.chunk_by(|a, b| a.collection == b.collection) {
            registry
                .read_handler(&fields[0].collection)
                .unwrap()
                .restrict(&ctx(), user_id, fields, &mut result)
                .await
                .unwrap();
        }
        let mut seen: Vec<String> = result
            .into_iter()
            .filter(|(_, v)| *v)
            .map(|(k, _)| k)
            .collect();
        seen.sort();
        seen
    }

    #[tokio::test]
    async fn create_with_manage_allows_any_field() {
        assert!(write("motion.create", 2, json!({"meeting_id": 1, "number": "A1"})).await);
    }

    #[tokio::test]
    async fn create_checks_the_field_allow_list() {
        let plain = json!({"meeting_id": 1, "title": "t", "text": "x"});
        assert!(write("motion.create", 4, plain).await);
        assert!(!write("motion.create", 4, json!({"meeting_id": 1, "number": "A1"})).await);
        assert!(!write("motion.create", 3, json!({"meeting_id": 1, "title": "t"})).await);
    }

    #[tokio::test]
    async fn amendments_need_their_own_permission() {
        let amendment = json!({"meeting_id": 1, "parent_id": 1, "amendment_paragraphs": {}});
        assert!(!write("motion.create", 4, amendment.clone()).await);
        assert!(write("motion.create", 2, amendment).await);
    }

    #[tokio::test]
    async fn submitter_edits_follow_the_state() {
        // motion 1: state forbids submitter edits
        assert!(!write("motion.delete", 5, json!({"id": 1})).await);
        assert!(!write("motion.update", 5, json!({"id": 1})).await);
        // motion 2: state allows them
        assert!(write("motion.update", 5, json!({"id": 2})).await);
        assert!(write("motion.set_state", 5, json!({"id": 2})).await);
        // not a submitter
        assert!(!write("motion.update", 3, json!({"id": 2})).await);
        // manager
        assert!(write("motion.delete", 2, json!({"id": 1})).await);
        // unknown motion
        assert!(!write("motion.delete", 2, json!({"id": 99})).await);
    }

    #[tokio::test]
    async fn motion_visibility_follows_restrictions() {
        let fields = ["motion/1/title", "motion/2/title"];
        assert_eq!(visible(2, &fields).await, ["motion/1/title", "motion/2/title"]);
        assert_eq!(visible(3, &fields).await, ["motion/1/title"]);
        assert_eq!(visible(5, &fields).await, ["motion/1/title", "motion/2/title"]);
        assert_eq!(visible(6, &fields).await, ["motion/1/title", "motion/2/title"]);
        assert!(visible(7, &fields).await.is_empty());
        assert!(visible(99, &fields).await.is_empty());
    }

    #[tokio::test]
    async fn children_inherit_motion_visibility() {
        let fields = ["motion_submitter/30/user_id", "motion_submitter/31/user_id"];
        assert_eq!(visible(3, &fields).await, ["motion_submitter/30/user_id"]);
        assert_eq!(visible(6, &fields).await.len(), 2);
    }

    #[tokio::test]
    async fn internal_blocks_are_for_managers() {
        let fields = ["motion_block/40/title", "motion_block/41/title"];
        assert_eq!(visible(2, &fields).await.len(), 2);
        assert_eq!(visible(3, &fields).await, ["motion_block/41/title"]);
        assert!(visible(7, &fields).await.is_empty());
    }

    #[tokio::test]
    async fn change_recommendations() {
        let fields = [
            "motion_change_recommendation/50/text",
            "motion_change_recommendation/51/text",
        ];
        assert_eq!(visible(2, &fields).await.len(), 2);
        assert!(visible(3, &fields).await.is_empty());
        assert_eq!(
            visible(6, &fields).await,
            ["motion_change_recommendation/50/text"]
        );
    }

    #[tokio::test]
    async fn comments_need_a_read_group() {
        let fields = ["motion_comment/70/comment", "motion_comment_section/60/name"];
        assert_eq!(visible(2, &fields).await.len(), 2);
        assert_eq!(visible(6, &fields).await.len(), 2);
        assert!(visible(3, &fields).await.is_empty());
        assert!(visible(5, &fields).await.is_empty());
    }

    #[tokio::test]
    async fn comment_sections_need_a_visible_motion() {
        let fields = [
            "motion_comment_section/61/name",
            "motion_comment_section/62/name",
        ];
        // read group member without motion.can_see
        assert!(visible(7, &fields).await.is_empty());
        // motion 2 is restricted for plain viewers
        assert_eq!(visible(3, &fields).await, ["motion_comment_section/61/name"]);
        // submitter of motion 2 satisfies its restriction
        assert_eq!(visible(5, &fields).await.len(), 2);
        assert_eq!(visible(2, &fields).await.len(), 2);
    }
}
