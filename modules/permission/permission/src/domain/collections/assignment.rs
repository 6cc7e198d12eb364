//! Candidates of an election.

use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{Id, Payload, UserId};

use super::simple::{ReadOnly, ReadRule};
use crate::domain::checker::Decision;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{
    Connecter, HandlerRegistry, RequestContext, WriteChecker, payload_id, payload_opt_id,
};

const CAN_SEE: &str = "assignment.can_see";
const CAN_MANAGE: &str = "assignment.can_manage";
const NOMINATE_SELF: &str = "assignment.can_nominate_self";
const NOMINATE_OTHER: &str = "assignment.can_nominate_other";

fn nominate_perm(candidate: UserId, user_id: UserId) -> &'static str {
    if candidate == user_id {
        NOMINATE_SELF
    } else {
        NOMINATE_OTHER
    }
}

/// The meeting of the payload's `assignment_id`, `None` if it does not exist.
async fn assignment_meeting(
    ctx: &RequestContext,
    payload: &Payload,
) -> Result<Option<Id>, DomainError> {
    let assignment_id = payload_id(payload, "assignment_id")?;
    ctx.ds.meeting_of(&format!("assignment/{assignment_id}")).await
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
        let Some(meeting_id) = assignment_meeting(ctx, payload).await? else {
            return Ok(Decision::deny("assignment does not exist"));
        };
        let candidate = payload_opt_id(payload, "user_id")?.unwrap_or(user_id);
        ctx.ensure(user_id, meeting_id, &[nominate_perm(candidate, user_id)]).await
    }
}

struct Delete;

#[async_trait]
impl WriteChecker for Delete {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let fqid = format!("assignment_candidate/{}", payload_id(payload, "id")?);
        let Some(meeting_id) = ctx.ds.meeting_of(&fqid).await? else {
            return Ok(Decision::deny(format!("{fqid} does not exist")));
        };
        let candidate: Option<UserId> = ctx.ds.get_opt(&format!("{fqid}/user_id")).await?;
        let perm = match candidate {
            Some(candidate) => nominate_perm(candidate, user_id),
            None => NOMINATE_OTHER,
        };
        ctx.ensure(user_id, meeting_id, &[perm]).await
    }
}

struct Sort;

#[async_trait]
impl WriteChecker for Sort {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        match assignment_meeting(ctx, payload).await? {
            Some(meeting_id) => ctx.ensure(user_id, meeting_id, &[CAN_MANAGE]).await,
            None => Ok(Decision::deny("assignment does not exist")),
        }
    }
}

pub struct AssignmentCandidate;

impl Connecter for AssignmentCandidate {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_write("assignment_candidate.create", Arc::new(Create))?;
        registry.register_write("assignment_candidate.delete", Arc::new(Delete))?;
        registry.register_write("assignment_candidate.sort", Arc::new(Sort))?;
        registry.register_read(
            "assignment_candidate",
            Arc::new(ReadOnly::new("assignment_candidate", ReadRule::Perm(CAN_SEE))),
        )
    }
}
