//! Generic meeting collection: one permission to read, one to manage.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{FqField, Payload, UserId};

use super::simple::ReadRule;
use crate::domain::checker::Decision;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{
    Connecter, HandlerRegistry, ReadChecker, RequestContext, WriteChecker, payload_id,
};

/// Registers `{c}.create`, `{c}.update`, `{c}.delete` and the read handler
/// of a collection `c`.
#[derive(Debug, Clone)]
pub struct Generic {
    collection: &'static str,
    read: ReadRule,
    manage: &'static str,
    modify_verbs: &'static [&'static str],
}

impl Generic {
    #[must_use]
    pub fn new(collection: &'static str, read: ReadRule, manage: &'static str) -> Self {
        Self {
            collection,
            read,
            manage,
            modify_verbs: &[],
        }
    }

    /// Additional verbs that work like `update`.
    #[must_use]
    pub fn with_modify_verbs(mut self, verbs: &'static [&'static str]) -> Self {
        self.modify_verbs = verbs;
        self
    }

    async fn create(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let meeting_id = payload_id(payload, "meeting_id")?;
        if !ctx.ds.model_exists(&format!("meeting/{meeting_id}")).await? {
            return Ok(Decision::deny(format!("meeting {meeting_id} does not exist")));
        }
        ctx.ensure(user_id, meeting_id, &[self.manage]).await
    }

    async fn modify(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let fqid = format!("{}/{}", self.collection, payload_id(payload, "id")?);
        if !ctx.ds.model_exists(&fqid).await? {
            return Ok(Decision::deny(format!("{fqid} does not exist")));
        }
        let Some(meeting_id) = ctx.ds.meeting_of(&fqid).await? else {
            return Ok(Decision::deny(format!("{fqid} has no meeting")));
        };
        ctx.ensure(user_id, meeting_id, &[self.manage]).await
    }
}

struct Action {
    policy: Arc<Generic>,
    create: bool,
}

#[async_trait]
impl WriteChecker for Action {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        if self.create {
            self.policy.create(ctx, user_id, payload).await
        } else {
            self.policy.modify(ctx, user_id, payload).await
        }
    }
}

#[async_trait]
impl ReadChecker for Generic {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        self.read
            .restrict(ctx, self.collection, user_id, fqfields, result)
            .await
    }
}

impl Connecter for Generic {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        let policy = Arc::new(self.clone());
        let c = self.collection;

        registry.register_write(
            &format!("{c}.create"),
            Arc::new(Action {
                policy: Arc::clone(&policy),
                create: true,
            }),
        )?;
        for verb in ["update", "delete"].iter().chain(self.modify_verbs) {
            registry.register_write(
                &format!("{c}.{verb}"),
                Arc::new(Action {
                    policy: Arc::clone(&policy),
                    create: false,
                }),
            )?;
        }
        registry.register_read(c, policy)
    }
}
