//! Personal notes belong to exactly one user.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{ANONYMOUS_USER_ID, FqField, Id, Payload, UserId};

use crate::domain::checker::Decision;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{
    Connecter, HandlerRegistry, ReadChecker, RequestContext, WriteChecker, by_object, grant,
    payload_id,
};

async fn owner(ctx: &RequestContext, note_id: Id) -> Result<Option<UserId>, DomainError> {
    ctx.ds.get_opt(&format!("personal_note/{note_id}/user_id")).await
}

struct Create;

#[async_trait]
impl WriteChecker for Create {
    async fn is_allowed(
        &self,
        _ctx: &RequestContext,
        user_id: UserId,
        _payload: &Payload,
    ) -> Result<Decision, DomainError> {
        Ok(Decision::from_bool(user_id != ANONYMOUS_USER_ID, || {
            "anonymous can not create personal notes".to_owned()
        }))
    }
}

/// `update` and `delete`.
struct Modify;

#[async_trait]
impl WriteChecker for Modify {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let note_id = payload_id(payload, "id")?;
        Ok(match owner(ctx, note_id).await? {
            Some(owner) if owner == user_id => Decision::Allow,
            Some(_) => Decision::deny(format!(
                "personal note {note_id} belongs to a different user"
            )),
            None => Decision::deny(format!("personal note {note_id} does not exist")),
        })
    }
}

pub struct PersonalNote;

#[async_trait]
impl ReadChecker for PersonalNote {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        if user_id == ANONYMOUS_USER_ID {
            return Ok(());
        }

        for (id, fields) in by_object(fqfields) {
            grant(result, fields, owner(ctx, id).await? == Some(user_id));
        }
        Ok(())
    }
}

impl Connecter for PersonalNote {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_write("personal_note.create", Arc::new(Create))?;
        registry.register_write("personal_note.update", Arc::new(Modify))?;
        registry.register_write("personal_note.delete", Arc::new(Modify))?;
        registry.register_read("personal_note", Arc::new(Self))
    }
}
