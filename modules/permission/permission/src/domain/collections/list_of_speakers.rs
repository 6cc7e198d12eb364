//! Speakers and lists of speakers.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{ANONYMOUS_USER_ID, FqField, Id, Payload, UserId};

use crate::domain::checker::Decision;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{
    Connecter, HandlerRegistry, ReadChecker, RequestContext, WriteChecker, by_object, grant,
    payload_id, payload_opt_id,
};

const CAN_SEE: &str = "agenda.can_see_list_of_speakers";
const CAN_MANAGE: &str = "agenda.can_manage_list_of_speakers";
const CAN_BE_SPEAKER: &str = "agenda.can_be_speaker";

async fn speaker_user(ctx: &RequestContext, speaker_id: Id) -> Result<Option<UserId>, DomainError> {
    ctx.ds.get_opt(&format!("speaker/{speaker_id}/user_id")).await
}

/// `speaker.create`: users may put themselves on a list, managers anybody.
struct CreateSpeaker;

#[async_trait]
impl WriteChecker for CreateSpeaker {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let list_id = payload_id(payload, "list_of_speakers_id")?;
        let Some(meeting_id) = ctx
            .ds
            .meeting_of(&format!("list_of_speakers/{list_id}"))
            .await?
        else {
            return Ok(Decision::deny(format!("list of speakers {list_id} does not exist")));
        };

        let speaker = payload_opt_id(payload, "user_id")?.unwrap_or(user_id);
        if speaker == user_id && user_id != ANONYMOUS_USER_ID {
            ctx.ensure(user_id, meeting_id, &[CAN_BE_SPEAKER, CAN_MANAGE]).await
        } else {
            ctx.ensure(user_id, meeting_id, &[CAN_MANAGE]).await
        }
    }
}

/// `speaker.delete`: the speaker themself or a list manager.
struct DeleteSpeaker;

#[async_trait]
impl WriteChecker for DeleteSpeaker {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        let speaker_id = payload_id(payload, "id")?;
        if speaker_user(ctx, speaker_id).await? == Some(user_id) {
            return Ok(Decision::Allow);
        }

        let Some(meeting_id) = ctx.ds.meeting_of(&format!("speaker/{speaker_id}")).await? else {
            return Ok(Decision::deny(format!("speaker {speaker_id} does not exist")));
        };
        ctx.ensure(user_id, meeting_id, &[CAN_MANAGE]).await
    }
}

/// `list_of_speakers.delete` is only run by the backend itself.
struct DeleteList;

#[async_trait]
impl WriteChecker for DeleteList {
    async fn is_allowed(
        &self,
        _ctx: &RequestContext,
        _user_id: UserId,
        _payload: &Payload,
    ) -> Result<Decision, DomainError> {
        Ok(Decision::deny("list_of_speakers.delete is an internal action"))
    }
}

/// Speakers: the own entry, or everybody who may see lists of speakers.
struct SpeakerRead;

#[async_trait]
impl ReadChecker for SpeakerRead {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let Some(meeting_id) = ctx.ds.meeting_of(&format!("speaker/{id}")).await? else {
                continue;
            };

            let visible = speaker_user(ctx, id).await? == Some(user_id)
                || ctx.ensure(user_id, meeting_id, &[CAN_SEE]).await?.is_allowed();
            grant(result, fields, visible);
        }
        Ok(())
    }
}

/// Lists of speakers: users on the list, or everybody who may see them.
struct ListRead;

impl ListRead {
    async fn is_on_list(
        ctx: &RequestContext,
        user_id: UserId,
        list_id: Id,
    ) -> Result<bool, DomainError> {
        if user_id == ANONYMOUS_USER_ID {
            return Ok(false);
        }

        let speaker_ids: Vec<Id> = ctx
            .ds
            .get_if_exist(&format!("list_of_speakers/{list_id}/speaker_ids"))
            .await?;
        for speaker_id in speaker_ids {
            if speaker_user(ctx, speaker_id).await? == Some(user_id) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[async_trait]
impl ReadChecker for ListRead {
    async fn restrict(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        fqfields: &[FqField],
        result: &mut HashMap<String, bool>,
    ) -> Result<(), DomainError> {
        for (id, fields) in by_object(fqfields) {
            let Some(meeting_id) = ctx
                .ds
                .meeting_of(&format!("list_of_speakers/{id}"))
                .await?
            else {
                continue;
            };

            let visible = Self::is_on_list(ctx, user_id, id).await?
                || ctx.ensure(user_id, meeting_id, &[CAN_SEE]).await?.is_allowed();
            grant(result, fields, visible);
        }
        Ok(())
    }
}

pub struct ListOfSpeakers;

impl Connecter for ListOfSpeakers {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_write("speaker.create", Arc::new(CreateSpeaker))?;
        registry.register_write("speaker.delete", Arc::new(DeleteSpeaker))?;
        registry.register_write("list_of_speakers.delete", Arc::new(DeleteList))?;
        registry.register_read("speaker", Arc::new(SpeakerRead))?;
        registry.register_read("list_of_speakers", Arc::new(ListRead))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::domain::derivate::PermissionGraph;
    use crate::domain::testing::datastore;
    use serde_json::{Value, json};

    fn registry() -> HandlerRegistry {
        HandlerRegistry::from_connecters([&ListOfSpeakers as &dyn Connecter]).unwrap()
    }

    fn ctx() -> RequestContext {
        RequestContext::new(
            datastore(json!({
                "meeting/1": {"user_ids": [2, 3, 4]},
                "user/2/group_$1_ids": [10],
                "user/3/group_$1_ids": [11],
                "user/4/group_$1_ids": [12],
                "group/10/permissions": ["agenda.can_manage_list_of_speakers"],
                "group/11/permissions": ["agenda.can_be_speaker"],
                "group/12/permissions": [],
                "list_of_speakers/5": {"meeting_id": 1, "speaker_ids": [6]},
                "list_of_speakers/7": {"meeting_id": 1, "speaker_ids": []},
                "speaker/6": {"meeting_id": 1, "user_id": 4, "list_of_speakers_id": 5},
                "speaker/8": {"user_id": 4},
            })),
            Arc::new(PermissionGraph::openslides()),
        )
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

    async fn visible(collection: &str, user_id: UserId, fqfields: &[&str]) -> Vec<String> {
        let fqfields: Vec<FqField> = fqfields.iter().map(|s| s.parse().unwrap()).collect();
        let mut result = HashMap::new();
        registry()
            .read_handler(collection)
            .unwrap()
            .restrict(&ctx(), user_id, &fqfields, &mut result)
            .await
            .unwrap();
        let mut seen: Vec<String> = result.into_keys().collect();
        seen.sort();
        seen
    }

    #[tokio::test]
    async fn speakers_delete_themselves() {
        assert!(write("speaker.delete", 4, json!({"id": 6})).await);
        assert!(write("speaker.delete", 2, json!({"id": 6})).await);
        assert!(!write("speaker.delete", 3, json!({"id": 6})).await);
    }

    #[tokio::test]
    async fn speaker_create_self_or_managed() {
        assert!(write("speaker.create", 3, json!({"list_of_speakers_id": 5, "user_id": 3})).await);
        assert!(!write("speaker.create", 3, json!({"list_of_speakers_id": 5, "user_id": 4})).await);
        assert!(write("speaker.create", 2, json!({"list_of_speakers_id": 5, "user_id": 4})).await);
        assert!(!write("speaker.create", 4, json!({"list_of_speakers_id": 5})).await);
        assert!(!write("speaker.create", 2, json!({"list_of_speakers_id": 9, "user_id": 4})).await);
    }

    #[tokio::test]
    async fn list_delete_is_always_denied() {
        assert!(!write("list_of_speakers.delete", 2, json!({"id": 5})).await);
    }

    #[tokio::test]
    async fn speaker_read() {
        let fields = ["speaker/6/user_id", "speaker/8/user_id"];
        // own entry; speaker 8 has no meeting
        assert_eq!(visible("speaker", 4, &fields).await, ["speaker/6/user_id"]);
        // can_manage implies can_see
        assert_eq!(visible("speaker", 2, &fields).await, ["speaker/6/user_id"]);
        assert!(visible("speaker", 3, &fields).await.is_empty());
    }

    #[tokio::test]
    async fn list_read() {
        let fields = ["list_of_speakers/5/id", "list_of_speakers/7/id"];
        assert_eq!(visible("list_of_speakers", 4, &fields).await, ["list_of_speakers/5/id"]);
        assert_eq!(visible("list_of_speakers", 2, &fields).await.len(), 2);
        assert!(visible("list_of_speakers", 3, &fields).await.is_empty());
    }
}
