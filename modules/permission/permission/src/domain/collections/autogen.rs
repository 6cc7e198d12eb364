//! Actions gated by a single manage permission.

use std::sync::Arc;

use async_trait::async_trait;
use permission_sdk::{ActionName, Id, Payload, UserId};

use crate::domain::checker::Decision;
use crate::domain::error::{DomainError, RegistryError};
use crate::domain::registry::{Connecter, HandlerRegistry, RequestContext, WriteChecker, payload_id};

use self::MeetingSource::{FromModel, FromPayload, IsMeeting};

/// Where the meeting of an action comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingSource {
    /// The payload's `meeting_id`.
    FromPayload,
    /// The object named by the payload's `id`, in the action's collection.
    FromModel,
    /// The payload's `id` is the meeting.
    IsMeeting,
    /// The object of `collection` referenced by the payload field.
    Related {
        field: &'static str,
        collection: &'static str,
    },
}

const fn related(field: &'static str, collection: &'static str) -> MeetingSource {
    MeetingSource::Related { field, collection }
}

const AGENDA_MANAGE: &str = "agenda.can_manage";
const LOS_MANAGE: &str = "agenda.can_manage_list_of_speakers";
const MEDIAFILE_MANAGE: &str = "mediafile.can_manage";
const LOGOS: &str = "meeting.can_manage_logos_and_fonts";
const MOTION_MANAGE: &str = "motion.can_manage";
const MOTION_METADATA: &str = "motion.can_manage_metadata";
const USER_MANAGE: &str = "user.can_manage";

/// Action name, required permission, meeting source.
pub const ACTIONS: &[(&str, &str, MeetingSource)] = &[
    ("agenda_item.assign", AGENDA_MANAGE, FromPayload),
    ("agenda_item.numbering", AGENDA_MANAGE, FromPayload),
    ("agenda_item.sort", AGENDA_MANAGE, FromPayload),
    ("list_of_speakers.delete_all_speakers", LOS_MANAGE, FromModel),
    ("list_of_speakers.re_add_last", LOS_MANAGE, FromModel),
    ("list_of_speakers.update", LOS_MANAGE, FromModel),
    ("mediafile.create_directory", MEDIAFILE_MANAGE, FromPayload),
    ("mediafile.move", MEDIAFILE_MANAGE, FromPayload),
    ("mediafile.upload", MEDIAFILE_MANAGE, FromPayload),
    ("meeting.delete_all_speakers_of_all_lists", LOS_MANAGE, IsMeeting),
    ("meeting.set_font", LOGOS, IsMeeting),
    ("meeting.set_logo", LOGOS, IsMeeting),
    ("meeting.unset_font", LOGOS, IsMeeting),
    ("meeting.unset_logo", LOGOS, IsMeeting),
    ("motion.follow_recommendation", MOTION_METADATA, FromModel),
    ("motion.reset_recommendation", MOTION_METADATA, FromModel),
    ("motion.reset_state", MOTION_METADATA, FromModel),
    ("motion.set_recommendation", MOTION_METADATA, FromModel),
    ("motion.sort", MOTION_METADATA, FromPayload),
    ("motion.update_metadata", MOTION_METADATA, FromModel),
    ("motion_block.create", MOTION_MANAGE, FromPayload),
    ("motion_block.delete", MOTION_MANAGE, FromModel),
    ("motion_block.update", MOTION_MANAGE, FromModel),
    ("motion_category.create", MOTION_MANAGE, FromPayload),
    ("motion_category.delete", MOTION_MANAGE, FromModel),
    ("motion_category.number_motions", MOTION_MANAGE, FromModel),
    ("motion_category.sort", MOTION_MANAGE, FromPayload),
    ("motion_category.sort_motions_in_category", MOTION_MANAGE, FromModel),
    ("motion_category.update", MOTION_MANAGE, FromModel),
    (
        "motion_change_recommendation.create",
        MOTION_MANAGE,
        related("motion_id", "motion"),
    ),
    ("motion_change_recommendation.delete", MOTION_MANAGE, FromModel),
    ("motion_change_recommendation.update", MOTION_MANAGE, FromModel),
    ("motion_comment_section.create", MOTION_MANAGE, FromPayload),
    ("motion_comment_section.delete", MOTION_MANAGE, FromModel),
    ("motion_comment_section.sort", MOTION_MANAGE, FromPayload),
    ("motion_comment_section.update", MOTION_MANAGE, FromModel),
    (
        "motion_state.create",
        MOTION_MANAGE,
        related("workflow_id", "motion_workflow"),
    ),
    ("motion_state.delete", MOTION_MANAGE, FromModel),
    ("motion_state.update", MOTION_MANAGE, FromModel),
    ("motion_statute_paragraph.create", MOTION_MANAGE, FromPayload),
    ("motion_statute_paragraph.delete", MOTION_MANAGE, FromModel),
    ("motion_statute_paragraph.sort", MOTION_MANAGE, FromPayload),
    ("motion_statute_paragraph.update", MOTION_MANAGE, FromModel),
    ("motion_submitter.delete", MOTION_MANAGE, FromModel),
    (
        "motion_submitter.sort",
        MOTION_MANAGE,
        related("motion_id", "motion"),
    ),
    ("motion_workflow.create", MOTION_MANAGE, FromPayload),
    ("motion_workflow.delete", MOTION_MANAGE, FromModel),
    ("motion_workflow.update", MOTION_MANAGE, FromModel),
    ("speaker.end_speech", LOS_MANAGE, FromModel),
    (
        "speaker.sort",
        LOS_MANAGE,
        related("list_of_speakers_id", "list_of_speakers"),
    ),
    ("speaker.speak", LOS_MANAGE, FromModel),
    ("speaker.update", LOS_MANAGE, FromModel),
    ("user.create_temporary", USER_MANAGE, FromPayload),
    ("user.delete_temporary", USER_MANAGE, FromModel),
    ("user.generate_new_password_temporary", USER_MANAGE, FromModel),
    ("user.reset_password_to_default_temporary", USER_MANAGE, FromModel),
    ("user.set_password_temporary", USER_MANAGE, FromModel),
    ("user.update_temporary", USER_MANAGE, FromModel),
];

/// One action of the table.
struct Action {
    name: &'static str,
    collection: String,
    perm: &'static str,
    source: MeetingSource,
}

impl Action {
    /// The meeting of the payload, `None` if the referenced object is missing.
    async fn meeting(
        &self,
        ctx: &RequestContext,
        payload: &Payload,
    ) -> Result<Option<Id>, DomainError> {
        let fqid = match self.source {
            FromPayload | IsMeeting => {
                let field = if self.source == FromPayload { "meeting_id" } else { "id" };
                let meeting_id = payload_id(payload, field)?;
                let exists = ctx.ds.model_exists(&format!("meeting/{meeting_id}")).await?;
                return Ok(exists.then_some(meeting_id));
            }
            FromModel => format!("{}/{}", self.collection, payload_id(payload, "id")?),
            MeetingSource::Related { field, collection } => {
                format!("{collection}/{}", payload_id(payload, field)?)
            }
        };
        ctx.ds.meeting_of(&fqid).await
    }
}

#[async_trait]
impl WriteChecker for Action {
    async fn is_allowed(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        payload: &Payload,
    ) -> Result<Decision, DomainError> {
        match self.meeting(ctx, payload).await? {
            Some(meeting_id) => ctx.ensure(user_id, meeting_id, &[self.perm]).await,
            None => Ok(Decision::deny(format!(
                "{}: referenced object does not exist",
                self.name
            ))),
        }
    }
}

/// Registers every action of [`ACTIONS`].
pub struct Autogen;

impl Connecter for Autogen {
    fn connect(&self, registry: &mut HandlerRegistry) -> Result<(), RegistryError> {
        for &(name, perm, source) in ACTIONS {
            let action: ActionName = name.parse()?;
            registry.register_write(
                name,
                Arc::new(Action {
                    name,
                    collection: action.collection().to_owned(),
                    perm,
                    source,
                }),
            )?;
        }
        Ok(())
    }
}
