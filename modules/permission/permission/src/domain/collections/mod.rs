//! Object policies, one module per family of collections.

pub mod assignment;
pub mod autogen;
pub mod generic;
pub mod list_of_speakers;
pub mod motion;
pub mod personal_note;
pub mod simple;
pub mod user;

use self::assignment::AssignmentCandidate;
use self::autogen::Autogen;
use self::generic::Generic;
use self::list_of_speakers::ListOfSpeakers;
use self::motion::Motion;
use self::personal_note::PersonalNote;
use self::simple::{Meeting, Organisation, ReadOnlyCollections, ReadRule, Resource};
use self::user::User;
use super::error::RegistryError;
use super::registry::{Connecter, HandlerRegistry};

/// The policies of a stock installation.
#[must_use]
pub fn default_connecters() -> Vec<Box<dyn Connecter>> {
    let motion_see = ReadRule::Perm("motion.can_see");
    vec![
        Box::new(Generic::new(
            "topic",
            ReadRule::Perm("agenda.can_see"),
            "agenda.can_manage",
        )),
        Box::new(Generic::new(
            "agenda_item",
            ReadRule::Perm("agenda.can_see"),
            "agenda.can_manage",
        )),
        Box::new(Generic::new(
            "assignment",
            ReadRule::Perm("assignment.can_see"),
            "assignment.can_manage",
        )),
        Box::new(Generic::new(
            "mediafile",
            ReadRule::Perm("mediafile.can_see"),
            "mediafile.can_manage",
        )),
        Box::new(Generic::new("tag", ReadRule::Member, "tag.can_manage")),
        Box::new(
            Generic::new("group", ReadRule::Perm("user.can_see"), "user.can_manage")
                .with_modify_verbs(&["set_permission"]),
        ),
        Box::new(ReadOnlyCollections(vec![
            ("motion_category", motion_see),
            ("motion_state", motion_see),
            ("motion_statute_paragraph", motion_see),
            ("motion_workflow", motion_see),
        ])),
        Box::new(Meeting),
        Box::new(Resource),
        Box::new(Organisation),
        Box::new(Autogen),
        Box::new(Motion),
        Box::new(ListOfSpeakers),
        Box::new(PersonalNote),
        Box::new(User),
        Box::new(AssignmentCandidate),
    ]
}

/// Registry with every stock policy.
///
/// # Errors
///
/// Returns [`RegistryError`] if two policies claim the same route.
pub fn default_registry() -> Result<HandlerRegistry, RegistryError> {
    let connecters = default_connecters();
    HandlerRegistry::from_connecters(connecters.iter().map(|connecter| &**connecter))
}
