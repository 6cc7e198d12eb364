//! Permission implication graph.
//!
//! Holding a permission grants every permission reachable from it, e.g.
//! `motion.can_manage` grants `motion.can_see`.

use std::collections::{HashMap, HashSet, VecDeque};

/// Static map from a permission to the permissions it directly implies.
#[derive(Debug, Clone, Default)]
pub struct PermissionGraph {
    implied: HashMap<String, Vec<String>>,
}

impl PermissionGraph {
    /// Builds a graph from `(permission, directly implied permissions)` pairs.
    #[must_use]
    pub fn new<'a, I, J>(edges: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, J)>,
        J: IntoIterator<Item = &'a str>,
    {
        let mut implied: HashMap<String, Vec<String>> = HashMap::new();
        for (perm, targets) in edges {
            let entry = implied.entry(perm.to_owned()).or_default();
            for target in targets {
                if !entry.iter().any(|t| t == target) {
                    entry.push(target.to_owned());
                }
            }
        }
        Self { implied }
    }

    /// The permission table of the meeting system.
    #[must_use]
    pub fn openslides() -> Self {
        Self::new(OPENSLIDES_PERMISSIONS.iter().map(|(p, i)| (*p, i.iter().copied())))
    }

    /// Permissions directly implied by `perm`.
    #[must_use]
    pub fn implied(&self, perm: &str) -> &[String] {
        self.implied.get(perm).map_or(&[], Vec::as_slice)
    }

    /// The given permissions together with everything they imply.
    ///
    /// Terminates on cycles. Applying it to its own result changes nothing.
    #[must_use]
    pub fn closure<I, S>(&self, perms: I) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut granted = HashSet::new();
        let mut queue: VecDeque<String> = perms.into_iter().map(Into::into).collect();

        while let Some(perm) = queue.pop_front() {
            if granted.contains(&perm) {
                continue;
            }
            queue.extend(
                self.implied(&perm)
                    .iter()
                    .filter(|p| !granted.contains(*p))
                    .cloned(),
            );
            granted.insert(perm);
        }
        granted
    }
}

const OPENSLIDES_PERMISSIONS: &[(&str, &[&str])] = &[
    ("agenda.can_be_speaker", &["agenda.can_see"]),
    (
        "agenda.can_manage",
        &[
            "agenda.can_manage_list_of_speakers",
            "agenda.can_see_list_of_speakers",
            "agenda.can_see",
            "agenda.can_be_speaker",
            "agenda.can_see_internal_items",
        ],
    ),
    (
        "agenda.can_manage_list_of_speakers",
        &["agenda.can_see_list_of_speakers", "agenda.can_see"],
    ),
    ("agenda.can_see", &[]),
    ("agenda.can_see_internal_items", &["agenda.can_see"]),
    ("agenda.can_see_list_of_speakers", &["agenda.can_see"]),
    (
        "assignment.can_manage",
        &[
            "assignment.can_nominate_other",
            "assignment.can_see",
            "assignment.can_nominate_self",
        ],
    ),
    ("assignment.can_nominate_other", &["assignment.can_see"]),
    ("assignment.can_nominate_self", &["assignment.can_see"]),
    ("assignment.can_see", &[]),
    ("mediafile.can_manage", &["mediafile.can_see"]),
    ("mediafile.can_see", &[]),
    (
        "meeting.can_manage",
        &[
            "meeting.can_manage_logos_and_fonts",
            "meeting.can_manage_projector",
            "meeting.can_see_projector",
            "meeting.can_see_history",
            "meeting.can_see_autopilot",
            "meeting.can_see_frontpage",
        ],
    ),
    ("meeting.can_manage_logos_and_fonts", &[]),
    ("meeting.can_manage_projector", &["meeting.can_see_projector"]),
    ("meeting.can_see_autopilot", &["meeting.can_see_frontpage"]),
    ("meeting.can_see_frontpage", &[]),
    ("meeting.can_see_history", &[]),
    ("meeting.can_see_projector", &[]),
    ("motion.can_create", &["motion.can_see"]),
    ("motion.can_create_amendments", &["motion.can_see"]),
    (
        "motion.can_manage",
        &[
            "motion.can_manage_metadata",
            "motion.can_support",
            "motion.can_see",
            "motion.can_see_internal",
            "motion.can_create",
            "motion.can_create_amendments",
        ],
    ),
    (
        "motion.can_manage_metadata",
        &["motion.can_support", "motion.can_see"],
    ),
    ("motion.can_see", &[]),
    ("motion.can_see_internal", &["motion.can_see"]),
    ("motion.can_support", &["motion.can_see"]),
    ("tag.can_manage", &[]),
    ("user.can_change_password", &[]),
    ("user.can_manage", &["user.can_see_extra_data", "user.can_see"]),
    ("user.can_see", &[]),
    ("user.can_see_extra_data", &["user.can_see"]),
];
