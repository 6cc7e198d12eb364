//! Effective permissions of a user in a meeting.

use std::collections::HashSet;

use permission_sdk::{ANONYMOUS_USER_ID, Id, UserId};
use tracing::trace;

use super::datastore::Datastore;
use super::derivate::PermissionGraph;
use super::error::DomainError;

/// The permissions a user holds in one meeting.
///
/// Built once per evaluation and never changed afterwards. `granted` is
/// closed under the implication graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionSet {
    is_admin: bool,
    group_ids: HashSet<Id>,
    granted: HashSet<String>,
}

impl PermissionSet {
    /// Resolves the permissions of `user_id` in `meeting_id`.
    ///
    /// A user without groups in the meeting gets the empty set. The
    /// anonymous user gets the meeting's default group when anonymous access
    /// is enabled. A member of the admin group holds every permission.
    ///
    /// # Errors
    ///
    /// `Decode` / `Datastore` / `Cancelled` if a read failed.
    #[tracing::instrument(skip(ds, graph))]
    pub async fn resolve(
        ds: &Datastore,
        graph: &PermissionGraph,
        user_id: UserId,
        meeting_id: Id,
    ) -> Result<Self, DomainError> {
        let group_ids: Vec<Id> = if user_id == ANONYMOUS_USER_ID {
            let enabled: bool = ds
                .get_if_exist(&format!("meeting/{meeting_id}/enable_anonymous"))
                .await?;
            if !enabled {
                return Ok(Self::default());
            }

            let default_group: Id = ds
                .get_if_exist(&format!("meeting/{meeting_id}/default_group_id"))
                .await?;
            if default_group == 0 {
                Vec::new()
            } else {
                vec![default_group]
            }
        } else {
            ds.get_if_exist(&format!("user/{user_id}/group_${meeting_id}_ids"))
                .await?
        };

        if group_ids.is_empty() {
            return Ok(Self::default());
        }

        let admin_group: Id = ds
            .get_if_exist(&format!("meeting/{meeting_id}/admin_group_id"))
            .await?;
        if admin_group != 0 && group_ids.contains(&admin_group) {
            trace!(admin_group, "user is meeting admin");
            return Ok(Self {
                is_admin: true,
                group_ids: group_ids.into_iter().collect(),
                granted: HashSet::new(),
            });
        }

        let mut direct = Vec::new();
        for group_id in &group_ids {
            let perms: Vec<String> = ds
                .get_if_exist(&format!("group/{group_id}/permissions"))
                .await?;
            direct.extend(perms);
        }

        Ok(Self {
            is_admin: false,
            group_ids: group_ids.into_iter().collect(),
            granted: graph.closure(direct),
        })
    }

    /// A set holding exactly the given permissions, closed under `graph`.
    #[must_use]
    pub fn from_permissions<I, S>(graph: &PermissionGraph, perms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            is_admin: false,
            group_ids: HashSet::new(),
            granted: graph.closure(perms),
        }
    }

    #[must_use]
    pub fn has(&self, perm: &str) -> bool {
        self.is_admin || self.granted.contains(perm)
    }

    /// Returns `true` if at least one of `perms` is granted.
    #[must_use]
    pub fn has_one(&self, perms: &[&str]) -> bool {
        self.is_admin || perms.iter().any(|p| self.granted.contains(*p))
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    #[must_use]
    pub fn in_group(&self, group_id: Id) -> bool {
        self.group_ids.contains(&group_id)
    }

    #[must_use]
    pub fn group_ids(&self) -> &HashSet<Id> {
        &self.group_ids
    }

    #[must_use]
    pub fn granted(&self) -> &HashSet<String> {
        &self.granted
    }
}
