//! Hierarchical authorization check shared by all policies.

use permission_sdk::{Id, UserId};
use tracing::debug;

use super::datastore::Datastore;
use super::derivate::PermissionGraph;
use super::error::DomainError;
use super::perm::PermissionSet;

/// Outcome of a single policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { reason: String },
}

impl Decision {
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self::Deny {
            reason: reason.into(),
        }
    }

    /// `Allow` if `allowed`, else a denial with the given reason.
    #[must_use]
    pub fn from_bool(allowed: bool, reason: impl FnOnce() -> String) -> Self {
        if allowed {
            Self::Allow
        } else {
            Self::Deny { reason: reason() }
        }
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }
}

/// Checks that `user_id` may act in `meeting_id` with one of `perms`.
///
/// 1. managers of the meeting's committee are always allowed;
/// 2. users that are not in the meeting are denied;
/// 3. otherwise the user needs at least one of `perms`.
///
/// # Errors
///
/// `Decode` / `Datastore` / `Cancelled` if a read failed.
pub async fn ensure_perms(
    ds: &Datastore,
    graph: &PermissionGraph,
    user_id: UserId,
    meeting_id: Id,
    perms: &[&str],
) -> Result<Decision, DomainError> {
    if let Some(committee_id) = ds.committee_id(meeting_id).await?
        && ds.is_manager(user_id, committee_id).await?
    {
        return Ok(Decision::Allow);
    }

    if !ds.in_meeting(user_id, meeting_id).await? {
        let decision = Decision::deny(format!("user {user_id} is not in meeting {meeting_id}"));
        log_denial(&decision);
        return Ok(decision);
    }

    let set = PermissionSet::resolve(ds, graph, user_id, meeting_id).await?;
    let decision = Decision::from_bool(set.has_one(perms), || {
        format!(
            "user {user_id} has none of [{}] in meeting {meeting_id}",
            perms.join(", ")
        )
    });
    log_denial(&decision);
    Ok(decision)
}

/// Logs the reason of a denial. Reasons never leave the process.
pub fn log_denial(decision: &Decision) {
    if let Decision::Deny { reason } = decision {
        debug!(reason = %reason, "permission denied");
    }
}
