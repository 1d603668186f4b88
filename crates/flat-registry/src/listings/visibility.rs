//! Read-time projection of a house's listings according to the caller's role.

use super::domain::ListingStatus;
use crate::auth::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    /// Every listing regardless of status.
    All,
    /// Only listings that passed moderation.
    ApprovedOnly,
}

impl Visibility {
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Moderator => Visibility::All,
            Role::Client => Visibility::ApprovedOnly,
        }
    }

    pub const fn admits(self, status: ListingStatus) -> bool {
        match self {
            Visibility::All => true,
            Visibility::ApprovedOnly => matches!(status, ListingStatus::Approved),
        }
    }
}
