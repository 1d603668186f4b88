use super::domain::{HouseId, Listing, ListingId, ListingUpdate, NewListing};
use super::visibility::Visibility;
use crate::auth::UserId;

/// Persistence contract for listings.
///
/// Implementations back onto a store that can evaluate a predicate and apply a
/// write atomically; the moderation lock depends on it.
pub trait ListingStore: Send + Sync {
    /// Persist a new listing in status `created` owned by `owner`.
    fn insert(&self, owner: UserId, draft: NewListing) -> Result<Listing, RepositoryError>;

    /// Apply `update` to the row with `update.id` if and only if the row is not
    /// `on moderation` or is locked by `moderator`, as one atomic conditional
    /// write. `Ok(None)` means no row matched: absent or locked by someone else.
    fn update_unless_locked(
        &self,
        update: &ListingUpdate,
        moderator: UserId,
    ) -> Result<Option<Listing>, RepositoryError>;

    /// Listings of `house` that `visibility` admits, ordered by id.
    fn by_house(&self, house: HouseId, visibility: Visibility)
        -> Result<Vec<Listing>, RepositoryError>;

    fn fetch(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
