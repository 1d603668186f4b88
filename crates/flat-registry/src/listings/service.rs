use std::sync::Arc;

use tracing::{info, warn};

use super::domain::{HouseId, Listing};
use super::intake::{positive, CreateListingRequest, UpdateListingRequest, ValidationError};
use super::repository::{ListingStore, RepositoryError};
use super::visibility::Visibility;
use crate::auth::Identity;
use crate::notifications::NotificationDispatcher;

/// Listing lifecycle: creation with notification hand-off, lock-guarded
/// moderation transitions and role-filtered reads.
pub struct ListingService<S> {
    store: Arc<S>,
    notifications: NotificationDispatcher,
}

impl<S> ListingService<S>
where
    S: ListingStore + 'static,
{
    pub fn new(store: Arc<S>, notifications: NotificationDispatcher) -> Self {
        Self {
            store,
            notifications,
        }
    }

    /// Persist a new listing owned by `owner`, then queue subscriber notifications.
    pub fn create(
        &self,
        owner: &Identity,
        request: &CreateListingRequest,
    ) -> Result<Listing, ListingError> {
        let draft = request.validate()?;
        let listing = self.store.insert(owner.user_id, draft)?;

        info!(
            listing_id = %listing.id,
            house_id = %listing.house_id,
            owner_id = %owner.user_id,
            "listing created"
        );

        self.notifications.submit(&listing);
        Ok(listing)
    }

    /// Apply a moderator's update through the store's conditional write.
    ///
    /// A listing that is absent and one locked by another moderator both yield
    /// [`ListingError::Conflict`].
    pub fn transition(
        &self,
        moderator: &Identity,
        request: &UpdateListingRequest,
    ) -> Result<Listing, ListingError> {
        let update = request.validate()?;

        match self
            .store
            .update_unless_locked(&update, moderator.user_id)?
        {
            Some(listing) => {
                info!(
                    listing_id = %listing.id,
                    moderator_id = %moderator.user_id,
                    status = listing.status.label(),
                    "listing updated"
                );
                Ok(listing)
            }
            None => {
                warn!(
                    listing_id = %update.id,
                    moderator_id = %moderator.user_id,
                    "listing update matched no row"
                );
                Err(ListingError::Conflict)
            }
        }
    }

    /// Listings of `house` visible to `viewer`.
    pub fn house_listings(
        &self,
        house: HouseId,
        viewer: &Identity,
    ) -> Result<Vec<Listing>, ListingError> {
        positive("house_id", house.0)?;
        let visibility = Visibility::for_role(viewer.role);
        Ok(self.store.by_house(house, visibility)?)
    }
}

/// Error raised by the listing service.
#[derive(Debug, thiserror::Error)]
pub enum ListingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("listing is not available for update")]
    Conflict,
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
