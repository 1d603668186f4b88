use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{HouseId, Listing, ListingId, ListingStatus, ListingUpdate, NewListing};
use super::repository::{ListingStore, RepositoryError};
use super::visibility::Visibility;
use crate::auth::UserId;

#[derive(Debug, Default)]
struct Rows {
    next_id: i64,
    listings: BTreeMap<ListingId, Listing>,
}

/// Process-local listing store. Every operation holds the table mutex for its
/// full duration, so the conditional update is a single critical section.
#[derive(Debug, Default, Clone)]
pub struct InMemoryListingStore {
    rows: Arc<Mutex<Rows>>,
}

impl InMemoryListingStore {
    fn rows(&self) -> Result<MutexGuard<'_, Rows>, RepositoryError> {
        self.rows
            .lock()
            .map_err(|_| RepositoryError::Unavailable("listing table lock poisoned".to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows().map(|rows| rows.listings.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ListingStore for InMemoryListingStore {
    fn insert(&self, owner: UserId, draft: NewListing) -> Result<Listing, RepositoryError> {
        let mut rows = self.rows()?;
        rows.next_id += 1;
        let listing = Listing {
            id: ListingId(rows.next_id),
            house_id: draft.house_id,
            owner_id: owner,
            number: draft.number,
            price: draft.price,
            rooms: draft.rooms,
            status: ListingStatus::Created,
            moderator_id: None,
        };
        rows.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn update_unless_locked(
        &self,
        update: &ListingUpdate,
        moderator: UserId,
    ) -> Result<Option<Listing>, RepositoryError> {
        let mut rows = self.rows()?;
        let Some(listing) = rows
            .listings
            .get_mut(&update.id)
            .filter(|listing| listing.admits(moderator))
        else {
            return Ok(None);
        };

        listing.apply(update, moderator);
        Ok(Some(listing.clone()))
    }

    fn by_house(
        &self,
        house: HouseId,
        visibility: Visibility,
    ) -> Result<Vec<Listing>, RepositoryError> {
        let rows = self.rows()?;
        Ok(rows
            .listings
            .values()
            .filter(|listing| listing.house_id == house && visibility.admits(listing.status))
            .cloned()
            .collect())
    }

    fn fetch(&self, id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        Ok(self.rows()?.listings.get(&id).cloned())
    }
}
