//! Flats inside houses: creation, single-moderator moderation and role-aware reads.

pub mod domain;
pub mod intake;
pub mod memory;
pub mod repository;
pub mod router;
pub mod service;
pub mod visibility;

#[cfg(test)]
mod tests;

pub use domain::{
    HouseId, Listing, ListingId, ListingStatus, ListingUpdate, ListingView, NewListing,
};
pub use intake::{CreateListingRequest, UpdateListingRequest, ValidationError};
pub use memory::InMemoryListingStore;
pub use repository::{ListingStore, RepositoryError};
pub use router::{listing_router, HouseListingsResponse};
pub use service::{ListingError, ListingService};
pub use visibility::Visibility;
