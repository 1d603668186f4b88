use std::sync::Arc;

use axum::http::HeaderValue;
use axum::response::Response;
use axum::{middleware, Router};
use chrono::Duration;
use serde_json::Value;

use crate::auth::{Identity, Role, TokenService, UserId};
use crate::listings::{
    listing_router, CreateListingRequest, HouseId, InMemoryListingStore, Listing, ListingId,
    ListingService, ListingStatus, ListingStore, ListingUpdate, NewListing, RepositoryError,
    UpdateListingRequest, Visibility,
};
use crate::notifications::{notification_channel, DeliveryQueue};
use crate::request_id::assign_request_id;

pub(super) fn identity(role: Role) -> Identity {
    Identity {
        user_id: UserId::generate(),
        role,
    }
}

pub(super) fn tokens() -> Arc<TokenService> {
    Arc::new(TokenService::new(b"listing-tests", Duration::hours(1)))
}

pub(super) fn bearer(tokens: &TokenService, identity: &Identity) -> HeaderValue {
    let token = tokens
        .issue(identity.user_id, identity.role, Duration::minutes(10))
        .expect("token issues");
    HeaderValue::from_str(&format!("Bearer {token}")).expect("header value")
}

pub(super) fn create_request(house: i64) -> CreateListingRequest {
    CreateListingRequest {
        house_id: house,
        number: 197,
        price: 8_900_000,
        rooms: 3,
    }
}

pub(super) fn update_request(listing: &Listing, status: ListingStatus) -> UpdateListingRequest {
    UpdateListingRequest {
        id: listing.id.0,
        house_id: listing.house_id.0,
        number: listing.number,
        price: listing.price,
        rooms: listing.rooms,
        status: Some(status),
    }
}

pub(super) fn build_service() -> (
    ListingService<InMemoryListingStore>,
    Arc<InMemoryListingStore>,
    DeliveryQueue,
) {
    let store = Arc::new(InMemoryListingStore::default());
    let (dispatcher, queue) = notification_channel(16);
    let service = ListingService::new(store.clone(), dispatcher);
    (service, store, queue)
}

pub(super) fn router_with_service(
    service: ListingService<InMemoryListingStore>,
    tokens: Arc<TokenService>,
) -> Router {
    listing_router(Arc::new(service), tokens).layer(middleware::from_fn(assign_request_id))
}

pub(super) struct UnavailableStore;

impl ListingStore for UnavailableStore {
    fn insert(&self, _owner: UserId, _draft: NewListing) -> Result<Listing, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_unless_locked(
        &self,
        _update: &ListingUpdate,
        _moderator: UserId,
    ) -> Result<Option<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn by_house(
        &self,
        _house: HouseId,
        _visibility: Visibility,
    ) -> Result<Vec<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: ListingId) -> Result<Option<Listing>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn assert_lock_invariant(listing: &Listing) {
    assert_eq!(
        listing.status == ListingStatus::OnModeration,
        listing.moderator_id.is_some(),
        "lock holder must be set exactly while on moderation: {listing:?}"
    );
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
