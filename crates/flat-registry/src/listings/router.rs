use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use serde::{Deserialize, Serialize};

use super::domain::{HouseId, ListingView};
use super::intake::{CreateListingRequest, UpdateListingRequest, ValidationError};
use super::repository::ListingStore;
use super::service::{ListingError, ListingService};
use crate::auth::{authenticate, authorize, Identity, Role, TokenService};
use crate::error::ApiError;
use crate::request_id::RequestId;

/// Listing endpoints. Every route authenticates; updates additionally require
/// the moderator role.
pub fn listing_router<S>(service: Arc<ListingService<S>>, tokens: Arc<TokenService>) -> Router
where
    S: ListingStore + 'static,
{
    Router::new()
        .route("/flat/create", post(create_handler::<S>))
        .route(
            "/flat/update",
            post(update_handler::<S>)
                .route_layer(middleware::from_fn_with_state(Role::Moderator, authorize)),
        )
        .route("/house/:id", get(house_listings_handler::<S>))
        .route_layer(middleware::from_fn_with_state(tokens, authenticate))
        .with_state(service)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HouseListingsResponse {
    pub status: String,
    pub flats: Vec<ListingView>,
}

fn malformed(message: String, request_id: Option<&RequestId>) -> ApiError {
    ApiError::from(ListingError::Validation(ValidationError::MalformedBody(message)))
        .with_request_id(request_id)
}

pub(crate) async fn create_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    identity: Identity,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<CreateListingRequest>, JsonRejection>,
) -> Result<Json<ListingView>, ApiError>
where
    S: ListingStore + 'static,
{
    let request_id = request_id.map(|Extension(id)| id);
    let Json(request) =
        payload.map_err(|rejection| malformed(rejection.body_text(), request_id.as_ref()))?;

    let listing = service
        .create(&identity, &request)
        .map_err(|err| ApiError::from(err).with_request_id(request_id.as_ref()))?;

    Ok(Json(listing.view()))
}

pub(crate) async fn update_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    identity: Identity,
    request_id: Option<Extension<RequestId>>,
    payload: Result<Json<UpdateListingRequest>, JsonRejection>,
) -> Result<Json<ListingView>, ApiError>
where
    S: ListingStore + 'static,
{
    let request_id = request_id.map(|Extension(id)| id);
    let Json(request) =
        payload.map_err(|rejection| malformed(rejection.body_text(), request_id.as_ref()))?;

    let listing = service
        .transition(&identity, &request)
        .map_err(|err| ApiError::from(err).with_request_id(request_id.as_ref()))?;

    Ok(Json(listing.view()))
}

pub(crate) async fn house_listings_handler<S>(
    State(service): State<Arc<ListingService<S>>>,
    identity: Identity,
    request_id: Option<Extension<RequestId>>,
    house_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<HouseListingsResponse>, ApiError>
where
    S: ListingStore + 'static,
{
    let request_id = request_id.map(|Extension(id)| id);
    let Path(house_id) =
        house_id.map_err(|rejection| malformed(rejection.body_text(), request_id.as_ref()))?;

    let listings = service
        .house_listings(HouseId(house_id), &identity)
        .map_err(|err| ApiError::from(err).with_request_id(request_id.as_ref()))?;

    Ok(Json(HouseListingsResponse {
        status: "ok".to_string(),
        flats: listings.iter().map(|listing| listing.view()).collect(),
    }))
}
