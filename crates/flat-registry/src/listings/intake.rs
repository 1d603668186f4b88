//! Wire-level request bodies and the structural checks that turn them into
//! domain inputs before anything touches storage.

use serde::Deserialize;

use super::domain::{HouseId, ListingId, ListingStatus, ListingUpdate, NewListing};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must be a positive integer")]
    NotPositive { field: &'static str },
    #[error("price must not be negative")]
    NegativePrice,
    #[error("status is required")]
    MissingStatus,
    #[error("malformed request body: {0}")]
    MalformedBody(String),
}

/// Body of `POST /flat/create`. Missing fields deserialize to zero and are
/// rejected by [`CreateListingRequest::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CreateListingRequest {
    pub house_id: i64,
    pub number: i64,
    pub price: i64,
    pub rooms: i64,
}

/// Body of `POST /flat/update`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateListingRequest {
    pub id: i64,
    pub house_id: i64,
    pub number: i64,
    pub price: i64,
    pub rooms: i64,
    pub status: Option<ListingStatus>,
}

pub(crate) fn positive(field: &'static str, value: i64) -> Result<i64, ValidationError> {
    if value > 0 {
        Ok(value)
    } else {
        Err(ValidationError::NotPositive { field })
    }
}

impl CreateListingRequest {
    pub fn validate(&self) -> Result<NewListing, ValidationError> {
        if self.price < 0 {
            return Err(ValidationError::NegativePrice);
        }

        Ok(NewListing {
            house_id: HouseId(positive("house_id", self.house_id)?),
            number: positive("number", self.number)?,
            price: self.price,
            rooms: positive("rooms", self.rooms)?,
        })
    }
}

impl UpdateListingRequest {
    pub fn validate(&self) -> Result<ListingUpdate, ValidationError> {
        Ok(ListingUpdate {
            id: ListingId(positive("id", self.id)?),
            house_id: HouseId(positive("house_id", self.house_id)?),
            number: positive("number", self.number)?,
            price: positive("price", self.price)?,
            rooms: positive("rooms", self.rooms)?,
            status: self.status.ok_or(ValidationError::MissingStatus)?,
        })
    }
}
