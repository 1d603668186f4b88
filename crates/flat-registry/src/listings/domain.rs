use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HouseId(pub i64);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Display for HouseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Moderation status of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ListingStatus {
    #[serde(rename = "created")]
    Created,
    #[serde(rename = "on moderation")]
    OnModeration,
    #[serde(rename = "approved")]
    Approved,
    #[serde(rename = "declined")]
    Declined,
}

impl ListingStatus {
    pub const ALL: [ListingStatus; 4] = [
        ListingStatus::Created,
        ListingStatus::OnModeration,
        ListingStatus::Approved,
        ListingStatus::Declined,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ListingStatus::Created => "created",
            ListingStatus::OnModeration => "on moderation",
            ListingStatus::Approved => "approved",
            ListingStatus::Declined => "declined",
        }
    }

    pub const fn is_locked(self) -> bool {
        matches!(self, ListingStatus::OnModeration)
    }
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A flat offered inside a house.
///
/// `moderator_id` is `Some` exactly when `status` is [`ListingStatus::OnModeration`];
/// it names the moderator holding the moderation lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub id: ListingId,
    pub house_id: HouseId,
    pub owner_id: UserId,
    pub number: i64,
    pub price: i64,
    pub rooms: i64,
    pub status: ListingStatus,
    pub moderator_id: Option<UserId>,
}

impl Listing {
    /// Whether `moderator` may write to this listing in its current state.
    pub fn admits(&self, moderator: UserId) -> bool {
        !self.status.is_locked() || self.moderator_id == Some(moderator)
    }

    /// Overwrite every editable field from `update`, recomputing the lock holder.
    pub fn apply(&mut self, update: &ListingUpdate, moderator: UserId) {
        self.house_id = update.house_id;
        self.number = update.number;
        self.price = update.price;
        self.rooms = update.rooms;
        self.status = update.status;
        self.moderator_id = update.status.is_locked().then_some(moderator);
    }

    pub fn view(&self) -> ListingView {
        ListingView {
            id: self.id,
            house_id: self.house_id,
            owner_id: self.owner_id,
            number: self.number,
            price: self.price,
            rooms: self.rooms,
            status: self.status,
        }
    }
}

/// Validated creation input. The owner comes from the caller's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewListing {
    pub house_id: HouseId,
    pub number: i64,
    pub price: i64,
    pub rooms: i64,
}

/// Validated full-replacement update including the target status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingUpdate {
    pub id: ListingId,
    pub house_id: HouseId,
    pub number: i64,
    pub price: i64,
    pub rooms: i64,
    pub status: ListingStatus,
}

/// Representation returned to HTTP callers; the lock holder is never exposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingView {
    pub id: ListingId,
    pub house_id: HouseId,
    pub owner_id: UserId,
    pub number: i64,
    pub price: i64,
    pub rooms: i64,
    pub status: ListingStatus,
}
