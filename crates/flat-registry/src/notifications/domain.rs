use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::listings::{HouseId, Listing, ListingId, RepositoryError};

/// E-mail address a subscriber asked to be notified at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactAddress(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a valid e-mail address")]
pub struct InvalidContact(pub String);

impl ContactAddress {
    pub fn parse(raw: &str) -> Result<Self, InvalidContact> {
        let candidate = raw.trim();
        let valid = candidate
            .split_once('@')
            .filter(|(local, domain)| {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain
                        .rsplit_once('.')
                        .is_some_and(|(host, tld)| !host.is_empty() && tld.len() >= 2)
            })
            .is_some()
            && !candidate.chars().any(char::is_whitespace);

        if valid {
            Ok(Self(candidate.to_ascii_lowercase()))
        } else {
            Err(InvalidContact(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContactAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message rendered once per listing and sent to every subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub house_id: HouseId,
    pub listing_id: ListingId,
    pub subject: String,
    pub body: String,
}

impl Notification {
    pub fn listing_created(listing: &Listing) -> Self {
        Self {
            house_id: listing.house_id,
            listing_id: listing.id,
            subject: format!("New flat in house {}", listing.house_id),
            body: format!(
                "New flat added in house {}: number {}, price {}, rooms {}, status {}",
                listing.house_id, listing.number, listing.price, listing.rooms, listing.status
            ),
        }
    }
}

/// Read side of the subscription collaborator.
pub trait SubscriberDirectory: Send + Sync {
    fn subscribers(&self, house: HouseId) -> Result<Vec<ContactAddress>, RepositoryError>;
}

/// Outbound transport (mail gateway or similar).
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        contact: &ContactAddress,
        notification: &Notification,
    ) -> Result<(), NotificationError>;
}

/// Per-subscriber delivery failure. Logged, never returned to HTTP callers.
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("transport unavailable: {0}")]
    Transport(String),
    #[error("recipient {0} rejected")]
    Rejected(ContactAddress),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_addresses() {
        let contact = ContactAddress::parse(" A@Example.org ").expect("valid");
        assert_eq!(contact.as_str(), "a@example.org");
    }

    #[test]
    fn rejects_malformed_addresses() {
        for raw in ["", "plain", "@example.org", "a@b", "a@@b.org", "a b@c.org", "a@.org"] {
            assert!(ContactAddress::parse(raw).is_err(), "{raw} should be rejected");
        }
    }
}
