use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{ListingId, UserId};

/// Sale state of a listing as shown on the seller dashboard tabs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    #[default]
    Selling,
    Reserved,
    Sold,
}

impl ListingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ListingStatus::Selling => "selling",
            ListingStatus::Reserved => "reserved",
            ListingStatus::Sold => "sold",
        }
    }
}

// Rows written before the status column existed carry `null`.
fn status_or_default<'de, D>(deserializer: D) -> Result<ListingStatus, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<ListingStatus>::deserialize(deserializer)?.unwrap_or_default())
}

/// A product entry owned by exactly one seller.
///
/// Field names follow the `products` table of the hosted database so rows
/// deserialize directly.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: ListingId,
    #[serde(rename = "user_id")]
    pub owner: UserId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: i64,
    #[serde(default, deserialize_with = "status_or_default")]
    pub status: ListingStatus,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Listing {
    pub fn new(id: ListingId, owner: UserId) -> Self {
        Self {
            id,
            owner,
            title: String::new(),
            price: 0,
            status: ListingStatus::Selling,
            category: None,
            created_at: None,
        }
    }

    pub fn with_status(mut self, status: ListingStatus) -> Self {
        self.status = status;
        self
    }
}

/// A user's favorite on a listing. Unique per (user, listing) pair; the store
/// enforces uniqueness.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct FavoriteMark {
    pub user_id: UserId,
    #[serde(rename = "product_id")]
    pub listing_id: ListingId,
}

impl FavoriteMark {
    pub fn new(user_id: UserId, listing_id: ListingId) -> Self {
        Self { user_id, listing_id }
    }
}
