use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A game realm. Row of the `realms` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Realm {
    pub id: i16,
    pub name: String,
}

/// Row of the `auction_houses` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AuctionHouse {
    pub id: i16,
    pub name: String,
}

/// Item metadata. Row of the `items` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub id: i32,
    pub name: String,
    pub media_url: String,
    pub rarity: String,
    #[serde(default)]
    pub level: i16,
    #[serde(default)]
    pub required_level: i16,
    #[serde(default)]
    pub purchase_price: i32,
    #[serde(default)]
    pub sell_price: i32,
}

/// The subset of item columns returned by the fuzzy name search.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: i32,
    pub name: String,
    pub media_url: String,
    pub rarity: String,
}

/// A point-in-time summary of the listings for one item on one realm and
/// auction house at one sampling interval.
///
/// Rows of `auctions` are keyed by
/// `(realm_id, auction_house_id, item_id, interval, timestamp)`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Auction {
    pub realm_id: i16,
    pub auction_house_id: i16,
    pub item_id: i32,
    pub interval: i16,
    /// Unix seconds of the sampling instant.
    pub timestamp: i32,
    pub quantity: i32,
    pub min: i32,
    pub p05: i32,
    pub p10: i32,
    pub p25: i32,
    pub p50: i32,
    pub p75: i32,
    pub p90: i32,
    pub max: i32,
}

/// The latest snapshot for a `(realm, auction house, item)` triple.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CurrentAuction {
    pub realm_id: i16,
    pub auction_house_id: i16,
    pub item_id: i32,
    pub quantity: i32,
    pub min: i32,
    pub p05: i32,
    pub p10: i32,
    pub p25: i32,
    pub p50: i32,
    pub p75: i32,
    pub p90: i32,
    pub max: i32,
}

impl From<&Auction> for CurrentAuction {
    fn from(auction: &Auction) -> Self {
        Self {
            realm_id: auction.realm_id,
            auction_house_id: auction.auction_house_id,
            item_id: auction.item_id,
            quantity: auction.quantity,
            min: auction.min,
            p05: auction.p05,
            p10: auction.p10,
            p25: auction.p25,
            p50: auction.p50,
            p75: auction.p75,
            p90: auction.p90,
            max: auction.max,
        }
    }
}

/// A current auction joined with the metadata of its item.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CurrentAuctionListing {
    pub realm_id: i16,
    pub auction_house_id: i16,
    pub item_id: i32,
    pub item_name: String,
    pub item_media_url: String,
    pub item_rarity: String,
    pub quantity: i32,
    pub min: i32,
    pub p05: i32,
    pub p10: i32,
    pub p25: i32,
    pub p50: i32,
    pub p75: i32,
    pub p90: i32,
    pub max: i32,
}

/// One histogram bucket: how many units are listed at `buyout_each`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PriceDistribution {
    pub realm_id: i16,
    pub auction_house_id: i16,
    pub item_id: i32,
    pub buyout_each: i32,
    pub quantity: i32,
}

/// Current values compared against their historical average, per percentile.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct PriceAverage {
    pub realm_id: i16,
    pub auction_house_id: i16,
    pub item_id: i32,
    pub quantity_current: i32,
    pub quantity_average: i32,
    pub quantity_percent: f32,
    pub p05_current: i32,
    pub p05_average: i32,
    pub p05_percent: f32,
    pub p10_current: i32,
    pub p10_average: i32,
    pub p10_percent: f32,
    pub p25_current: i32,
    pub p25_average: i32,
    pub p25_percent: f32,
    pub p50_current: i32,
    pub p50_average: i32,
    pub p50_percent: f32,
    pub p75_current: i32,
    pub p75_average: i32,
    pub p75_percent: f32,
    pub p90_current: i32,
    pub p90_average: i32,
    pub p90_percent: f32,
}
