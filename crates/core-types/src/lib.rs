pub mod enums;
pub mod error;
pub mod structs;

// Re-export the core types to provide a clean public API.
pub use enums::{CurrentAuctionSort, PriceAverageOrder, SortDirection};
pub use error::CoreError;
pub use structs::{
    Auction, AuctionHouse, CurrentAuction, CurrentAuctionListing, Item, ItemSummary,
    PriceAverage, PriceDistribution, Realm,
};
