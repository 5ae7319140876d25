//! Terminal rendering for the CLI commands.

use chrono::DateTime;
use comfy_table::{presets::UTF8_FULL, Table};
use core_types::{
    Auction, AuctionHouse, CurrentAuctionListing, Item, ItemSummary, PriceAverage,
    PriceDistribution, Realm,
};

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(header.to_vec());
    table
}

/// Formats a snapshot's unix timestamp, keeping the raw value if it is out of range.
pub fn format_timestamp(timestamp: i32) -> String {
    DateTime::from_timestamp(i64::from(timestamp), 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn realms(realms: &[Realm]) -> Table {
    let mut t = table(&["Id", "Name"]);
    for realm in realms {
        t.add_row(vec![realm.id.to_string(), realm.name.clone()]);
    }
    t
}

pub fn auction_houses(houses: &[AuctionHouse]) -> Table {
    let mut t = table(&["Id", "Name"]);
    for house in houses {
        t.add_row(vec![house.id.to_string(), house.name.clone()]);
    }
    t
}

pub fn item(item: &Item) -> Table {
    let mut t = table(&["Field", "Value"]);
    t.add_row(vec!["id".to_string(), item.id.to_string()]);
    t.add_row(vec!["name".to_string(), item.name.clone()]);
    t.add_row(vec!["rarity".to_string(), item.rarity.clone()]);
    t.add_row(vec!["level".to_string(), item.level.to_string()]);
    t.add_row(vec!["required level".to_string(), item.required_level.to_string()]);
    t.add_row(vec!["purchase price".to_string(), item.purchase_price.to_string()]);
    t.add_row(vec!["sell price".to_string(), item.sell_price.to_string()]);
    t.add_row(vec!["media".to_string(), item.media_url.clone()]);
    t
}

pub fn item_summaries(items: &[ItemSummary]) -> Table {
    let mut t = table(&["Id", "Name", "Rarity"]);
    for item in items {
        t.add_row(vec![item.id.to_string(), item.name.clone(), item.rarity.clone()]);
    }
    t
}

pub fn auctions(auctions: &[Auction]) -> Table {
    let mut t = table(&["Time", "Qty", "Min", "P05", "P10", "P25", "P50", "P75", "P90", "Max"]);
    for a in auctions {
        t.add_row(vec![
            format_timestamp(a.timestamp),
            a.quantity.to_string(),
            a.min.to_string(),
            a.p05.to_string(),
            a.p10.to_string(),
            a.p25.to_string(),
            a.p50.to_string(),
            a.p75.to_string(),
            a.p90.to_string(),
            a.max.to_string(),
        ]);
    }
    t
}

pub fn current_auctions(listings: &[CurrentAuctionListing]) -> Table {
    let mut t = table(&["Item", "Name", "Rarity", "Qty", "Min", "P50", "P90", "Max"]);
    for l in listings {
        t.add_row(vec![
            l.item_id.to_string(),
            l.item_name.clone(),
            l.item_rarity.clone(),
            l.quantity.to_string(),
            l.min.to_string(),
            l.p50.to_string(),
            l.p90.to_string(),
            l.max.to_string(),
        ]);
    }
    t
}

pub fn price_distributions(buckets: &[PriceDistribution]) -> Table {
    let mut t = table(&["Buyout each", "Quantity"]);
    for bucket in buckets {
        t.add_row(vec![bucket.buyout_each.to_string(), bucket.quantity.to_string()]);
    }
    t
}

pub fn price_averages(averages: &[PriceAverage]) -> Table {
    let mut t = table(&["Item", "Qty now", "Qty avg", "P05 now", "P05 avg", "P05 %", "P50 now", "P50 avg", "P50 %"]);
    for a in averages {
        t.add_row(vec![
            a.item_id.to_string(),
            a.quantity_current.to_string(),
            a.quantity_average.to_string(),
            a.p05_current.to_string(),
            a.p05_average.to_string(),
            format!("{:.1}", a.p05_percent),
            a.p50_current.to_string(),
            a.p50_average.to_string(),
            format!("{:.1}", a.p50_percent),
        ]);
    }
    t
}
