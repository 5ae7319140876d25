//! Column mappings between the core row structs and their tables, plus the
//! multi-row INSERT builders shared by the append and replace paths.

use core_types::{Auction, AuctionHouse, CurrentAuction, Item, PriceAverage, PriceDistribution, Realm};
use sqlx::postgres::Postgres;
use sqlx::query_builder::Separated;
use sqlx::QueryBuilder;
use std::collections::HashMap;
use std::hash::Hash;

/// A struct that maps one-to-one onto the columns of a table.
pub trait TableRow {
    /// Name of the live table.
    const TABLE: &'static str;
    /// Insert column order. `bind_row` must bind in exactly this order.
    const COLUMNS: &'static [&'static str];
    /// Primary key columns, used as the upsert conflict target.
    const KEY: &'static [&'static str];

    /// Values of the `KEY` columns, in the same order.
    type Key: Eq + Hash;

    fn key(&self) -> Self::Key;

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>);
}

/// A derived table whose contents are always replaced wholesale through its
/// `<table>_temp` shadow.
pub trait ShadowTable: TableRow {}

/// Builds `INSERT INTO <table> (<columns>) VALUES (...), (...)` for `rows`.
pub fn insert_statement<'args, T: TableRow + 'args>(
    table: &str,
    rows: impl IntoIterator<Item = &'args T>,
) -> QueryBuilder<'args, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        table,
        T::COLUMNS.join(", ")
    ));
    builder.push_values(rows, |mut row, record| record.bind_row(&mut row));
    builder
}

/// Builds a multi-row insert into `T::TABLE` that overwrites every non-key
/// column on a primary-key conflict.
///
/// PostgreSQL refuses a statement that updates the same row twice, so `rows`
/// must not repeat a key; see [`last_per_key`].
pub fn upsert_statement<'args, T: TableRow + 'args>(
    rows: impl IntoIterator<Item = &'args T>,
) -> QueryBuilder<'args, Postgres> {
    let mut builder = insert_statement(T::TABLE, rows);
    builder.push(conflict_clause::<T>());
    builder
}

fn conflict_clause<T: TableRow>() -> String {
    let updates: Vec<String> = T::COLUMNS
        .iter()
        .filter(|column| !T::KEY.contains(column))
        .map(|column| format!("{column} = EXCLUDED.{column}"))
        .collect();

    format!(
        " ON CONFLICT ({}) DO UPDATE SET {}",
        T::KEY.join(", "),
        updates.join(", ")
    )
}

/// Drops every row whose key appears again later in `rows`, so the last
/// delivery of a key wins. Surviving rows keep their relative order.
pub fn last_per_key<T: TableRow>(rows: &[T]) -> Vec<&T> {
    let mut last: HashMap<T::Key, usize> = HashMap::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        last.insert(row.key(), index);
    }
    if last.len() == rows.len() {
        return rows.iter().collect();
    }

    rows.iter()
        .enumerate()
        .filter(|(index, row)| last.get(&row.key()) == Some(index))
        .map(|(_, row)| row)
        .collect()
}

impl TableRow for Realm {
    const TABLE: &'static str = "realms";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const KEY: &'static [&'static str] = &["id"];

    type Key = i16;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id).push_bind(self.name.as_str());
    }
}

impl TableRow for AuctionHouse {
    const TABLE: &'static str = "auction_houses";
    const COLUMNS: &'static [&'static str] = &["id", "name"];
    const KEY: &'static [&'static str] = &["id"];

    type Key = i16;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id).push_bind(self.name.as_str());
    }
}

impl TableRow for Item {
    const TABLE: &'static str = "items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "media_url",
        "rarity",
        "level",
        "required_level",
        "purchase_price",
        "sell_price",
    ];
    const KEY: &'static [&'static str] = &["id"];

    type Key = i32;

    fn key(&self) -> Self::Key {
        self.id
    }

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.id)
            .push_bind(self.name.as_str())
            .push_bind(self.media_url.as_str())
            .push_bind(self.rarity.as_str())
            .push_bind(self.level)
            .push_bind(self.required_level)
            .push_bind(self.purchase_price)
            .push_bind(self.sell_price);
    }
}

impl TableRow for Auction {
    const TABLE: &'static str = "auctions";
    const COLUMNS: &'static [&'static str] = &[
        "realm_id",
        "auction_house_id",
        "item_id",
        "interval",
        "timestamp",
        "quantity",
        "min",
        "p05",
        "p10",
        "p25",
        "p50",
        "p75",
        "p90",
        "max",
    ];
    const KEY: &'static [&'static str] =
        &["realm_id", "auction_house_id", "item_id", "interval", "timestamp"];

    type Key = (i16, i16, i32, i16, i32);

    fn key(&self) -> Self::Key {
        (
            self.realm_id,
            self.auction_house_id,
            self.item_id,
            self.interval,
            self.timestamp,
        )
    }

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.realm_id)
            .push_bind(self.auction_house_id)
            .push_bind(self.item_id)
            .push_bind(self.interval)
            .push_bind(self.timestamp)
            .push_bind(self.quantity)
            .push_bind(self.min)
            .push_bind(self.p05)
            .push_bind(self.p10)
            .push_bind(self.p25)
            .push_bind(self.p50)
            .push_bind(self.p75)
            .push_bind(self.p90)
            .push_bind(self.max);
    }
}

impl TableRow for CurrentAuction {
    const TABLE: &'static str = "current_auctions";
    const COLUMNS: &'static [&'static str] = &[
        "realm_id",
        "auction_house_id",
        "item_id",
        "quantity",
        "min",
        "p05",
        "p10",
        "p25",
        "p50",
        "p75",
        "p90",
        "max",
    ];
    const KEY: &'static [&'static str] = &["realm_id", "auction_house_id", "item_id"];

    type Key = (i16, i16, i32);

    fn key(&self) -> Self::Key {
        (self.realm_id, self.auction_house_id, self.item_id)
    }

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.realm_id)
            .push_bind(self.auction_house_id)
            .push_bind(self.item_id)
            .push_bind(self.quantity)
            .push_bind(self.min)
            .push_bind(self.p05)
            .push_bind(self.p10)
            .push_bind(self.p25)
            .push_bind(self.p50)
            .push_bind(self.p75)
            .push_bind(self.p90)
            .push_bind(self.max);
    }
}

impl ShadowTable for CurrentAuction {}

impl TableRow for PriceDistribution {
    const TABLE: &'static str = "price_distributions";
    const COLUMNS: &'static [&'static str] =
        &["realm_id", "auction_house_id", "item_id", "buyout_each", "quantity"];
    const KEY: &'static [&'static str] = &["realm_id", "auction_house_id", "item_id", "buyout_each"];

    type Key = (i16, i16, i32, i32);

    fn key(&self) -> Self::Key {
        (self.realm_id, self.auction_house_id, self.item_id, self.buyout_each)
    }

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.realm_id)
            .push_bind(self.auction_house_id)
            .push_bind(self.item_id)
            .push_bind(self.buyout_each)
            .push_bind(self.quantity);
    }
}

impl ShadowTable for PriceDistribution {}

impl TableRow for PriceAverage {
    const TABLE: &'static str = "price_averages";
    const COLUMNS: &'static [&'static str] = &[
        "realm_id",
        "auction_house_id",
        "item_id",
        "quantity_current",
        "quantity_average",
        "quantity_percent",
        "p05_current",
        "p05_average",
        "p05_percent",
        "p10_current",
        "p10_average",
        "p10_percent",
        "p25_current",
        "p25_average",
        "p25_percent",
        "p50_current",
        "p50_average",
        "p50_percent",
        "p75_current",
        "p75_average",
        "p75_percent",
        "p90_current",
        "p90_average",
        "p90_percent",
    ];
    const KEY: &'static [&'static str] = &["realm_id", "auction_house_id", "item_id"];

    type Key = (i16, i16, i32);

    fn key(&self) -> Self::Key {
        (self.realm_id, self.auction_house_id, self.item_id)
    }

    fn bind_row<'args>(&'args self, row: &mut Separated<'_, 'args, Postgres, &'static str>) {
        row.push_bind(self.realm_id)
            .push_bind(self.auction_house_id)
            .push_bind(self.item_id)
            .push_bind(self.quantity_current)
            .push_bind(self.quantity_average)
            .push_bind(self.quantity_percent)
            .push_bind(self.p05_current)
            .push_bind(self.p05_average)
            .push_bind(self.p05_percent)
            .push_bind(self.p10_current)
            .push_bind(self.p10_average)
            .push_bind(self.p10_percent)
            .push_bind(self.p25_current)
            .push_bind(self.p25_average)
            .push_bind(self.p25_percent)
            .push_bind(self.p50_current)
            .push_bind(self.p50_average)
            .push_bind(self.p50_percent)
            .push_bind(self.p75_current)
            .push_bind(self.p75_average)
            .push_bind(self.p75_percent)
            .push_bind(self.p90_current)
            .push_bind(self.p90_average)
            .push_bind(self.p90_percent);
    }
}

impl ShadowTable for PriceAverage {}
