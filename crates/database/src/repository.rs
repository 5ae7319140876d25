use crate::batch::BatchSize;
use crate::replace::replace_table;
use crate::tables::{last_per_key, upsert_statement, TableRow};
use crate::DbError;
use core_types::{
    Auction, AuctionHouse, CurrentAuction, CurrentAuctionListing, CurrentAuctionSort, Item,
    ItemSummary, PriceAverage, PriceAverageOrder, PriceDistribution, Realm, SortDirection,
};
use sqlx::postgres::PgPool;
use std::collections::{HashMap, HashSet};

/// The `DbRepository` provides a high-level, application-specific interface
/// to the auction database. It encapsulates all SQL queries and data access logic.
#[derive(Debug, Clone)]
pub struct DbRepository {
    pool: PgPool,
    batch_size: BatchSize,
}

impl DbRepository {
    /// Creates a new `DbRepository` with a shared database connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            batch_size: BatchSize::default(),
        }
    }

    /// Overrides the number of rows written per INSERT statement.
    pub fn with_batch_size(mut self, batch_size: BatchSize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn batch_size(&self) -> BatchSize {
        self.batch_size
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // --- Reference data ---

    pub async fn get_realms(&self) -> Result<Vec<Realm>, DbError> {
        let realms = sqlx::query_as::<_, Realm>("SELECT id, name FROM realms ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(realms)
    }

    pub async fn get_auction_houses(&self) -> Result<Vec<AuctionHouse>, DbError> {
        let auction_houses =
            sqlx::query_as::<_, AuctionHouse>("SELECT id, name FROM auction_houses ORDER BY id")
                .fetch_all(&self.pool)
                .await?;
        Ok(auction_houses)
    }

    /// Upserts realms in batches; an existing id gets its name overwritten.
    pub async fn upsert_realms(&self, realms: &[Realm]) -> Result<(), DbError> {
        self.upsert_in_batches(realms).await
    }

    pub async fn upsert_auction_houses(&self, auction_houses: &[AuctionHouse]) -> Result<(), DbError> {
        self.upsert_in_batches(auction_houses).await
    }

    // --- Items ---

    /// Fetches a single item by id.
    pub async fn get_item(&self, item_id: i32) -> Result<Item, DbError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            SELECT id, name, media_url, rarity, level, required_level, purchase_price, sell_price
            FROM items
            WHERE id = $1
            "#,
        )
        .bind(item_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| if let sqlx::Error::RowNotFound = e { DbError::NotFound } else { e.into() })?;

        Ok(item)
    }

    /// Returns every known item id, for cheap membership checks during ingestion.
    pub async fn get_item_ids(&self) -> Result<HashSet<i32>, DbError> {
        let ids: Vec<i32> = sqlx::query_scalar("SELECT id FROM items")
            .fetch_all(&self.pool)
            .await?;
        Ok(ids.into_iter().collect())
    }

    /// Fuzzy name search using `pg_trgm`, best match first.
    pub async fn get_similar_items(&self, name: &str, limit: i64) -> Result<Vec<ItemSummary>, DbError> {
        let items = sqlx::query_as::<_, ItemSummary>(
            r#"
            SELECT id, name, media_url, rarity
            FROM items
            WHERE name % $1
            ORDER BY similarity(name, $1) DESC
            LIMIT $2
            "#,
        )
        .bind(name)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Inserts an item, overwriting every column of an existing row with the same id.
    pub async fn upsert_item(&self, item: &Item) -> Result<(), DbError> {
        upsert_statement(std::slice::from_ref(item))
            .build()
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn upsert_items(&self, items: &[Item]) -> Result<(), DbError> {
        self.upsert_in_batches(items).await
    }

    // --- Historical auctions ---

    /// Fetches the most recent snapshots of one item, newest first.
    pub async fn get_auctions(
        &self,
        interval: i16,
        realm_id: i16,
        auction_house_id: i16,
        item_id: i32,
        limit: i64,
    ) -> Result<Vec<Auction>, DbError> {
        let auctions = sqlx::query_as::<_, Auction>(
            r#"
            SELECT realm_id, auction_house_id, item_id, interval, timestamp,
                   quantity, min, p05, p10, p25, p50, p75, p90, max
            FROM auctions
            WHERE interval = $1 AND realm_id = $2 AND auction_house_id = $3 AND item_id = $4
            ORDER BY timestamp DESC
            LIMIT $5
            "#,
        )
        .bind(interval)
        .bind(realm_id)
        .bind(auction_house_id)
        .bind(item_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(auctions)
    }

    /// Appends snapshots in batches, each batch in its own transaction.
    ///
    /// A snapshot that already exists for the same sampling key is overwritten,
    /// so redelivery of an interval is harmless.
    pub async fn insert_auctions(&self, auctions: &[Auction]) -> Result<(), DbError> {
        self.upsert_in_batches(auctions).await
    }

    // --- Current auctions ---

    /// Lists current auctions on one realm/auction house joined with item metadata.
    ///
    /// Only the allow-listed column and direction are spliced into the query.
    pub async fn get_current_auctions(
        &self,
        realm_id: i16,
        auction_house_id: i16,
        sort: CurrentAuctionSort,
        direction: SortDirection,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<CurrentAuctionListing>, DbError> {
        let query = format!(
            r#"
            SELECT ca.realm_id, ca.auction_house_id, ca.item_id,
                   items.name AS item_name, items.media_url AS item_media_url, items.rarity AS item_rarity,
                   ca.quantity, ca.min, ca.p05, ca.p10, ca.p25, ca.p50, ca.p75, ca.p90, ca.max
            FROM current_auctions AS ca
            INNER JOIN items ON ca.item_id = items.id
            WHERE ca.realm_id = $1 AND ca.auction_house_id = $2
            ORDER BY ca.{} {}, ca.item_id
            OFFSET $3 LIMIT $4
            "#,
            sort.as_sql(),
            direction.as_sql()
        );

        let listings = sqlx::query_as::<_, CurrentAuctionListing>(&query)
            .bind(realm_id)
            .bind(auction_house_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(listings)
    }

    pub async fn count_current_auctions(&self, realm_id: i16, auction_house_id: i16) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM current_auctions WHERE realm_id = $1 AND auction_house_id = $2",
        )
        .bind(realm_id)
        .bind(auction_house_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Replaces `current_auctions` with the latest snapshot of each item.
    ///
    /// `auctions` may hold several snapshots per realm, auction house and
    /// item; only the one with the highest timestamp is kept.
    pub async fn replace_current_auctions(&self, auctions: &[Auction]) -> Result<(), DbError> {
        let current = latest_snapshots(auctions);
        replace_table(&self.pool, self.batch_size, &current).await
    }

    // --- Price distributions ---

    pub async fn get_price_distributions(
        &self,
        realm_id: i16,
        auction_house_id: i16,
        item_id: i32,
    ) -> Result<Vec<PriceDistribution>, DbError> {
        let distributions = sqlx::query_as::<_, PriceDistribution>(
            r#"
            SELECT realm_id, auction_house_id, item_id, buyout_each, quantity
            FROM price_distributions
            WHERE realm_id = $1 AND auction_house_id = $2 AND item_id = $3
            ORDER BY buyout_each
            "#,
        )
        .bind(realm_id)
        .bind(auction_house_id)
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(distributions)
    }

    pub async fn replace_price_distributions(&self, distributions: &[PriceDistribution]) -> Result<(), DbError> {
        replace_table(&self.pool, self.batch_size, distributions).await
    }

    // --- Price averages ---

    /// Lists price averages ordered by how far `p05` sits from its historical average.
    pub async fn get_price_averages(
        &self,
        realm_id: i16,
        auction_house_id: i16,
        order: PriceAverageOrder,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<PriceAverage>, DbError> {
        let query = format!(
            r#"
            SELECT realm_id, auction_house_id, item_id,
                   quantity_current, quantity_average, quantity_percent,
                   p05_current, p05_average, p05_percent,
                   p10_current, p10_average, p10_percent,
                   p25_current, p25_average, p25_percent,
                   p50_current, p50_average, p50_percent,
                   p75_current, p75_average, p75_percent,
                   p90_current, p90_average, p90_percent
            FROM price_averages
            WHERE realm_id = $1 AND auction_house_id = $2
            ORDER BY p05_percent {}, item_id
            OFFSET $3 LIMIT $4
            "#,
            order.as_sql()
        );

        let averages = sqlx::query_as::<_, PriceAverage>(&query)
            .bind(realm_id)
            .bind(auction_house_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(averages)
    }

    pub async fn replace_price_averages(&self, averages: &[PriceAverage]) -> Result<(), DbError> {
        replace_table(&self.pool, self.batch_size, averages).await
    }

    /// Writes `rows` in chunks of `batch_size`, one transaction per chunk.
    /// Chunks are sent sequentially; a failure stops at the failing chunk and
    /// earlier chunks stay committed.
    ///
    /// A key delivered more than once keeps its last values, whatever the batch size.
    async fn upsert_in_batches<T: TableRow>(&self, rows: &[T]) -> Result<(), DbError> {
        let rows = last_per_key(rows);
        for chunk in rows.chunks(self.batch_size.get()) {
            let mut tx = self.pool.begin().await?;
            upsert_statement(chunk.iter().copied())
                .build()
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
        }

        tracing::debug!(
            table = T::TABLE,
            rows = rows.len(),
            chunks = self.batch_size.chunk_count(rows.len()),
            "Batched upsert complete."
        );
        Ok(())
    }
}

/// Projects each realm, auction house and item onto its newest snapshot.
/// On equal timestamps the later entry wins. Output follows the order in
/// which each item first appears.
fn latest_snapshots(auctions: &[Auction]) -> Vec<CurrentAuction> {
    let mut latest: HashMap<(i16, i16, i32), usize> = HashMap::with_capacity(auctions.len());
    let mut order = Vec::new();
    for (index, auction) in auctions.iter().enumerate() {
        let key = (auction.realm_id, auction.auction_house_id, auction.item_id);
        match latest.get_mut(&key) {
            Some(best) if auctions[*best].timestamp <= auction.timestamp => *best = index,
            Some(_) => {}
            None => {
                latest.insert(key, index);
                order.push(key);
            }
        }
    }

    order
        .iter()
        .filter_map(|key| latest.get(key))
        .map(|&index| CurrentAuction::from(&auctions[index]))
        .collect()
}
