//! Integration tests against a live PostgreSQL instance.
//!
//! Run with `DATABASE_URL` pointing at a server where the test user may create
//! databases and the `pg_trgm` extension:
//! `cargo test -p database -- --ignored`

use core_types::{
    Auction, AuctionHouse, CurrentAuctionSort, Item, PriceAverage, PriceAverageOrder,
    PriceDistribution, Realm, SortDirection,
};
use database::replace::{stage_rows, swap_tables};
use database::{BatchSize, DbError, DbRepository};
use sqlx::PgPool;

fn item(id: i32, name: &str) -> Item {
    Item {
        id,
        name: name.to_string(),
        media_url: format!("https://media.example/{id}.jpg"),
        rarity: "COMMON".to_string(),
        level: 1,
        required_level: 0,
        purchase_price: 100,
        sell_price: 25,
    }
}

fn auction(item_id: i32, timestamp: i32, quantity: i32, p50: i32) -> Auction {
    Auction {
        realm_id: 1,
        auction_house_id: 2,
        item_id,
        interval: 1,
        timestamp,
        quantity,
        min: p50 - 10,
        p05: p50 - 8,
        p10: p50 - 6,
        p25: p50 - 3,
        p50,
        p75: p50 + 3,
        p90: p50 + 6,
        max: p50 + 10,
    }
}

fn distribution(item_id: i32, buyout_each: i32, quantity: i32) -> PriceDistribution {
    PriceDistribution {
        realm_id: 1,
        auction_house_id: 2,
        item_id,
        buyout_each,
        quantity,
    }
}

fn average(item_id: i32, p05_percent: f32) -> PriceAverage {
    PriceAverage {
        realm_id: 1,
        auction_house_id: 2,
        item_id,
        quantity_current: 10,
        quantity_average: 8,
        quantity_percent: 125.0,
        p05_current: 90,
        p05_average: 100,
        p05_percent,
        p10_current: 95,
        p10_average: 100,
        p10_percent: 95.0,
        p25_current: 100,
        p25_average: 100,
        p25_percent: 100.0,
        p50_current: 110,
        p50_average: 100,
        p50_percent: 110.0,
        p75_current: 120,
        p75_average: 100,
        p75_percent: 120.0,
        p90_current: 130,
        p90_average: 100,
        p90_percent: 130.0,
    }
}

async fn seeded_repo(pool: PgPool, batch: usize) -> DbRepository {
    let repo = DbRepository::new(pool).with_batch_size(BatchSize::new(batch).unwrap());
    repo.upsert_items(&[item(1, "Copper Ore"), item(2, "Tin Ore"), item(3, "Iron Ore")])
        .await
        .unwrap();
    repo
}

async fn count_rows(pool: &PgPool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await
        .unwrap()
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn replace_current_auctions_installs_exactly_the_new_dataset(pool: PgPool) {
    let repo = seeded_repo(pool.clone(), 2).await;

    repo.replace_current_auctions(&[auction(1, 100, 5, 50), auction(2, 100, 9, 70)])
        .await
        .unwrap();
    repo.replace_current_auctions(&[
        auction(1, 200, 6, 55),
        auction(2, 200, 3, 75),
        auction(3, 200, 1, 20),
    ])
    .await
    .unwrap();

    let listings = repo
        .get_current_auctions(1, 2, CurrentAuctionSort::Quantity, SortDirection::Asc, 0, 50)
        .await
        .unwrap();
    let rows: Vec<(i32, i32, i32)> = listings.iter().map(|l| (l.item_id, l.quantity, l.p50)).collect();
    assert_eq!(rows, vec![(3, 1, 20), (2, 3, 75), (1, 6, 55)]);
    assert_eq!(listings[2].item_name, "Copper Ore");

    assert_eq!(repo.count_current_auctions(1, 2).await.unwrap(), 3);
    assert_eq!(count_rows(&pool, "current_auctions_temp").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn replacing_with_an_empty_dataset_empties_the_live_table(pool: PgPool) {
    let repo = seeded_repo(pool.clone(), 10).await;
    repo.replace_current_auctions(&[auction(1, 100, 5, 50)]).await.unwrap();

    repo.replace_current_auctions(&[]).await.unwrap();

    assert_eq!(repo.count_current_auctions(1, 2).await.unwrap(), 0);
    assert_eq!(count_rows(&pool, "current_auctions_temp").await, 0);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn stale_shadow_rows_are_discarded_before_staging(pool: PgPool) {
    let repo = seeded_repo(pool.clone(), 10).await;
    repo.upsert_items(&[item(999, "Leftover")]).await.unwrap();
    sqlx::query("INSERT INTO current_auctions_temp (realm_id, auction_house_id, item_id, quantity) VALUES (1, 2, 999, 42)")
        .execute(&pool)
        .await
        .unwrap();

    repo.replace_current_auctions(&[auction(1, 100, 5, 50)]).await.unwrap();

    let listings = repo
        .get_current_auctions(1, 2, CurrentAuctionSort::Quantity, SortDirection::Asc, 0, 50)
        .await
        .unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].item_id, 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn failed_staging_leaves_the_live_table_untouched(pool: PgPool) {
    let repo = seeded_repo(pool.clone(), 10).await;
    repo.replace_price_distributions(&[distribution(1, 100, 4)]).await.unwrap();

    // Duplicate primary key inside one chunk makes the staging insert fail.
    let err = repo
        .replace_price_distributions(&[distribution(1, 200, 1), distribution(1, 200, 2)])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Staging { table: "price_distributions", .. }));

    let live = repo.get_price_distributions(1, 2, 1).await.unwrap();
    assert_eq!(live, vec![distribution(1, 100, 4)]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn price_distributions_are_ordered_by_buyout(pool: PgPool) {
    let repo = seeded_repo(pool, 2).await;
    let dataset = vec![
        distribution(1, 300, 1),
        distribution(1, 100, 7),
        distribution(1, 200, 2),
        distribution(2, 50, 9),
    ];

    repo.replace_price_distributions(&dataset).await.unwrap();

    let buyouts: Vec<i32> = repo
        .get_price_distributions(1, 2, 1)
        .await
        .unwrap()
        .into_iter()
        .map(|d| d.buyout_each)
        .collect();
    assert_eq!(buyouts, vec![100, 200, 300]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn price_averages_round_trip_and_sort_on_p05_percent(pool: PgPool) {
    let repo = seeded_repo(pool, 10).await;
    let dataset = vec![average(1, 80.5), average(2, 120.0), average(3, 99.0)];

    repo.replace_price_averages(&dataset).await.unwrap();

    let low = repo
        .get_price_averages(1, 2, PriceAverageOrder::Low, 0, 10)
        .await
        .unwrap();
    assert_eq!(low.iter().map(|a| a.item_id).collect::<Vec<_>>(), vec![1, 3, 2]);
    assert_eq!(low[0], dataset[0]);

    let high = repo
        .get_price_averages(1, 2, PriceAverageOrder::from_param("high"), 0, 2)
        .await
        .unwrap();
    assert_eq!(high.iter().map(|a| a.item_id).collect::<Vec<_>>(), vec![2, 3]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn unknown_sort_parameters_fall_back_to_quantity_ascending(pool: PgPool) {
    let repo = seeded_repo(pool, 10).await;
    repo.replace_current_auctions(&[
        auction(1, 100, 30, 10),
        auction(2, 100, 10, 30),
        auction(3, 100, 20, 20),
    ])
    .await
    .unwrap();

    let fallback = repo
        .get_current_auctions(
            1,
            2,
            CurrentAuctionSort::from_param("name; DROP TABLE items"),
            SortDirection::from_param("sideways"),
            0,
            10,
        )
        .await
        .unwrap();
    assert_eq!(fallback.iter().map(|l| l.item_id).collect::<Vec<_>>(), vec![2, 3, 1]);

    let by_p50 = repo
        .get_current_auctions(1, 2, CurrentAuctionSort::P50, SortDirection::Desc, 1, 1)
        .await
        .unwrap();
    assert_eq!(by_p50.len(), 1);
    assert_eq!(by_p50[0].item_id, 3);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn insert_auctions_chunks_and_tolerates_redelivery(pool: PgPool) {
    let repo = seeded_repo(pool.clone(), 3).await;
    let history: Vec<Auction> = (0..10).map(|i| auction(1, 1_000 + i * 60, 5, 100 + i)).collect();

    repo.insert_auctions(&history).await.unwrap();
    // Redelivering the latest interval with new figures overwrites it.
    repo.insert_auctions(&[auction(1, 1_540, 8, 999)]).await.unwrap();

    assert_eq!(count_rows(&pool, "auctions").await, 10);

    let latest = repo.get_auctions(1, 1, 2, 1, 3).await.unwrap();
    let timestamps: Vec<i32> = latest.iter().map(|a| a.timestamp).collect();
    assert_eq!(timestamps, vec![1_540, 1_480, 1_420]);
    assert_eq!(latest[0].quantity, 8);
    assert_eq!(latest[0].p50, 999);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn upsert_item_keeps_the_latest_values(pool: PgPool) {
    let repo = DbRepository::new(pool);

    repo.upsert_item(&item(7, "Linen Cloth")).await.unwrap();
    let mut renamed = item(7, "Linen Cloth (old)");
    renamed.sell_price = 1;
    repo.upsert_item(&renamed).await.unwrap();

    assert_eq!(repo.get_item(7).await.unwrap(), renamed);
    assert!(matches!(repo.get_item(8).await, Err(DbError::NotFound)));

    let ids = repo.get_item_ids().await.unwrap();
    assert_eq!(ids.len(), 1);
    assert!(ids.contains(&7));
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn similar_items_rank_closest_names_first(pool: PgPool) {
    let repo = DbRepository::new(pool);
    repo.upsert_items(&[
        item(1, "Copper Ore"),
        item(2, "Copper Bar"),
        item(3, "Runecloth"),
    ])
    .await
    .unwrap();

    let matches = repo.get_similar_items("Copper Ore", 5).await.unwrap();
    assert_eq!(matches.first().map(|m| m.id), Some(1));
    assert!(matches.iter().all(|m| m.id != 3));

    let limited = repo.get_similar_items("Copper", 1).await.unwrap();
    assert_eq!(limited.len(), 1);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn reference_data_upserts_overwrite_names(pool: PgPool) {
    let repo = DbRepository::new(pool).with_batch_size(BatchSize::new(1).unwrap());

    repo.upsert_realms(&[
        Realm { id: 2, name: "Gehennas".into() },
        Realm { id: 1, name: "Firemaw".into() },
    ])
    .await
    .unwrap();
    repo.upsert_realms(&[Realm { id: 1, name: "Firemaw EU".into() }]).await.unwrap();
    repo.upsert_auction_houses(&[
        AuctionHouse { id: 2, name: "Alliance".into() },
        AuctionHouse { id: 6, name: "Horde".into() },
    ])
    .await
    .unwrap();

    let realms = repo.get_realms().await.unwrap();
    assert_eq!(
        realms,
        vec![
            Realm { id: 1, name: "Firemaw EU".into() },
            Realm { id: 2, name: "Gehennas".into() },
        ]
    );
    assert_eq!(repo.get_auction_houses().await.unwrap().len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn repeated_keys_in_one_call_keep_the_last_delivery(pool: PgPool) {
    for batch in [1, 10] {
        sqlx::query("TRUNCATE auctions, items").execute(&pool).await.unwrap();
        let repo = DbRepository::new(pool.clone()).with_batch_size(BatchSize::new(batch).unwrap());

        repo.insert_auctions(&[auction(1, 100, 5, 50), auction(1, 100, 8, 80)])
            .await
            .unwrap();
        let stored = repo.get_auctions(1, 1, 2, 1, 10).await.unwrap();
        assert_eq!(stored, vec![auction(1, 100, 8, 80)], "batch size {batch}");

        repo.upsert_items(&[item(7, "Linen Cloth"), item(8, "Wool Cloth"), item(7, "Linen Cloth (new)")])
            .await
            .unwrap();
        assert_eq!(repo.get_item(7).await.unwrap().name, "Linen Cloth (new)", "batch size {batch}");
        assert_eq!(repo.get_item_ids().await.unwrap().len(), 2);
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn current_auctions_keep_the_newest_snapshot_per_item(pool: PgPool) {
    let repo = seeded_repo(pool, 10).await;

    repo.replace_current_auctions(&[
        auction(1, 160, 8, 80),
        auction(2, 100, 3, 30),
        auction(1, 100, 5, 50),
    ])
    .await
    .unwrap();

    let listings = repo
        .get_current_auctions(1, 2, CurrentAuctionSort::Quantity, SortDirection::Asc, 0, 50)
        .await
        .unwrap();
    let rows: Vec<(i32, i32, i32)> = listings.iter().map(|l| (l.item_id, l.quantity, l.p50)).collect();
    assert_eq!(rows, vec![(2, 3, 30), (1, 8, 80)]);
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn final_contents_do_not_depend_on_batch_size(pool: PgPool) {
    let history: Vec<Auction> = (0..7)
        .map(|i| auction(1 + i % 3, 1_000 + (i / 3) * 60, 5 + i, 100 + i))
        .chain([auction(2, 1_000, 99, 999)])
        .collect();
    let buckets: Vec<PriceDistribution> = (0..7).map(|i| distribution(1 + i % 2, 100 + i * 25, i + 1)).collect();

    let mut results = Vec::new();
    for batch in [1, 3, 1000] {
        sqlx::query("TRUNCATE auctions").execute(&pool).await.unwrap();
        let repo = seeded_repo(pool.clone(), batch).await;

        repo.insert_auctions(&history).await.unwrap();
        repo.replace_price_distributions(&buckets).await.unwrap();

        let auctions: Vec<Auction> = sqlx::query_as(
            "SELECT * FROM auctions ORDER BY item_id, timestamp",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let mut distributions = repo.get_price_distributions(1, 2, 1).await.unwrap();
        distributions.extend(repo.get_price_distributions(1, 2, 2).await.unwrap());
        results.push((batch, auctions, distributions));
    }

    let (_, auctions, distributions) = &results[0];
    assert_eq!(auctions.len(), 7);
    assert!(auctions.contains(&auction(2, 1_000, 99, 999)));
    assert_eq!(distributions.len(), buckets.len());
    for (batch, other_auctions, other_distributions) in &results[1..] {
        assert_eq!(other_auctions, auctions, "auctions at batch size {batch}");
        assert_eq!(other_distributions, distributions, "distributions at batch size {batch}");
    }
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requires a PostgreSQL server (DATABASE_URL)"]
async fn staged_rows_stay_invisible_until_the_swap(pool: PgPool) {
    let repo = seeded_repo(pool.clone(), 2).await;
    repo.replace_price_distributions(&[distribution(1, 100, 4)]).await.unwrap();

    let staged = vec![distribution(1, 150, 1), distribution(1, 175, 2), distribution(1, 200, 3)];
    stage_rows(&pool, repo.batch_size(), &staged).await.unwrap();

    assert_eq!(repo.get_price_distributions(1, 2, 1).await.unwrap(), vec![distribution(1, 100, 4)]);
    assert_eq!(count_rows(&pool, "price_distributions_temp").await, 3);

    swap_tables::<PriceDistribution>(&pool).await.unwrap();

    assert_eq!(repo.get_price_distributions(1, 2, 1).await.unwrap(), staged);
    assert_eq!(count_rows(&pool, "price_distributions_temp").await, 0);
}
