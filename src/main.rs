use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use configuration::{DatabaseSettings, LogFormat};
use core_types::{
    Auction, AuctionHouse, CurrentAuctionSort, Item, PriceAverage, PriceAverageOrder,
    PriceDistribution, Realm, SortDirection,
};
use database::{connect, run_migrations, BatchSize, DbRepository, PoolSettings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};

mod output;

/// The main entry point for the auctions data tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file, if there is one
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = configuration::load_config_from(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    let _log_guard = configuration::logging::init(&config.logging)?;

    let (settings, batch_size) = database_settings(&config.database)?;
    let pool = connect(&config.database.url, &settings).await?;
    let repo = DbRepository::new(pool).with_batch_size(batch_size);

    // Execute the appropriate command
    let result = run(cli.command, &repo, cli.json).await;
    if let Err(e) = &result {
        tracing::error!(error = ?e, "Command failed.");
    }
    result
}

/// Turns the loaded settings into pool options and a checked batch size.
fn database_settings(db: &DatabaseSettings) -> anyhow::Result<(PoolSettings, BatchSize)> {
    let settings = PoolSettings {
        max_connections: db.max_connections,
        acquire_timeout: db.acquire_timeout(),
    };
    let batch_size = BatchSize::new(db.batch_size).context("invalid database.batch_size")?;
    Ok((settings, batch_size))
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Query and maintain the auction-house price database.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file. Missing files are ignored.
    #[arg(long, global = true, default_value = configuration::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print results as JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,

    /// Override the configured log line format.
    #[arg(long, global = true, value_enum)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending schema migrations.
    Migrate,
    /// List all realms.
    Realms,
    /// List all auction houses.
    AuctionHouses,
    /// Show a single item.
    Item {
        #[arg(long)]
        id: i32,
    },
    /// Fuzzy search items by name.
    Search {
        #[arg(long)]
        name: String,
        #[arg(long, default_value_t = 10)]
        limit: i64,
    },
    /// Show the most recent snapshots of one item, newest first.
    History {
        #[arg(long)]
        interval: i16,
        #[command(flatten)]
        market: Market,
        #[arg(long)]
        item: i32,
        #[arg(long, default_value_t = 24)]
        limit: i64,
    },
    /// List current auctions on a realm and auction house.
    Current {
        #[command(flatten)]
        market: Market,
        /// Sort column: `quantity` or `p50`. Anything else sorts by quantity.
        #[arg(long, default_value = "quantity")]
        sort: String,
        /// `asc` or `desc`. Anything else sorts ascending.
        #[arg(long, default_value = "asc")]
        direction: String,
        #[command(flatten)]
        page: Page,
    },
    /// Show the price histogram of one item.
    Distribution {
        #[command(flatten)]
        market: Market,
        #[arg(long)]
        item: i32,
    },
    /// List items by how their prices compare to the historical average.
    Averages {
        #[command(flatten)]
        market: Market,
        /// `low` (cheapest relative to average first) or `high`.
        #[arg(long, default_value = "low")]
        order: String,
        #[command(flatten)]
        page: Page,
    },
    /// Load a JSON array of records from a file.
    Load {
        #[arg(value_enum)]
        kind: LoadKind,
        file: PathBuf,
    },
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct Market {
    #[arg(long)]
    realm: i16,
    #[arg(long)]
    auction_house: i16,
}

#[derive(clap::Args, Debug, Clone, Copy)]
struct Page {
    #[arg(long, default_value_t = 0)]
    offset: i64,
    #[arg(long, default_value_t = 50)]
    limit: i64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    /// Upsert items.
    Items,
    /// Upsert realms.
    Realms,
    /// Upsert auction houses.
    AuctionHouses,
    /// Append historical snapshots.
    Auctions,
    /// Replace the current-auction table with the given snapshots.
    CurrentAuctions,
    /// Replace the price distribution table.
    PriceDistributions,
    /// Replace the price average table.
    PriceAverages,
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn run(command: Commands, repo: &DbRepository, json: bool) -> anyhow::Result<()> {
    match command {
        Commands::Migrate => {
            run_migrations(repo.pool()).await?;
            println!("Migrations applied.");
        }
        Commands::Realms => {
            let realms = repo.get_realms().await?;
            emit(json, &realms, output::realms(&realms))?;
        }
        Commands::AuctionHouses => {
            let houses = repo.get_auction_houses().await?;
            emit(json, &houses, output::auction_houses(&houses))?;
        }
        Commands::Item { id } => {
            let item = repo.get_item(id).await?;
            emit(json, &item, output::item(&item))?;
        }
        Commands::Search { name, limit } => {
            let items = repo.get_similar_items(&name, limit).await?;
            emit(json, &items, output::item_summaries(&items))?;
        }
        Commands::History { interval, market, item, limit } => {
            let auctions = repo
                .get_auctions(interval, market.realm, market.auction_house, item, limit)
                .await?;
            emit(json, &auctions, output::auctions(&auctions))?;
        }
        Commands::Current { market, sort, direction, page } => {
            let sort = CurrentAuctionSort::from_param(&sort);
            let direction = SortDirection::from_param(&direction);
            let listings = repo
                .get_current_auctions(
                    market.realm,
                    market.auction_house,
                    sort,
                    direction,
                    page.offset,
                    page.limit,
                )
                .await?;
            let total = repo
                .count_current_auctions(market.realm, market.auction_house)
                .await?;
            emit(json, &listings, output::current_auctions(&listings))?;
            if !json {
                println!("{} of {} items (sorted by {} {})", listings.len(), total, sort, direction);
            }
        }
        Commands::Distribution { market, item } => {
            let buckets = repo
                .get_price_distributions(market.realm, market.auction_house, item)
                .await?;
            emit(json, &buckets, output::price_distributions(&buckets))?;
        }
        Commands::Averages { market, order, page } => {
            let order = PriceAverageOrder::from_param(&order);
            let averages = repo
                .get_price_averages(market.realm, market.auction_house, order, page.offset, page.limit)
                .await?;
            emit(json, &averages, output::price_averages(&averages))?;
        }
        Commands::Load { kind, file } => handle_load(repo, kind, &file).await?,
    }
    Ok(())
}

/// Reads `file` as a JSON array and hands it to the matching write operation.
async fn handle_load(repo: &DbRepository, kind: LoadKind, file: &Path) -> anyhow::Result<()> {
    let count = match kind {
        LoadKind::Items => {
            let items: Vec<Item> = read_records(file)?;
            repo.upsert_items(&items).await?;
            items.len()
        }
        LoadKind::Realms => {
            let realms: Vec<Realm> = read_records(file)?;
            repo.upsert_realms(&realms).await?;
            realms.len()
        }
        LoadKind::AuctionHouses => {
            let houses: Vec<AuctionHouse> = read_records(file)?;
            repo.upsert_auction_houses(&houses).await?;
            houses.len()
        }
        LoadKind::Auctions => {
            let auctions: Vec<Auction> = read_records(file)?;
            repo.insert_auctions(&auctions).await?;
            auctions.len()
        }
        LoadKind::CurrentAuctions => {
            let auctions: Vec<Auction> = read_records(file)?;
            repo.replace_current_auctions(&auctions).await?;
            auctions.len()
        }
        LoadKind::PriceDistributions => {
            let buckets: Vec<PriceDistribution> = read_records(file)?;
            repo.replace_price_distributions(&buckets).await?;
            buckets.len()
        }
        LoadKind::PriceAverages => {
            let averages: Vec<PriceAverage> = read_records(file)?;
            repo.replace_price_averages(&averages).await?;
            averages.len()
        }
    };

    tracing::info!(?kind, records = count, file = %file.display(), "Load complete.");
    println!("Loaded {count} records from {}", file.display());
    Ok(())
}

fn read_records<T: DeserializeOwned>(file: &Path) -> anyhow::Result<Vec<T>> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    parse_records(&raw).with_context(|| format!("parsing {}", file.display()))
}

fn parse_records<T: DeserializeOwned>(raw: &str) -> serde_json::Result<Vec<T>> {
    serde_json::from_str(raw)
}

fn emit<T: Serialize + ?Sized>(json: bool, value: &T, table: impl Display) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{table}");
    }
    Ok(())
}
