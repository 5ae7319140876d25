//! Atomic bulk replacement of derived tables.
//!
//! Every replaceable table `T` has a twin `T_temp` with the same schema. New
//! rows are staged into `T_temp` outside of any transaction, then a single
//! transaction renames `T -> T_temp2`, `T_temp -> T`, `T_temp2 -> T_temp` and
//! truncates the new `T_temp`. Renames only touch the catalog, so the swap
//! takes the same time whatever the size of the dataset, and readers of `T`
//! see either the old rows or the new ones.

use crate::batch::BatchSize;
use crate::error::DbError;
use crate::tables::{insert_statement, ShadowTable};
use sqlx::PgPool;

pub fn shadow_name(table: &str) -> String {
    format!("{table}_temp")
}

fn parked_name(table: &str) -> String {
    format!("{table}_temp2")
}

/// The four statements run inside the swap transaction, in order.
pub fn swap_statements(table: &str) -> [String; 4] {
    let shadow = shadow_name(table);
    let parked = parked_name(table);
    [
        format!("ALTER TABLE {table} RENAME TO {parked}"),
        format!("ALTER TABLE {shadow} RENAME TO {table}"),
        format!("ALTER TABLE {parked} RENAME TO {shadow}"),
        format!("TRUNCATE TABLE {shadow}"),
    ]
}

/// Replaces the full contents of `T::TABLE` with `rows`.
///
/// The shadow table is truncated before staging so that rows left behind by
/// an earlier failed stage can never be swapped in. A staging failure is
/// reported as [`DbError::Staging`]; the live table is untouched in that case.
pub async fn replace_table<T: ShadowTable>(
    pool: &PgPool,
    batch_size: BatchSize,
    rows: &[T],
) -> Result<(), DbError> {
    stage_rows(pool, batch_size, rows).await?;
    swap_tables::<T>(pool).await?;

    tracing::info!(table = T::TABLE, rows = rows.len(), "Table contents replaced.");
    Ok(())
}

/// Empties the shadow of `T::TABLE` and fills it with `rows`, one multi-row
/// INSERT per chunk. Only the shadow table is written.
pub async fn stage_rows<T: ShadowTable>(
    pool: &PgPool,
    batch_size: BatchSize,
    rows: &[T],
) -> Result<(), DbError> {
    let table = T::TABLE;
    let shadow = shadow_name(table);
    let staging = |source: sqlx::Error| DbError::Staging { table, source };

    sqlx::query(&format!("TRUNCATE TABLE {shadow}"))
        .execute(pool)
        .await
        .map_err(staging)?;

    for (index, chunk) in rows.chunks(batch_size.get()).enumerate() {
        insert_statement(&shadow, chunk)
            .build()
            .execute(pool)
            .await
            .map_err(staging)?;
        tracing::trace!(table, chunk = index, rows = chunk.len(), "Staged chunk.");
    }

    tracing::debug!(
        table,
        rows = rows.len(),
        chunks = batch_size.chunk_count(rows.len()),
        "Staging complete."
    );
    Ok(())
}

/// Makes the staged shadow of `T::TABLE` live in one transaction and leaves
/// an empty shadow behind.
pub async fn swap_tables<T: ShadowTable>(pool: &PgPool) -> Result<(), DbError> {
    // Dropping `tx` on any early return rolls the renames back.
    let mut tx = pool.begin().await?;
    for statement in swap_statements(T::TABLE) {
        sqlx::query(&statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_moves_staged_rows_live_then_clears_the_old_ones() {
        let statements = swap_statements("current_auctions");
        assert_eq!(
            statements,
            [
                "ALTER TABLE current_auctions RENAME TO current_auctions_temp2",
                "ALTER TABLE current_auctions_temp RENAME TO current_auctions",
                "ALTER TABLE current_auctions_temp2 RENAME TO current_auctions_temp",
                "TRUNCATE TABLE current_auctions_temp",
            ]
        );
    }

    #[test]
    fn shadow_name_is_suffixed() {
        assert_eq!(shadow_name("price_averages"), "price_averages_temp");
        assert_eq!(parked_name("price_averages"), "price_averages_temp2");
    }
}
