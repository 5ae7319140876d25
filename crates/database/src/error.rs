use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database operation failed: {0}")]
    QueryError(#[from] sqlx::Error),

    #[error("Database migration failed: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// Staging rows into the shadow table failed. The live table is untouched
    /// but the shadow table may hold a partial dataset until the next replace.
    #[error("Failed to stage rows into the shadow table of {table}: {source}")]
    Staging {
        table: &'static str,
        #[source]
        source: sqlx::Error,
    },

    #[error("Batch size must be between 1 and {max}, got {0}", max = crate::batch::MAX_BATCH_SIZE)]
    InvalidBatchSize(usize),

    #[error("The requested data was not found in the database.")]
    NotFound,
}
