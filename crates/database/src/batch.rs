use crate::error::DbError;
use std::num::NonZeroUsize;

/// Upper bound on rows per multi-row statement.
///
/// `price_averages` has 24 columns; 2000 rows is 48000 binds, under the
/// PostgreSQL protocol limit of 65535.
pub const MAX_BATCH_SIZE: usize = 2000;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

const DEFAULT: NonZeroUsize = match NonZeroUsize::new(DEFAULT_BATCH_SIZE) {
    Some(n) => n,
    None => panic!("DEFAULT_BATCH_SIZE must be non-zero"),
};

/// Number of rows sent per INSERT statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSize(NonZeroUsize);

impl BatchSize {
    pub fn new(rows: usize) -> Result<Self, DbError> {
        match NonZeroUsize::new(rows) {
            Some(n) if rows <= MAX_BATCH_SIZE => Ok(Self(n)),
            _ => Err(DbError::InvalidBatchSize(rows)),
        }
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// How many statements a write of `len` rows is split into.
    pub fn chunk_count(&self, len: usize) -> usize {
        len.div_ceil(self.get())
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self(DEFAULT)
    }
}
