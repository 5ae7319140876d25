use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The columns a current-auction listing may be ordered by.
///
/// This is an allow-list: the rendered `ORDER BY` clause is built only from
/// [`CurrentAuctionSort::as_sql`], never from caller-supplied text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurrentAuctionSort {
    #[default]
    Quantity,
    P50,
}

impl CurrentAuctionSort {
    /// Lenient parse for request parameters. Unknown values fall back to the default.
    pub fn from_param(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            CurrentAuctionSort::Quantity => "quantity",
            CurrentAuctionSort::P50 => "p50",
        }
    }
}

impl FromStr for CurrentAuctionSort {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "quantity" => Ok(CurrentAuctionSort::Quantity),
            "p50" => Ok(CurrentAuctionSort::P50),
            other => Err(CoreError::InvalidInput("sort".to_string(), other.to_string())),
        }
    }
}

impl fmt::Display for CurrentAuctionSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Lenient parse for request parameters. Unknown values fall back to ascending.
    pub fn from_param(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(CoreError::InvalidInput("direction".to_string(), other.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => f.write_str("asc"),
            SortDirection::Desc => f.write_str("desc"),
        }
    }
}

/// Ordering of the price-average listing on the `p05_percent` column.
///
/// `Low` lists the items furthest below their historical average first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceAverageOrder {
    #[default]
    Low,
    High,
}

impl PriceAverageOrder {
    pub fn from_param(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }

    pub fn direction(&self) -> SortDirection {
        match self {
            PriceAverageOrder::Low => SortDirection::Asc,
            PriceAverageOrder::High => SortDirection::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        self.direction().as_sql()
    }
}

impl FromStr for PriceAverageOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(PriceAverageOrder::Low),
            "high" => Ok(PriceAverageOrder::High),
            other => Err(CoreError::InvalidInput("order".to_string(), other.to_string())),
        }
    }
}

impl fmt::Display for PriceAverageOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceAverageOrder::Low => f.write_str("low"),
            PriceAverageOrder::High => f.write_str("high"),
        }
    }
}
