//! Aggregation service - grouped sums over the ledger
//!
//! Grouping and summation happen in Rust over repository-filtered rows;
//! month keys are UTC calendar months computed from the transaction date.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::domain::dates::parse_date_dmy;
use crate::domain::result::{Error, Result};
use crate::ports::repository::{Repository, TransactionFilter};

/// Supported grouping keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateBy {
    Month,
    Category,
}

impl std::str::FromStr for AggregateBy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "month" => Ok(AggregateBy::Month),
            "category" => Ok(AggregateBy::Category),
            _ => Err(Error::validation("Invalid aggregation type")),
        }
    }
}

/// One aggregation group
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    /// `YYYY-MM` for month grouping, the category name otherwise
    pub key: String,
    pub total_amount: Decimal,
    pub count: i64,
}

/// Aggregation service
pub struct AggregationService {
    repository: Arc<dyn Repository>,
}

impl AggregationService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Group the ledger by month or category, summing amounts and counting
    /// rows per group. Date bounds arrive as `DD/MM/YYYY` strings.
    pub async fn aggregate(
        &self,
        by: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Vec<AggregateRow>> {
        let by = by.parse::<AggregateBy>()?;

        let mut filter = TransactionFilter::default();
        if let Some(start) = start_date {
            filter.start_date =
                Some(parse_date_dmy(start).ok_or_else(|| Error::validation("Invalid startDate"))?);
        }
        if let Some(end) = end_date {
            filter.end_date =
                Some(parse_date_dmy(end).ok_or_else(|| Error::validation("Invalid endDate"))?);
        }

        let transactions = self.repository.get_transactions(&filter).await?;

        let mut groups: BTreeMap<String, (Decimal, i64)> = BTreeMap::new();
        for tx in &transactions {
            let key = match by {
                AggregateBy::Month => tx.month_key(),
                AggregateBy::Category => tx.category.as_str().to_string(),
            };
            let entry = groups.entry(key).or_insert((Decimal::ZERO, 0));
            entry.0 += tx.amount;
            entry.1 += 1;
        }

        Ok(groups
            .into_iter()
            .map(|(key, (total_amount, count))| AggregateRow {
                key,
                total_amount,
                count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_by_parsing() {
        assert_eq!("month".parse::<AggregateBy>().unwrap(), AggregateBy::Month);
        assert_eq!(
            "category".parse::<AggregateBy>().unwrap(),
            AggregateBy::Category
        );
        assert!("week".parse::<AggregateBy>().is_err());
        assert!("Month".parse::<AggregateBy>().is_err());
    }
}
