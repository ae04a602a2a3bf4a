//! Doctor service - ledger health checks
//!
//! Rank uniqueness is an invariant, so duplicates are errors. Rank gaps are
//! legal between a delete and the next reorder, so they only warn.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;

use crate::domain::result::Result;
use crate::ports::repository::{Repository, TransactionFilter};

/// Doctor service for health checks
pub struct DoctorService {
    repository: Arc<dyn Repository>,
}

impl DoctorService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Run all health checks
    pub async fn run_checks(&self) -> Result<DoctorResult> {
        let transactions = self
            .repository
            .get_transactions(&TransactionFilter::default())
            .await?;
        let mut checks = HashMap::new();

        // Duplicate ranks - an invariant violation
        let mut seen: HashMap<i64, i64> = HashMap::new();
        for tx in &transactions {
            *seen.entry(tx.sort_order).or_insert(0) += 1;
        }
        let duplicates: Vec<serde_json::Value> = seen
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(rank, count)| json!({ "rank": rank, "count": count }))
            .collect();
        checks.insert(
            "duplicate_ranks".to_string(),
            CheckResult {
                status: if duplicates.is_empty() { "pass" } else { "error" }.to_string(),
                message: if duplicates.is_empty() {
                    "All ranks are unique".to_string()
                } else {
                    format!("{} rank(s) are held by more than one transaction", duplicates.len())
                },
                details: if duplicates.is_empty() { None } else { Some(duplicates) },
            },
        );

        // Rank gaps - tolerated after deletes until the next reorder
        let total = transactions.len() as i64;
        let mut ranks: Vec<i64> = transactions.iter().map(|t| t.sort_order).collect();
        ranks.sort_unstable();
        ranks.dedup();
        let dense = ranks == (1..=total).collect::<Vec<i64>>();
        checks.insert(
            "rank_gaps".to_string(),
            CheckResult {
                status: if dense { "pass" } else { "warning" }.to_string(),
                message: if dense {
                    format!("Ranks are dense (1..{})", total)
                } else {
                    "Ranks have gaps; the next reorder will renumber them".to_string()
                },
                details: if dense {
                    None
                } else {
                    Some(vec![json!({
                        "transaction_count": total,
                        "lowest_rank": ranks.first(),
                        "highest_rank": ranks.last(),
                    })])
                },
            },
        );

        // Date sanity - before 1970 or more than a year in the future
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        let horizon = Utc::now().date_naive() + Duration::days(365);
        let insane: Vec<serde_json::Value> = transactions
            .iter()
            .filter(|t| t.date < epoch || t.date > horizon)
            .map(|t| {
                json!({
                    "transaction_id": t.id.to_string(),
                    "date": t.date.to_string(),
                    "category": t.category.as_str(),
                })
            })
            .collect();
        checks.insert(
            "date_sanity".to_string(),
            CheckResult {
                status: if insane.is_empty() { "pass" } else { "error" }.to_string(),
                message: if insane.is_empty() {
                    "All transaction dates are valid".to_string()
                } else {
                    format!("{} transaction(s) have unreasonable dates", insane.len())
                },
                details: if insane.is_empty() { None } else { Some(insane) },
            },
        );

        // Calculate summary
        let passed = checks.values().filter(|c| c.status == "pass").count() as i64;
        let warnings = checks.values().filter(|c| c.status == "warning").count() as i64;
        let errors = checks.values().filter(|c| c.status == "error").count() as i64;

        Ok(DoctorResult {
            checks,
            summary: DoctorSummary {
                passed,
                warnings,
                errors,
            },
        })
    }
}

#[derive(Debug, Serialize)]
pub struct DoctorResult {
    pub checks: HashMap<String, CheckResult>,
    pub summary: DoctorSummary,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Serialize)]
pub struct DoctorSummary {
    pub passed: i64,
    pub warnings: i64,
    pub errors: i64,
}
