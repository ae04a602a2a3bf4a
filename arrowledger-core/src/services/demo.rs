//! Demo service - seed sample ledger data
//!
//! Gives a fresh install something to look at without touching real books.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::result::Result;
use crate::domain::{Category, Transaction};
use crate::ports::repository::Repository;

const SAMPLE_NOTES: [&str; 5] = [
    "fuel",
    "weekly settlement",
    "tolls",
    "maintenance",
    "insurance installment",
];

/// Demo service for seeding sample data
pub struct DemoService {
    repository: Arc<dyn Repository>,
}

impl DemoService {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// Seed `count` sample transactions over the last ~four months.
    /// Deposits are positive, everything else negative.
    pub async fn seed(&self, count: usize) -> Result<usize> {
        let today = Utc::now().date_naive();
        let categories = Category::all();

        for _ in 0..count {
            let (category, cents, days_back, with_notes) = {
                let mut rng = rand::thread_rng();
                let category = categories[rng.gen_range(0..categories.len())];
                let cents: i64 = match category {
                    Category::Deposit => rng.gen_range(50_000..500_000),
                    _ => -rng.gen_range(2_000..150_000),
                };
                (category, cents, rng.gen_range(0..120), rng.gen_bool(0.6))
            };

            let date = today - Duration::days(days_back);
            let mut tx = Transaction::new(Uuid::new_v4(), date, category, Decimal::new(cents, 2));
            if with_notes {
                let idx = rand::thread_rng().gen_range(0..SAMPLE_NOTES.len());
                tx.notes = Some(SAMPLE_NOTES[idx].to_string());
            }
            self.repository.add_transaction(&tx).await?;
        }

        Ok(count)
    }
}
