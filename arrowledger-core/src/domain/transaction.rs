//! Transaction domain model

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use uuid::Uuid;

use crate::domain::result::{Error, Result};

/// Closed set of ledger categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "Durham Truck")]
    DurhamTruck,
    #[serde(rename = "Concord Truck")]
    ConcordTruck,
    #[serde(rename = "Deposit")]
    Deposit,
    #[serde(rename = "Credit Card Charge")]
    CreditCardCharge,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::DurhamTruck => "Durham Truck",
            Category::ConcordTruck => "Concord Truck",
            Category::Deposit => "Deposit",
            Category::CreditCardCharge => "Credit Card Charge",
        }
    }

    /// All categories, in display order
    pub fn all() -> [Category; 4] {
        [
            Category::DurhamTruck,
            Category::ConcordTruck,
            Category::Deposit,
            Category::CreditCardCharge,
        ]
    }
}

impl std::str::FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Durham Truck" => Ok(Category::DurhamTruck),
            "Concord Truck" => Ok(Category::ConcordTruck),
            "Deposit" => Ok(Category::Deposit),
            "Credit Card Charge" => Ok(Category::CreditCardCharge),
            other => Err(Error::validation(format!("Unknown category: {}", other))),
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single ledger transaction
///
/// `sort_order` is the display rank: globally unique, assigned `max + 1` on
/// create, reassigned densely (1..N) only by a whole-ledger reorder. Deletes
/// leave gaps until the next reorder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Calendar date (UTC midnight semantics, no time-of-day)
    pub date: NaiveDate,
    pub category: Category,
    pub amount: Decimal,
    pub notes: Option<String>,
    pub confirmation_taylor: bool,
    pub confirmation_dad: bool,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new transaction with required fields
    ///
    /// `sort_order` starts at 0; the repository assigns the real rank when
    /// the row is inserted.
    pub fn new(id: Uuid, date: NaiveDate, category: Category, amount: Decimal) -> Self {
        let now = Utc::now();
        Self {
            id,
            date,
            category,
            amount,
            notes: None,
            confirmation_taylor: false,
            confirmation_dad: false,
            sort_order: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Snapshot for audit entries
    ///
    /// Row timestamps are left out so diffs only carry user-meaningful
    /// fields.
    pub fn snapshot(&self) -> JsonValue {
        json!({
            "id": self.id.to_string(),
            "date": self.date.to_string(),
            "category": self.category.as_str(),
            "amount": self.amount,
            "notes": self.notes,
            "confirmation_taylor": self.confirmation_taylor,
            "confirmation_dad": self.confirmation_dad,
            "sort_order": self.sort_order,
        })
    }

    /// UTC calendar month key, used by month aggregation
    pub fn month_key(&self) -> String {
        self.date.format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::diff::diff_objects;

    fn sample() -> Transaction {
        Transaction::new(
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            Category::Deposit,
            Decimal::new(12345, 2), // 123.45
        )
    }

    #[test]
    fn test_category_round_trip() {
        for cat in Category::all() {
            assert_eq!(cat.as_str().parse::<Category>().unwrap(), cat);
        }
        assert!("Groceries".parse::<Category>().is_err());
    }

    #[test]
    fn test_month_key() {
        let tx = sample();
        assert_eq!(tx.month_key(), "2024-01");
    }

    #[test]
    fn test_snapshot_excludes_timestamps() {
        let tx = sample();
        let snap = tx.snapshot();
        assert!(snap.get("created_at").is_none());
        assert!(snap.get("updated_at").is_none());
        assert_eq!(snap["category"], "Deposit");
        assert_eq!(snap["date"], "2024-01-31");
    }

    #[test]
    fn test_snapshot_diff_picks_up_notes_change() {
        let mut tx = sample();
        let before = tx.snapshot();
        tx.notes = Some("fuel".to_string());
        let diff = diff_objects(&before, &tx.snapshot());
        assert_eq!(diff.len(), 1);
        assert!(diff.contains_key("notes"));
    }
}
