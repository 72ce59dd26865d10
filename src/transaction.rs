//! The canonical bank-transaction record.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalize::month_bucket;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default,
)]
pub enum ReconciliationStatus {
    #[default]
    Pending,
    Reconciled,
}

/// The (level1, level2, level3) account path assigned to a transaction.
///
/// Setting a level clears everything below it when the value changes, so a
/// stale child can never outlive its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
pub struct Classification {
    pub level1: Option<String>,
    pub level2: Option<String>,
    pub level3: Option<String>,
}

impl Classification {
    pub fn new(
        level1: impl Into<String>,
        level2: impl Into<String>,
        level3: impl Into<String>,
    ) -> Self {
        Self {
            level1: Some(level1.into()),
            level2: Some(level2.into()),
            level3: Some(level3.into()),
        }
    }

    pub fn set_level1(&mut self, value: Option<String>) {
        if self.level1 != value {
            self.level2 = None;
            self.level3 = None;
        }
        self.level1 = value;
    }

    pub fn set_level2(&mut self, value: Option<String>) {
        if self.level2 != value {
            self.level3 = None;
        }
        self.level2 = value;
    }

    pub fn set_level3(&mut self, value: Option<String>) {
        self.level3 = value;
    }

    /// Level-1 is absent or blank; the transaction counts as unclassified.
    pub fn is_unclassified(&self) -> bool {
        self.level1
            .as_deref()
            .map_or(true, |v| v.trim().is_empty())
    }
}

/// A field-level problem found by [`Transaction::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub description: String,
    #[serde(default)]
    pub payee: String,
    #[serde(default)]
    pub counterparty_bank: String,
    pub amount_in: Decimal,
    pub amount_out: Decimal,
    #[serde(default)]
    pub classification: Classification,
    #[serde(default)]
    pub cost_center: String,
    #[serde(default)]
    pub reconciliation_status: ReconciliationStatus,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub reference: String,
    /// Derived `YYYY-MM` of `date`; kept in sync by [`Transaction::set_date`].
    pub month_bucket: String,
    /// True when the import date was unparseable and fell back to the
    /// processing date; the audit pass reports these.
    #[serde(default)]
    pub date_estimated: bool,
}

impl Transaction {
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            description: description.into(),
            payee: String::new(),
            counterparty_bank: String::new(),
            amount_in: Decimal::ZERO,
            amount_out: Decimal::ZERO,
            classification: Classification::default(),
            cost_center: String::new(),
            reconciliation_status: ReconciliationStatus::Pending,
            notes: String::new(),
            reference: String::new(),
            month_bucket: month_bucket(date),
            date_estimated: false,
        }
    }

    /// Changes the date and recomputes the month bucket.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.month_bucket = month_bucket(date);
    }

    pub fn is_reconciled(&self) -> bool {
        self.reconciliation_status == ReconciliationStatus::Reconciled
    }

    /// The larger of the two movement amounts; the audit outlier check runs
    /// on this.
    pub fn max_amount(&self) -> Decimal {
        self.amount_in.max(self.amount_out)
    }

    pub fn has_amount(&self) -> bool {
        self.amount_in > Decimal::ZERO || self.amount_out > Decimal::ZERO
    }

    /// Field-level validation. Both-zero and both-positive amounts are audit
    /// findings, not validation errors.
    pub fn validate(&self) -> std::result::Result<(), Vec<FieldIssue>> {
        let mut issues = Vec::new();

        if self.description.trim().is_empty() && self.payee.trim().is_empty() {
            issues.push(FieldIssue {
                field: "description",
                message: "required unless a payee is present".to_string(),
            });
        }

        if self.amount_in < Decimal::ZERO {
            issues.push(FieldIssue {
                field: "amount_in",
                message: format!("must be non-negative, got {}", self.amount_in),
            });
        }

        if self.amount_out < Decimal::ZERO {
            issues.push(FieldIssue {
                field: "amount_out",
                message: format!("must be non-negative, got {}", self.amount_out),
            });
        }

        if self.month_bucket != month_bucket(self.date) {
            issues.push(FieldIssue {
                field: "month_bucket",
                message: format!(
                    "out of sync with date: {} vs {}",
                    self.month_bucket,
                    month_bucket(self.date)
                ),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Transaction {
        let mut tx = Transaction::new(
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            "Prestação de serviços de consultoria",
        );
        tx.amount_in = dec!(2500.00);
        tx
    }

    #[test]
    fn test_new_derives_month_bucket() {
        let tx = sample();
        assert_eq!(tx.month_bucket, "2025-01");
        assert_eq!(tx.reconciliation_status, ReconciliationStatus::Pending);
    }

    #[test]
    fn test_set_date_recomputes_bucket() {
        let mut tx = sample();
        tx.set_date(NaiveDate::from_ymd_opt(2025, 3, 2).unwrap());
        assert_eq!(tx.month_bucket, "2025-03");
    }

    #[test]
    fn test_set_level1_clears_children_on_change() {
        let mut c = Classification::new("1.0 A", "1.1 B", "1.1.1 C");
        c.set_level1(Some("2.0 D".to_string()));
        assert_eq!(c.level1.as_deref(), Some("2.0 D"));
        assert_eq!(c.level2, None);
        assert_eq!(c.level3, None);
    }

    #[test]
    fn test_set_level1_same_value_keeps_children() {
        let mut c = Classification::new("1.0 A", "1.1 B", "1.1.1 C");
        c.set_level1(Some("1.0 A".to_string()));
        assert_eq!(c.level2.as_deref(), Some("1.1 B"));
        assert_eq!(c.level3.as_deref(), Some("1.1.1 C"));
    }

    #[test]
    fn test_set_level2_clears_level3() {
        let mut c = Classification::new("1.0 A", "1.1 B", "1.1.1 C");
        c.set_level2(Some("1.2 E".to_string()));
        assert_eq!(c.level3, None);
    }

    #[test]
    fn test_unclassified_detection() {
        assert!(Classification::default().is_unclassified());
        let mut c = Classification::default();
        c.set_level1(Some("  ".to_string()));
        assert!(c.is_unclassified());
        c.set_level1(Some("1.0 RECEITAS OPERACIONAIS".to_string()));
        assert!(!c.is_unclassified());
    }

    #[test]
    fn test_validate_requires_description_or_payee() {
        let mut tx = sample();
        tx.description = String::new();
        let issues = tx.validate().unwrap_err();
        assert!(issues.iter().any(|i| i.field == "description"));

        tx.payee = "Cliente ABC Ltda".to_string();
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_amounts() {
        let mut tx = sample();
        tx.amount_out = dec!(-1);
        assert!(tx.validate().is_err());
    }
}
