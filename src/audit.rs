//! Anomaly audit over the transaction collection.
//!
//! Every check is independent, reads the collection and returns findings;
//! none of them mutates data, and findings never block other operations.

use chrono::{Datelike, Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::transaction::Transaction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateFinding {
    /// First transaction seen with this key, in collection order.
    pub original: Uuid,
    pub duplicate: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateIssueKind {
    /// The import could not parse the date and substituted the processing
    /// date.
    Unparsed,
    /// More than one day in the future.
    Future,
    /// Before January 1st of five years before the processing date.
    TooOld,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateIssue {
    pub id: Uuid,
    pub kind: DateIssueKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BalanceIssueKind {
    /// Neither amount is positive.
    ZeroAmount,
    /// Inflow and outflow are both positive on the same row.
    DoubleAmount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceIssue {
    pub id: Uuid,
    pub kind: BalanceIssueKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct AuditReport {
    pub unclassified: Vec<Uuid>,
    pub duplicates: Vec<DuplicateFinding>,
    pub outliers: Vec<Uuid>,
    pub incomplete: Vec<Uuid>,
    pub date_issues: Vec<DateIssue>,
    pub balance_issues: Vec<BalanceIssue>,
}

impl AuditReport {
    pub fn total_findings(&self) -> usize {
        self.unclassified.len()
            + self.duplicates.len()
            + self.outliers.len()
            + self.incomplete.len()
            + self.date_issues.len()
            + self.balance_issues.len()
    }

    pub fn is_clean(&self) -> bool {
        self.total_findings() == 0
    }
}

/// Runs every check. `today` is the processing date used by the date checks.
pub fn run_full_audit(transactions: &[Transaction], today: NaiveDate) -> AuditReport {
    AuditReport {
        unclassified: find_unclassified(transactions),
        duplicates: find_duplicates(transactions),
        outliers: find_outliers(transactions),
        incomplete: find_incomplete(transactions),
        date_issues: find_date_issues(transactions, today),
        balance_issues: find_balance_issues(transactions),
    }
}

pub fn find_unclassified(transactions: &[Transaction]) -> Vec<Uuid> {
    transactions
        .iter()
        .filter(|t| t.classification.is_unclassified())
        .map(|t| t.id)
        .collect()
}

/// Exact-key duplicates on (date, description, amount_in, amount_out).
/// Pairwise: N identical rows yield N-1 findings, each pointing back at the
/// first occurrence.
pub fn find_duplicates(transactions: &[Transaction]) -> Vec<DuplicateFinding> {
    let mut seen: HashMap<(NaiveDate, &str, Decimal, Decimal), Uuid> = HashMap::new();
    let mut findings = Vec::new();

    for tx in transactions {
        let key = (tx.date, tx.description.as_str(), tx.amount_in, tx.amount_out);
        match seen.get(&key) {
            Some(original) => findings.push(DuplicateFinding {
                original: *original,
                duplicate: tx.id,
            }),
            None => {
                seen.insert(key, tx.id);
            }
        }
    }

    findings
}

/// Tukey fences over each transaction's larger movement amount. Quartiles
/// come from the sorted positive amounts at indices `n/4` and `3n/4`; every
/// transaction is then tested against the fences.
pub fn find_outliers(transactions: &[Transaction]) -> Vec<Uuid> {
    let mut amounts: Vec<Decimal> = transactions
        .iter()
        .map(Transaction::max_amount)
        .filter(|a| *a > Decimal::ZERO)
        .collect();

    if amounts.is_empty() {
        return Vec::new();
    }

    amounts.sort();
    let n = amounts.len();
    let q1 = amounts[n / 4];
    let q3 = amounts[(n * 3) / 4];
    let iqr = q3 - q1;
    let reach = iqr * Decimal::new(15, 1);
    let lower = q1 - reach;
    let upper = q3 + reach;

    transactions
        .iter()
        .filter(|t| {
            let amount = t.max_amount();
            amount < lower || amount > upper
        })
        .map(|t| t.id)
        .collect()
}

/// Missing description, no positive amount, or a date the import had to
/// estimate.
pub fn find_incomplete(transactions: &[Transaction]) -> Vec<Uuid> {
    transactions
        .iter()
        .filter(|t| t.description.trim().is_empty() || !t.has_amount() || t.date_estimated)
        .map(|t| t.id)
        .collect()
}

pub fn find_date_issues(transactions: &[Transaction], today: NaiveDate) -> Vec<DateIssue> {
    let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);
    let old_cutoff = NaiveDate::from_ymd_opt(today.year() - 5, 1, 1);

    transactions
        .iter()
        .filter_map(|t| {
            let kind = if t.date_estimated {
                Some(DateIssueKind::Unparsed)
            } else if t.date > tomorrow {
                Some(DateIssueKind::Future)
            } else if old_cutoff.is_some_and(|cutoff| t.date < cutoff) {
                Some(DateIssueKind::TooOld)
            } else {
                None
            };
            kind.map(|kind| DateIssue { id: t.id, kind })
        })
        .collect()
}

pub fn find_balance_issues(transactions: &[Transaction]) -> Vec<BalanceIssue> {
    let mut issues = Vec::new();

    for tx in transactions {
        if tx.amount_in.is_zero() && tx.amount_out.is_zero() {
            issues.push(BalanceIssue {
                id: tx.id,
                kind: BalanceIssueKind::ZeroAmount,
            });
        }
    }

    for tx in transactions {
        if tx.amount_in > Decimal::ZERO && tx.amount_out > Decimal::ZERO {
            issues.push(BalanceIssue {
                id: tx.id,
                kind: BalanceIssueKind::DoubleAmount,
            });
        }
    }

    issues
}
