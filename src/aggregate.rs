//! Aggregation over the transaction collection: KPIs, monthly and category
//! groupings, the DRE report and the monthly cash flow.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::transaction::Transaction;

/// Bucket label for transactions without a level-1 classification.
pub const UNCLASSIFIED: &str = "Unclassified";

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Kpis {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub net_result: Decimal,
    pub count: usize,
}

/// Pure O(n) sums over the collection.
pub fn compute_kpis(transactions: &[Transaction]) -> Kpis {
    let mut total_revenue = Decimal::ZERO;
    let mut total_expenses = Decimal::ZERO;
    for tx in transactions {
        total_revenue += tx.amount_in;
        total_expenses += tx.amount_out;
    }
    Kpis {
        total_revenue,
        total_expenses,
        net_result: total_revenue - total_expenses,
        count: transactions.len(),
    }
}

/// Staleness-window cache for [`compute_kpis`]. Purely an optimization:
/// cached and fresh results are interchangeable. The clock is passed in so
/// tests control staleness.
#[derive(Debug)]
pub struct KpiCache {
    window: Duration,
    cached: Option<(Instant, Kpis)>,
}

impl KpiCache {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            cached: None,
        }
    }

    pub fn get(&mut self, transactions: &[Transaction], now: Instant) -> Kpis {
        if let Some((at, kpis)) = &self.cached {
            if now.duration_since(*at) < self.window {
                return kpis.clone();
            }
        }
        let kpis = compute_kpis(transactions);
        self.cached = Some((now, kpis.clone()));
        kpis
    }

    /// Drops the cached value, e.g. after a mutation.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

impl Default for KpiCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// Summed movements for one `YYYY-MM` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct MonthlyBucket {
    pub revenue: Decimal,
    pub expenses: Decimal,
}

/// Groups by month bucket. `BTreeMap` keeps `YYYY-MM` keys lexicographically
/// sorted, which is chronological order.
pub fn group_by_month(transactions: &[Transaction]) -> BTreeMap<String, MonthlyBucket> {
    let mut months: BTreeMap<String, MonthlyBucket> = BTreeMap::new();
    for tx in transactions {
        let bucket = months.entry(tx.month_bucket.clone()).or_default();
        bucket.revenue += tx.amount_in;
        bucket.expenses += tx.amount_out;
    }
    months
}

/// Sums expenses per level-1 category. Unclassified transactions land in the
/// synthetic [`UNCLASSIFIED`] bucket. Only `amount_out` contributes.
pub fn group_by_category(transactions: &[Transaction]) -> BTreeMap<String, Decimal> {
    let mut categories: BTreeMap<String, Decimal> = BTreeMap::new();
    for tx in transactions {
        if tx.amount_out.is_zero() {
            continue;
        }
        let category = tx
            .classification
            .level1
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(UNCLASSIFIED);
        *categories.entry(category.to_string()).or_default() += tx.amount_out;
    }
    categories
}

/// Substring markers that sort level-1 names into the DRE buckets. Matching
/// is `contains`, not equality, so numbering prefixes like `"1.0 ..."` keep
/// working after a rename.
#[derive(Debug, Clone)]
pub struct DreMarkers {
    pub revenue: Vec<String>,
    pub operating_cost: Vec<String>,
    pub financial: Vec<String>,
}

impl Default for DreMarkers {
    fn default() -> Self {
        Self {
            revenue: vec!["RECEITAS OPERACIONAIS".to_string(), "1.0".to_string()],
            operating_cost: vec![
                "CUSTOS E DESPESAS OPERACIONAIS".to_string(),
                "2.0".to_string(),
            ],
            financial: vec!["RESULTADO FINANCEIRO".to_string(), "3.0".to_string()],
        }
    }
}

impl DreMarkers {
    fn matches(markers: &[String], level1: &str) -> bool {
        markers.iter().any(|m| level1.contains(m.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct DreReport {
    pub total_revenue: Decimal,
    pub total_expenses: Decimal,
    pub financial_result: Decimal,
    pub operational_result: Decimal,
    pub net_result: Decimal,
    /// Both margins use the same formula on purpose; the product never
    /// distinguished them.
    pub gross_margin: Decimal,
    pub operational_margin: Decimal,
    pub net_margin: Decimal,
    pub revenue_by_category: BTreeMap<String, Decimal>,
    pub expenses_by_category: BTreeMap<String, Decimal>,
}

/// Income-statement style report over the reconciled transactions only.
pub fn compute_dre(transactions: &[Transaction], markers: &DreMarkers) -> DreReport {
    let mut report = DreReport::default();

    for tx in transactions.iter().filter(|t| t.is_reconciled()) {
        let level1 = tx
            .classification
            .level1
            .as_deref()
            .unwrap_or(UNCLASSIFIED);
        let level2 = tx
            .classification
            .level2
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let category = level2.unwrap_or(level1).to_string();

        if DreMarkers::matches(&markers.revenue, level1) {
            report.total_revenue += tx.amount_in;
            *report.revenue_by_category.entry(category).or_default() += tx.amount_in;
        } else if DreMarkers::matches(&markers.operating_cost, level1) {
            report.total_expenses += tx.amount_out;
            *report.expenses_by_category.entry(category).or_default() += tx.amount_out;
        } else if DreMarkers::matches(&markers.financial, level1) {
            report.financial_result += tx.amount_in - tx.amount_out;
        }
    }

    report.operational_result = report.total_revenue - report.total_expenses;
    report.net_result = report.operational_result + report.financial_result;

    if report.total_revenue > Decimal::ZERO {
        report.gross_margin = report.operational_result / report.total_revenue;
        report.operational_margin = report.gross_margin;
        report.net_margin = report.net_result / report.total_revenue;
    }

    report
}

/// One month of the cash-flow report, with the running balance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashflowMonth {
    pub month: String,
    pub revenue: Decimal,
    pub expenses: Decimal,
    pub result: Decimal,
    pub accumulated: Decimal,
}

/// Chronological per-month results with a running accumulated balance.
pub fn monthly_cashflow(transactions: &[Transaction]) -> Vec<CashflowMonth> {
    let mut accumulated = Decimal::ZERO;
    group_by_month(transactions)
        .into_iter()
        .map(|(month, bucket)| {
            let result = bucket.revenue - bucket.expenses;
            accumulated += result;
            CashflowMonth {
                month,
                revenue: bucket.revenue,
                expenses: bucket.expenses,
                result,
                accumulated,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::ReconciliationStatus;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn tx(date: (i32, u32, u32), amount_in: Decimal, amount_out: Decimal) -> Transaction {
        let mut tx = Transaction::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            "movimento",
        );
        tx.amount_in = amount_in;
        tx.amount_out = amount_out;
        tx
    }

    fn reconciled(
        date: (i32, u32, u32),
        amount_in: Decimal,
        amount_out: Decimal,
        level1: &str,
    ) -> Transaction {
        let mut t = tx(date, amount_in, amount_out);
        t.classification.set_level1(Some(level1.to_string()));
        t.reconciliation_status = ReconciliationStatus::Reconciled;
        t
    }

    #[test]
    fn test_kpis_empty() {
        let kpis = compute_kpis(&[]);
        assert_eq!(kpis.net_result, Decimal::ZERO);
        assert_eq!(kpis.count, 0);
    }

    #[test]
    fn test_kpis_sums() {
        let txs = vec![
            tx((2025, 1, 1), dec!(100), dec!(0)),
            tx((2025, 1, 2), dec!(0), dec!(40)),
        ];
        let kpis = compute_kpis(&txs);
        assert_eq!(kpis.total_revenue, dec!(100));
        assert_eq!(kpis.total_expenses, dec!(40));
        assert_eq!(kpis.net_result, dec!(60));
        assert_eq!(kpis.count, 2);
    }

    #[test]
    fn test_kpi_cache_matches_fresh_result() {
        let txs = vec![tx((2025, 1, 1), dec!(100), dec!(0))];
        let mut cache = KpiCache::default();
        let start = Instant::now();

        let first = cache.get(&txs, start);
        // Within the window the cached value is served, and it must equal a
        // fresh computation.
        let cached = cache.get(&txs, start + Duration::from_secs(5));
        assert_eq!(first, cached);
        assert_eq!(cached, compute_kpis(&txs));

        // Past the window the value is recomputed.
        let recomputed = cache.get(&txs, start + Duration::from_secs(11));
        assert_eq!(recomputed, compute_kpis(&txs));
    }

    #[test]
    fn test_group_by_month_totals_match_kpis() {
        let txs = vec![
            tx((2025, 1, 1), dec!(100), dec!(10)),
            tx((2025, 1, 20), dec!(50), dec!(0)),
            tx((2025, 2, 3), dec!(70), dec!(30)),
        ];
        let months = group_by_month(&txs);
        assert_eq!(months.len(), 2);
        assert_eq!(months["2025-01"].revenue, dec!(150));

        let summed: Decimal = months.values().map(|b| b.revenue).sum();
        assert_eq!(summed, compute_kpis(&txs).total_revenue);
    }

    #[test]
    fn test_group_by_month_is_chronological() {
        let txs = vec![
            tx((2025, 2, 1), dec!(1), dec!(0)),
            tx((2024, 12, 1), dec!(1), dec!(0)),
            tx((2025, 1, 1), dec!(1), dec!(0)),
        ];
        let keys: Vec<String> = group_by_month(&txs).into_keys().collect();
        assert_eq!(keys, vec!["2024-12", "2025-01", "2025-02"]);
    }

    #[test]
    fn test_group_by_category_expenses_only() {
        let mut classified = tx((2025, 1, 1), dec!(0), dec!(80));
        classified
            .classification
            .set_level1(Some("2.0 CUSTOS E DESPESAS OPERACIONAIS".to_string()));
        let revenue_only = tx((2025, 1, 2), dec!(500), dec!(0));
        let unclassified = tx((2025, 1, 3), dec!(0), dec!(20));

        let categories = group_by_category(&[classified, revenue_only, unclassified]);
        assert_eq!(
            categories["2.0 CUSTOS E DESPESAS OPERACIONAIS"],
            dec!(80)
        );
        assert_eq!(categories[UNCLASSIFIED], dec!(20));
        assert_eq!(categories.len(), 2);
    }

    #[test]
    fn test_dre_buckets_and_margins() {
        let txs = vec![
            reconciled((2025, 1, 5), dec!(1000), dec!(0), "1.0 RECEITAS OPERACIONAIS"),
            reconciled(
                (2025, 1, 10),
                dec!(0),
                dec!(400),
                "2.0 CUSTOS E DESPESAS OPERACIONAIS",
            ),
            reconciled((2025, 1, 15), dec!(50), dec!(10), "3.0 RESULTADO FINANCEIRO"),
            // Pending rows are excluded from the DRE.
            tx((2025, 1, 20), dec!(9999), dec!(0)),
        ];

        let report = compute_dre(&txs, &DreMarkers::default());
        assert_eq!(report.total_revenue, dec!(1000));
        assert_eq!(report.total_expenses, dec!(400));
        assert_eq!(report.financial_result, dec!(40));
        assert_eq!(report.operational_result, dec!(600));
        assert_eq!(report.net_result, dec!(640));
        assert_eq!(report.gross_margin, dec!(0.6));
        assert_eq!(report.operational_margin, report.gross_margin);
        assert_eq!(report.net_margin, dec!(0.64));
    }

    #[test]
    fn test_dre_matches_numbering_prefix_variants() {
        let txs = vec![reconciled(
            (2025, 1, 5),
            dec!(100),
            dec!(0),
            "1.0 Receitas Renomeadas",
        )];
        let report = compute_dre(&txs, &DreMarkers::default());
        assert_eq!(report.total_revenue, dec!(100));
    }

    #[test]
    fn test_dre_zero_revenue_margins() {
        let txs = vec![reconciled(
            (2025, 1, 5),
            dec!(0),
            dec!(300),
            "2.0 CUSTOS E DESPESAS OPERACIONAIS",
        )];
        let report = compute_dre(&txs, &DreMarkers::default());
        assert_eq!(report.gross_margin, Decimal::ZERO);
        assert_eq!(report.net_margin, Decimal::ZERO);
    }

    #[test]
    fn test_monthly_cashflow_accumulates() {
        let txs = vec![
            tx((2025, 1, 1), dec!(100), dec!(160)),
            tx((2025, 2, 1), dec!(200), dec!(50)),
        ];
        let rows = monthly_cashflow(&txs);
        assert_eq!(rows[0].result, dec!(-60));
        assert_eq!(rows[0].accumulated, dec!(-60));
        assert_eq!(rows[1].accumulated, dec!(90));
    }
}
