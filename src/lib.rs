//! # Ledger Analytics
//!
//! An in-memory analytical engine for bank-transaction records: it normalizes
//! mixed-locale numeric and date formats, classifies transactions against a
//! three-level chart of accounts, aggregates them into KPIs and reports,
//! projects cash flow forward and audits the collection for anomalies.
//!
//! ## Core Concepts
//!
//! - **Transaction**: one bank movement with separate inflow/outflow amounts,
//!   a classification triple and a reconciliation status
//! - **Chart of Accounts**: a three-level hierarchy the triples must exist in
//! - **Reconciliation**: assigning a valid classification and marking the
//!   transaction reconciled
//! - **Projection**: forward monthly estimates (average, trend or seasonal)
//!   with decaying confidence
//! - **Audit**: independent, non-mutating checks for duplicates, outliers,
//!   incomplete rows and date or balance anomalies
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_analytics::*;
//! use chrono::NaiveDate;
//!
//! let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
//! let report = import_csv(&csv_content, today)?;
//!
//! let mut state = AppState::default();
//! state.append_transactions(report.transactions);
//!
//! let kpis = compute_kpis(&state.transactions);
//! let audit = run_full_audit(&state.transactions, today);
//! let history = group_by_month(&state.transactions);
//! let forecast = project(
//!     &history,
//!     ProjectionMethod::Average,
//!     &ProjectionConfig::default(),
//!     &mut rand::thread_rng(),
//! )?;
//! ```

pub mod aggregate;
pub mod audit;
pub mod chart_of_accounts;
pub mod classify;
pub mod error;
pub mod export;
pub mod ingestion;
pub mod normalize;
pub mod project;
pub mod state;
pub mod summary;
pub mod transaction;

#[cfg(feature = "assistant")]
pub mod llm;

pub use aggregate::{
    compute_dre, compute_kpis, group_by_category, group_by_month, monthly_cashflow,
    CashflowMonth, DreMarkers, DreReport, KpiCache, Kpis, MonthlyBucket, UNCLASSIFIED,
};
pub use audit::{
    find_balance_issues, find_date_issues, find_duplicates, find_incomplete, find_outliers,
    find_unclassified, run_full_audit, AuditReport, BalanceIssue, BalanceIssueKind, DateIssue,
    DateIssueKind, DuplicateFinding,
};
pub use chart_of_accounts::{AccountPath, ChartOfAccounts};
pub use classify::{
    duplicate_last_classification, suggest_classification, validate as validate_classification,
    ClassificationIssue, RuleSet, SuggestionRule,
};
pub use error::{LedgerError, Result};
pub use export::{cashflow_to_csv, dre_to_csv, transactions_to_csv, EXPORT_HEADERS};
pub use ingestion::{
    detect_separator, ensure_supported_extension, import_csv, ImportReport, ImportWarning,
};
pub use normalize::{
    format_brl, month_bucket, parse_amount, parse_date, Lenient, ParseWarning,
};
pub use project::{
    project, risk_alerts, ProjectedMonth, ProjectionConfig, ProjectionMethod, RiskAlert,
    MIN_HISTORY_MONTHS,
};
pub use state::{AppState, Settings, STATE_VERSION};
pub use summary::build_financial_context;
pub use transaction::{
    Classification, FieldIssue, ReconciliationStatus, Transaction,
};

#[cfg(feature = "assistant")]
pub use llm::{AssistantClient, DEFAULT_ASSISTANT_TIMEOUT};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
