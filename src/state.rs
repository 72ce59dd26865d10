//! The owned application state and its persistence document.
//!
//! One `AppState` owns the transaction collection, the chart of accounts and
//! the settings; engine functions borrow it. There are no ambient singletons.
//! The serialized form is a single versioned JSON document; unknown fields
//! are ignored and missing fields default, so older documents keep loading.

use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chart_of_accounts::ChartOfAccounts;
use crate::classify::validate_triple;
use crate::error::{LedgerError, Result};
use crate::project::ProjectionMethod;
use crate::transaction::{Classification, ReconciliationStatus, Transaction};

/// Version written into new documents.
pub const STATE_VERSION: &str = "10.0";

fn default_version() -> String {
    STATE_VERSION.to_string()
}

fn default_projection_periods() -> usize {
    6
}

fn default_projection_jitter() -> f64 {
    0.025
}

fn default_kpi_cache_secs() -> u64 {
    10
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Settings {
    #[serde(default)]
    pub projection_method: ProjectionMethod,
    #[serde(default = "default_projection_periods")]
    pub projection_periods: usize,
    #[serde(default = "default_projection_jitter")]
    pub projection_jitter: f64,
    #[serde(default = "default_kpi_cache_secs")]
    pub kpi_cache_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            projection_method: ProjectionMethod::default(),
            projection_periods: default_projection_periods(),
            projection_jitter: default_projection_jitter(),
            kpi_cache_secs: default_kpi_cache_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AppState {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub chart_of_accounts: ChartOfAccounts,
    #[serde(default)]
    pub settings: Settings,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            version: default_version(),
            transactions: Vec::new(),
            chart_of_accounts: ChartOfAccounts::default(),
            settings: Settings::default(),
        }
    }
}

impl AppState {
    /// Serializes the whole state to the versioned JSON document.
    pub fn serialize(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Loads a document. Unknown fields are ignored, missing ones default,
    /// and older versions are stamped to the current one.
    pub fn deserialize(document: &str) -> Result<Self> {
        let mut state: AppState = serde_json::from_str(document)?;
        if state.version != STATE_VERSION {
            info!(
                "migrating state document from version {} to {}",
                state.version, STATE_VERSION
            );
            state.version = STATE_VERSION.to_string();
        }
        Ok(state)
    }

    /// JSON schema of the persistence document.
    pub fn schema_as_json() -> Result<String> {
        let schema = schemars::schema_for!(AppState);
        Ok(serde_json::to_string_pretty(&schema)?)
    }

    pub fn find_transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    /// Replaces the whole collection, the import-replace mutation.
    pub fn replace_transactions(&mut self, transactions: Vec<Transaction>) {
        info!(
            "replacing transaction collection: {} -> {} rows",
            self.transactions.len(),
            transactions.len()
        );
        self.transactions = transactions;
    }

    /// Appends an imported batch to the collection.
    pub fn append_transactions(&mut self, mut transactions: Vec<Transaction>) {
        info!("appending {} imported rows", transactions.len());
        self.transactions.append(&mut transactions);
    }

    /// Reconciles a transaction: validates the triple against the chart,
    /// writes the classification fields and flips the status. The record is
    /// untouched when validation fails.
    pub fn apply_classification(
        &mut self,
        id: Uuid,
        classification: Classification,
        cost_center: Option<String>,
        reference: Option<String>,
        notes: Option<String>,
    ) -> Result<()> {
        validate_triple(&classification, &self.chart_of_accounts)
            .map_err(LedgerError::Classification)?;

        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        tx.classification = classification;
        if let Some(cost_center) = cost_center {
            tx.cost_center = cost_center;
        }
        if let Some(reference) = reference {
            tx.reference = reference;
        }
        if let Some(notes) = notes {
            tx.notes = notes;
        }
        tx.reconciliation_status = ReconciliationStatus::Reconciled;
        Ok(())
    }

    /// Replaces one record wholesale, keyed by its id. The month bucket is
    /// re-derived so an edited date cannot leave it stale.
    pub fn update_transaction(&mut self, updated: Transaction) -> Result<()> {
        let slot = self
            .transactions
            .iter_mut()
            .find(|t| t.id == updated.id)
            .ok_or(LedgerError::TransactionNotFound(updated.id))?;
        let date = updated.date;
        *slot = updated;
        slot.set_date(date);
        Ok(())
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> Result<()> {
        let index = self
            .transactions
            .iter()
            .position(|t| t.id == id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        self.transactions.remove(index);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn state_with_one_tx() -> (AppState, Uuid) {
        let mut state = AppState::default();
        let mut tx = Transaction::new(
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            "Prestação de serviços",
        );
        tx.amount_in = dec!(2500);
        let id = tx.id;
        state.transactions.push(tx);
        (state, id)
    }

    #[test]
    fn test_round_trip() {
        let (mut state, id) = state_with_one_tx();
        state
            .apply_classification(
                id,
                Classification::new(
                    "1.0 RECEITAS OPERACIONAIS",
                    "1.1 Receita de Vendas/Serviços",
                    "1.1.2 Prestação de Serviços",
                ),
                Some("COMERCIAL".to_string()),
                Some("NFS 001/2025".to_string()),
                None,
            )
            .unwrap();

        let document = state.serialize().unwrap();
        let restored = AppState::deserialize(&document).unwrap();
        assert_eq!(restored, state);
    }

    #[test]
    fn test_unknown_and_missing_fields_tolerated() {
        let document = r#"{
            "version": "3.0",
            "transactions": [],
            "somethingFromTheFuture": {"a": 1}
        }"#;
        let state = AppState::deserialize(document).unwrap();
        assert_eq!(state.version, STATE_VERSION);
        assert_eq!(state.settings, Settings::default());
        // A missing chart defaults to the stock Brazilian chart.
        assert!(!state.chart_of_accounts.is_empty());
    }

    #[test]
    fn test_apply_classification_validates_path() {
        let (mut state, id) = state_with_one_tx();
        let err = state
            .apply_classification(
                id,
                Classification::new("9.0 INEXISTENTE", "9.1", "9.1.1"),
                None,
                None,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, LedgerError::Classification(_)));
        // The record must be untouched.
        let tx = state.find_transaction(id).unwrap();
        assert!(tx.classification.is_unclassified());
        assert!(!tx.is_reconciled());
    }

    #[test]
    fn test_apply_classification_reconciles() {
        let (mut state, id) = state_with_one_tx();
        state
            .apply_classification(
                id,
                Classification::new(
                    "1.0 RECEITAS OPERACIONAIS",
                    "1.1 Receita de Vendas/Serviços",
                    "1.1.2 Prestação de Serviços",
                ),
                None,
                None,
                None,
            )
            .unwrap();
        assert!(state.find_transaction(id).unwrap().is_reconciled());
    }

    #[test]
    fn test_update_transaction_rederives_bucket() {
        let (mut state, id) = state_with_one_tx();
        let mut edited = state.find_transaction(id).unwrap().clone();
        edited.date = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        // Deliberately stale bucket on the edited copy.
        assert_eq!(edited.month_bucket, "2025-01");
        state.update_transaction(edited).unwrap();
        assert_eq!(state.find_transaction(id).unwrap().month_bucket, "2025-03");
    }

    #[test]
    fn test_delete_transaction() {
        let (mut state, id) = state_with_one_tx();
        state.delete_transaction(id).unwrap();
        assert!(state.transactions.is_empty());
        assert!(matches!(
            state.delete_transaction(id),
            Err(LedgerError::TransactionNotFound(_))
        ));
    }

    #[test]
    fn test_replace_and_append() {
        let (mut state, _) = state_with_one_tx();
        let other = Transaction::new(NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(), "outro");
        state.append_transactions(vec![other]);
        assert_eq!(state.transactions.len(), 2);
        state.replace_transactions(Vec::new());
        assert!(state.transactions.is_empty());
    }

    #[test]
    fn test_schema_mentions_document_fields() {
        let schema = AppState::schema_as_json().unwrap();
        assert!(schema.contains("transactions"));
        assert!(schema.contains("chart_of_accounts"));
        assert!(schema.contains("settings"));
    }
}
