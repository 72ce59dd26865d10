//! Classification of transactions against the chart of accounts.
//!
//! Holds the path validator, the keyword-based auto-suggestion rules and the
//! "repeat the last classification" shortcut used during reconciliation.

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::chart_of_accounts::ChartOfAccounts;
use crate::transaction::{Classification, Transaction};

/// Why a classification triple does not fit the current chart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassificationIssue {
    #[error("level {level} value '{value}' is set but its parent level is empty")]
    OrphanLevel { level: u8, value: String },

    #[error("level {level} value '{value}' does not exist in the chart of accounts")]
    UnknownNode { level: u8, value: String },
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Checks a transaction's classification triple against the chart.
///
/// A lower level is valid only when its parent is set and the value exists at
/// that path. An entirely empty triple is valid; "unclassified" is an audit
/// finding, not a validation error.
pub fn validate(tx: &Transaction, chart: &ChartOfAccounts) -> Result<(), ClassificationIssue> {
    validate_triple(&tx.classification, chart)
}

pub fn validate_triple(
    classification: &Classification,
    chart: &ChartOfAccounts,
) -> Result<(), ClassificationIssue> {
    let level1 = present(&classification.level1);
    let level2 = present(&classification.level2);
    let level3 = present(&classification.level3);

    if let Some(l1) = level1 {
        if !chart.has_level1(l1) {
            return Err(ClassificationIssue::UnknownNode {
                level: 1,
                value: l1.to_string(),
            });
        }
    }

    if let Some(l2) = level2 {
        match level1 {
            None => {
                return Err(ClassificationIssue::OrphanLevel {
                    level: 2,
                    value: l2.to_string(),
                })
            }
            Some(l1) if !chart.has_level2(l1, l2) => {
                return Err(ClassificationIssue::UnknownNode {
                    level: 2,
                    value: l2.to_string(),
                });
            }
            _ => {}
        }
    }

    if let Some(l3) = level3 {
        match (level1, level2) {
            (Some(l1), Some(l2)) => {
                if !chart.has_level3(l1, l2, l3) {
                    return Err(ClassificationIssue::UnknownNode {
                        level: 3,
                        value: l3.to_string(),
                    });
                }
            }
            _ => {
                return Err(ClassificationIssue::OrphanLevel {
                    level: 3,
                    value: l3.to_string(),
                })
            }
        }
    }

    Ok(())
}

/// One auto-suggestion rule: if any keyword occurs in the lowercased
/// description, the triple applies. Rules are configuration data, loadable
/// from JSON, so the table can grow without touching the matcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRule {
    pub keywords: Vec<String>,
    pub level1: String,
    pub level2: String,
    pub level3: String,
}

impl SuggestionRule {
    fn matches(&self, description: &str) -> bool {
        self.keywords.iter().any(|k| description.contains(k.as_str()))
    }

    fn triple(&self) -> Classification {
        Classification::new(&self.level1, &self.level2, &self.level3)
    }
}

/// Ordered rule lists, one branch per money direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    pub revenue: Vec<SuggestionRule>,
    pub expense: Vec<SuggestionRule>,
}

impl RuleSet {
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

fn rule(keywords: &[&str], level1: &str, level2: &str, level3: &str) -> SuggestionRule {
    SuggestionRule {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        level1: level1.to_string(),
        level2: level2.to_string(),
        level3: level3.to_string(),
    }
}

/// The stock rules shipped with the product.
impl Default for RuleSet {
    fn default() -> Self {
        Self {
            revenue: vec![
                rule(
                    &["serviço", "consultoria", "projeto"],
                    "1.0 RECEITAS OPERACIONAIS",
                    "1.1 Receita de Vendas/Serviços",
                    "1.1.2 Prestação de Serviços",
                ),
                rule(
                    &["venda", "produto"],
                    "1.0 RECEITAS OPERACIONAIS",
                    "1.1 Receita de Vendas/Serviços",
                    "1.1.1 Venda de Produtos",
                ),
                rule(
                    &["juros", "rendimento"],
                    "3.0 RESULTADO FINANCEIRO",
                    "3.1 Receitas Financeiras",
                    "3.1.1 Rendimentos de Aplicações",
                ),
            ],
            expense: vec![
                rule(
                    &["aluguel", "condomínio"],
                    "2.0 CUSTOS E DESPESAS OPERACIONAIS",
                    "2.3 Despesas Administrativas",
                    "2.3.1 Aluguel e Condomínio",
                ),
                rule(
                    &["salário", "pagamento funcionário"],
                    "2.0 CUSTOS E DESPESAS OPERACIONAIS",
                    "2.2 Despesas com Pessoal",
                    "2.2.1 Salários e Ordenados",
                ),
                rule(
                    &["material", "papelaria", "escritório"],
                    "2.0 CUSTOS E DESPESAS OPERACIONAIS",
                    "2.3 Despesas Administrativas",
                    "2.3.3 Materiais de Escritório",
                ),
                rule(
                    &["internet", "telefone", "comunicação"],
                    "2.0 CUSTOS E DESPESAS OPERACIONAIS",
                    "2.3 Despesas Administrativas",
                    "2.3.4 Comunicação e Internet",
                ),
                rule(
                    &["marketing", "publicidade", "propaganda"],
                    "2.0 CUSTOS E DESPESAS OPERACIONAIS",
                    "2.4 Despesas Comerciais",
                    "2.4.1 Marketing e Publicidade",
                ),
            ],
        }
    }
}

/// Suggests a classification from the description. The direction of money
/// picks the rule list (inflow → revenue rules, otherwise expense rules) and
/// the first matching rule wins. `None` when nothing matches.
pub fn suggest_classification(tx: &Transaction, rules: &RuleSet) -> Option<Classification> {
    let description = tx.description.to_lowercase();
    let list = if tx.amount_in > rust_decimal::Decimal::ZERO {
        &rules.revenue
    } else {
        &rules.expense
    };
    list.iter()
        .find(|r| r.matches(&description))
        .map(|r| r.triple())
}

/// Copies the classification triple and cost center of the last reconciled
/// transaction in collection order onto the target. "Last" means insertion
/// order, not most recent by date. Returns false when there is no reconciled
/// donor or the target is missing.
pub fn duplicate_last_classification(target: Uuid, transactions: &mut [Transaction]) -> bool {
    let donor = match transactions.iter().rev().find(|t| t.is_reconciled()) {
        Some(donor) => (donor.classification.clone(), donor.cost_center.clone()),
        None => {
            debug!("no reconciled transaction to copy a classification from");
            return false;
        }
    };

    match transactions.iter_mut().find(|t| t.id == target) {
        Some(tx) => {
            tx.classification = donor.0;
            tx.cost_center = donor.1;
            true
        }
        None => false,
    }
}
