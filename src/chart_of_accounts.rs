//! Three-level hierarchical chart of accounts.
//!
//! Level 1 groups (e.g. `1.0 RECEITAS OPERACIONAIS`) contain level-2 accounts
//! which contain an ordered list of level-3 accounts. Names are unique within
//! their parent scope. Renaming or deleting a node never rewrites
//! transactions that were classified under the old name; stale classification
//! strings are tolerated and surface through validation instead.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{LedgerError, Result};

/// Typed address of a chart node: level 1 plus optionally level 2 and 3.
/// Replaces the joined `"A|B|C"` strings the data otherwise invites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountPath {
    pub level1: String,
    pub level2: Option<String>,
    pub level3: Option<String>,
}

impl AccountPath {
    pub fn level1(l1: impl Into<String>) -> Self {
        Self {
            level1: l1.into(),
            level2: None,
            level3: None,
        }
    }

    pub fn level2(l1: impl Into<String>, l2: impl Into<String>) -> Self {
        Self {
            level1: l1.into(),
            level2: Some(l2.into()),
            level3: None,
        }
    }

    pub fn level3(
        l1: impl Into<String>,
        l2: impl Into<String>,
        l3: impl Into<String>,
    ) -> Self {
        Self {
            level1: l1.into(),
            level2: Some(l2.into()),
            level3: Some(l3.into()),
        }
    }

    pub fn depth(&self) -> u8 {
        match (&self.level2, &self.level3) {
            (None, _) => 1,
            (Some(_), None) => 2,
            (Some(_), Some(_)) => 3,
        }
    }
}

impl std::fmt::Display for AccountPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.level1)?;
        if let Some(l2) = &self.level2 {
            write!(f, " > {}", l2)?;
        }
        if let Some(l3) = &self.level3 {
            write!(f, " > {}", l3)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ChartOfAccounts {
    groups: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl ChartOfAccounts {
    pub fn empty() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn level1_names(&self) -> Vec<&str> {
        self.groups.keys().map(String::as_str).collect()
    }

    /// Ordered level-2 names under a group; empty when the group is unknown.
    pub fn level2_names(&self, level1: &str) -> Vec<&str> {
        self.groups
            .get(level1)
            .map(|g| g.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Ordered level-3 names under a level-2 account; empty when unknown.
    pub fn level3_names(&self, level1: &str, level2: &str) -> Vec<&str> {
        self.groups
            .get(level1)
            .and_then(|g| g.get(level2))
            .map(|v| v.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn has_level1(&self, level1: &str) -> bool {
        self.groups.contains_key(level1)
    }

    pub fn has_level2(&self, level1: &str, level2: &str) -> bool {
        self.groups.get(level1).is_some_and(|g| g.contains_key(level2))
    }

    pub fn has_level3(&self, level1: &str, level2: &str, level3: &str) -> bool {
        self.groups
            .get(level1)
            .and_then(|g| g.get(level2))
            .is_some_and(|v| v.iter().any(|n| n == level3))
    }

    /// Adds a node at the path's depth. The parent must exist and the name
    /// must be unique within it.
    pub fn add(&mut self, path: &AccountPath) -> Result<()> {
        match path.depth() {
            1 => {
                if self.groups.contains_key(&path.level1) {
                    return Err(LedgerError::DuplicateAccount {
                        parent: "chart root".to_string(),
                        name: path.level1.clone(),
                    });
                }
                self.groups.insert(path.level1.clone(), BTreeMap::new());
            }
            2 => {
                let level2 = path.level2.as_deref().expect("depth 2");
                let group = self
                    .groups
                    .get_mut(&path.level1)
                    .ok_or_else(|| LedgerError::AccountNotFound(path.level1.clone()))?;
                if group.contains_key(level2) {
                    return Err(LedgerError::DuplicateAccount {
                        parent: path.level1.clone(),
                        name: level2.to_string(),
                    });
                }
                group.insert(level2.to_string(), Vec::new());
            }
            _ => {
                let level2 = path.level2.as_deref().expect("depth 3");
                let level3 = path.level3.as_deref().expect("depth 3");
                let accounts = self
                    .groups
                    .get_mut(&path.level1)
                    .and_then(|g| g.get_mut(level2))
                    .ok_or_else(|| {
                        LedgerError::AccountNotFound(format!("{} > {}", path.level1, level2))
                    })?;
                if accounts.iter().any(|n| n == level3) {
                    return Err(LedgerError::DuplicateAccount {
                        parent: level2.to_string(),
                        name: level3.to_string(),
                    });
                }
                accounts.push(level3.to_string());
            }
        }
        Ok(())
    }

    /// Renames the node the path points at. Transactions classified under the
    /// old name keep it.
    pub fn rename(&mut self, path: &AccountPath, new_name: &str) -> Result<()> {
        match path.depth() {
            1 => {
                if self.groups.contains_key(new_name) {
                    return Err(LedgerError::DuplicateAccount {
                        parent: "chart root".to_string(),
                        name: new_name.to_string(),
                    });
                }
                let children = self
                    .groups
                    .remove(&path.level1)
                    .ok_or_else(|| LedgerError::AccountNotFound(path.level1.clone()))?;
                self.groups.insert(new_name.to_string(), children);
            }
            2 => {
                let level2 = path.level2.as_deref().expect("depth 2");
                let group = self
                    .groups
                    .get_mut(&path.level1)
                    .ok_or_else(|| LedgerError::AccountNotFound(path.level1.clone()))?;
                if group.contains_key(new_name) {
                    return Err(LedgerError::DuplicateAccount {
                        parent: path.level1.clone(),
                        name: new_name.to_string(),
                    });
                }
                let children = group
                    .remove(level2)
                    .ok_or_else(|| LedgerError::AccountNotFound(level2.to_string()))?;
                group.insert(new_name.to_string(), children);
            }
            _ => {
                let level2 = path.level2.as_deref().expect("depth 3");
                let level3 = path.level3.as_deref().expect("depth 3");
                let accounts = self
                    .groups
                    .get_mut(&path.level1)
                    .and_then(|g| g.get_mut(level2))
                    .ok_or_else(|| {
                        LedgerError::AccountNotFound(format!("{} > {}", path.level1, level2))
                    })?;
                if accounts.iter().any(|n| n == new_name) {
                    return Err(LedgerError::DuplicateAccount {
                        parent: level2.to_string(),
                        name: new_name.to_string(),
                    });
                }
                let slot = accounts
                    .iter_mut()
                    .find(|n| n.as_str() == level3)
                    .ok_or_else(|| LedgerError::AccountNotFound(level3.to_string()))?;
                *slot = new_name.to_string();
            }
        }
        Ok(())
    }

    /// Removes the node the path points at, including any children.
    pub fn remove(&mut self, path: &AccountPath) -> Result<()> {
        match path.depth() {
            1 => {
                self.groups
                    .remove(&path.level1)
                    .ok_or_else(|| LedgerError::AccountNotFound(path.level1.clone()))?;
            }
            2 => {
                let level2 = path.level2.as_deref().expect("depth 2");
                let group = self
                    .groups
                    .get_mut(&path.level1)
                    .ok_or_else(|| LedgerError::AccountNotFound(path.level1.clone()))?;
                group
                    .remove(level2)
                    .ok_or_else(|| LedgerError::AccountNotFound(level2.to_string()))?;
            }
            _ => {
                let level2 = path.level2.as_deref().expect("depth 3");
                let level3 = path.level3.as_deref().expect("depth 3");
                let accounts = self
                    .groups
                    .get_mut(&path.level1)
                    .and_then(|g| g.get_mut(level2))
                    .ok_or_else(|| {
                        LedgerError::AccountNotFound(format!("{} > {}", path.level1, level2))
                    })?;
                let idx = accounts
                    .iter()
                    .position(|n| n == level3)
                    .ok_or_else(|| LedgerError::AccountNotFound(level3.to_string()))?;
                accounts.remove(idx);
            }
        }
        Ok(())
    }
}

/// The default Brazilian chart shipped with the product.
impl Default for ChartOfAccounts {
    fn default() -> Self {
        let mut chart = Self::empty();

        let entries: &[(&str, &[(&str, &[&str])])] = &[
            (
                "1.0 RECEITAS OPERACIONAIS",
                &[
                    (
                        "1.1 Receita de Vendas/Serviços",
                        &[
                            "1.1.1 Venda de Produtos",
                            "1.1.2 Prestação de Serviços",
                            "1.1.3 Receitas de Assinatura",
                        ],
                    ),
                    (
                        "1.2 Outras Receitas Operacionais",
                        &["1.2.1 Receitas Diversas", "1.2.2 Recuperação de Despesas"],
                    ),
                ],
            ),
            (
                "2.0 CUSTOS E DESPESAS OPERACIONAIS",
                &[
                    (
                        "2.1 Custos Diretos",
                        &[
                            "2.1.1 Custo do Produto Vendido",
                            "2.1.2 Custo do Serviço Prestado",
                            "2.1.3 Matéria Prima",
                        ],
                    ),
                    (
                        "2.2 Despesas com Pessoal",
                        &[
                            "2.2.1 Salários e Ordenados",
                            "2.2.2 Encargos Sociais",
                            "2.2.3 Benefícios",
                            "2.2.4 Férias e 13º Salário",
                            "2.2.5 FGTS",
                        ],
                    ),
                    (
                        "2.3 Despesas Administrativas",
                        &[
                            "2.3.1 Aluguel e Condomínio",
                            "2.3.2 Contas de Consumo",
                            "2.3.3 Materiais de Escritório",
                            "2.3.4 Comunicação e Internet",
                            "2.3.5 Honorários Profissionais",
                        ],
                    ),
                    (
                        "2.4 Despesas Comerciais",
                        &[
                            "2.4.1 Marketing e Publicidade",
                            "2.4.2 Comissões de Vendas",
                            "2.4.3 Viagens e Hospedagem",
                        ],
                    ),
                ],
            ),
            (
                "3.0 RESULTADO FINANCEIRO",
                &[
                    (
                        "3.1 Receitas Financeiras",
                        &[
                            "3.1.1 Rendimentos de Aplicações",
                            "3.1.2 Juros Ativos",
                            "3.1.3 Descontos Obtidos",
                        ],
                    ),
                    (
                        "3.2 Despesas Financeiras",
                        &[
                            "3.2.1 Juros de Empréstimos",
                            "3.2.2 Tarifas Bancárias",
                            "3.2.3 Descontos Concedidos",
                            "3.2.4 IOF",
                        ],
                    ),
                ],
            ),
            (
                "4.0 MOVIMENTAÇÕES NÃO-OPERACIONAIS",
                &[
                    (
                        "4.1 Transferências",
                        &["4.1.1 Transferência Entre Contas", "4.1.2 Saldo Inicial"],
                    ),
                    (
                        "4.2 Investimentos",
                        &["4.2.1 Aplicações Financeiras", "4.2.2 Resgates de Aplicações"],
                    ),
                    (
                        "4.3 Financiamentos",
                        &[
                            "4.3.1 Captação de Empréstimos",
                            "4.3.2 Amortização de Empréstimos",
                        ],
                    ),
                ],
            ),
        ];

        for (level1, level2s) in entries {
            let mut group = BTreeMap::new();
            for (level2, level3s) in *level2s {
                group.insert(
                    level2.to_string(),
                    level3s.iter().map(|s| s.to_string()).collect(),
                );
            }
            chart.groups.insert(level1.to_string(), group);
        }

        chart
    }
}
