//! Textual financial context for the AI collaborator.
//!
//! The produced text plus the user's question is the entire payload handed to
//! the external assistant; nothing structured ever comes back.

use rust_decimal::Decimal;

use crate::aggregate::{compute_kpis, group_by_category, group_by_month};
use crate::normalize::format_brl;
use crate::transaction::Transaction;

/// Builds a compact summary of the collection: totals, top expense
/// categories, the last three months and a couple of ratios.
pub fn build_financial_context(transactions: &[Transaction]) -> String {
    let kpis = compute_kpis(transactions);
    let pending = transactions.iter().filter(|t| !t.is_reconciled()).count();

    let mut categories: Vec<(String, Decimal)> = group_by_category(transactions)
        .into_iter()
        .collect();
    categories.sort_by(|a, b| b.1.cmp(&a.1));
    let top_categories = categories
        .iter()
        .take(5)
        .map(|(name, amount)| format!("{}: {}", name, format_brl(*amount)))
        .collect::<Vec<_>>()
        .join(", ");

    let months = group_by_month(transactions);
    let recent_months = months
        .iter()
        .rev()
        .take(3)
        .map(|(month, bucket)| {
            format!(
                "{}: Receitas {}, Despesas {}, Resultado {}",
                month,
                format_brl(bucket.revenue),
                format_brl(bucket.expenses),
                format_brl(bucket.revenue - bucket.expenses)
            )
        })
        .collect::<Vec<_>>()
        .join(" | ");

    let margin = if kpis.total_revenue > Decimal::ZERO {
        format!(
            "{:.1}%",
            kpis.net_result / kpis.total_revenue * Decimal::ONE_HUNDRED
        )
    } else {
        "0%".to_string()
    };
    let average_ticket = if kpis.count > 0 {
        kpis.total_revenue / Decimal::from(kpis.count)
    } else {
        Decimal::ZERO
    };

    format!(
        "RESUMO FINANCEIRO:\n\
         - Total de Transações: {}\n\
         - Receitas Totais: {}\n\
         - Despesas Totais: {}\n\
         - Resultado Líquido: {}\n\
         - Transações Pendentes: {}\n\
         \n\
         PRINCIPAIS CATEGORIAS DE DESPESA:\n\
         {}\n\
         \n\
         HISTÓRICO MENSAL (últimos 3 meses):\n\
         {}\n\
         \n\
         ANÁLISE:\n\
         - Margem: {}\n\
         - Ticket Médio: {}\n",
        kpis.count,
        format_brl(kpis.total_revenue),
        format_brl(kpis.total_expenses),
        format_brl(kpis.net_result),
        pending,
        if top_categories.is_empty() {
            "Nenhuma categoria classificada"
        } else {
            top_categories.as_str()
        },
        if recent_months.is_empty() {
            "Dados mensais indisponíveis"
        } else {
            recent_months.as_str()
        },
        margin,
        format_brl(average_ticket),
    )
}
