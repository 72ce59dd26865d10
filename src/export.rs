//! CSV export boundary: the normalized transaction export and the DRE and
//! cash-flow report exports. Column layouts are a fixed contract consumed by
//! spreadsheets downstream.

use rust_decimal::Decimal;

use crate::aggregate::{CashflowMonth, DreReport};
use crate::error::Result;
use crate::transaction::{ReconciliationStatus, Transaction};

/// Fixed header order of the normalized export.
pub const EXPORT_HEADERS: [&str; 14] = [
    "Data",
    "Descrição Original",
    "Favorecido / Pagador Padronizado",
    "Entrada (R$)",
    "Saída (R$)",
    "Banco Origem/Destino",
    "Classificação Nível 1",
    "Classificação Nível 2",
    "Classificação Nível 3",
    "Centro de Custo",
    "Status Conciliação",
    "Notas",
    "Contrato/Nota?",
    "Mês",
];

fn status_label(status: ReconciliationStatus) -> &'static str {
    match status {
        ReconciliationStatus::Pending => "Pendente",
        ReconciliationStatus::Reconciled => "Conciliado",
    }
}

/// Writes the normalized 14-column CSV. Quoting and doubled-quote escaping
/// follow standard CSV rules.
pub fn transactions_to_csv(transactions: &[Transaction]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(EXPORT_HEADERS)?;

    for tx in transactions {
        writer.write_record([
            tx.date.format("%Y-%m-%d").to_string(),
            tx.description.clone(),
            tx.payee.clone(),
            format!("{:.2}", tx.amount_in),
            format!("{:.2}", tx.amount_out),
            tx.counterparty_bank.clone(),
            tx.classification.level1.clone().unwrap_or_default(),
            tx.classification.level2.clone().unwrap_or_default(),
            tx.classification.level3.clone().unwrap_or_default(),
            tx.cost_center.clone(),
            status_label(tx.reconciliation_status).to_string(),
            tx.notes.clone(),
            tx.reference.clone(),
            tx.month_bucket.clone(),
        ])?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn percent_of(value: Decimal, total: Decimal) -> String {
    if total > Decimal::ZERO {
        format!("{:.1}%", value / total * Decimal::ONE_HUNDRED)
    } else {
        "0.0%".to_string()
    }
}

/// DRE report rows: account, value with two decimals and no thousands
/// grouping, percent of revenue.
pub fn dre_to_csv(report: &DreReport) -> String {
    let mut csv = String::from("Conta,Valor (R$),Percentual\n");
    csv.push_str(&format!(
        "RECEITAS OPERACIONAIS,{:.2},100.0%\n",
        report.total_revenue
    ));
    csv.push_str(&format!(
        "(-) CUSTOS E DESPESAS OPERACIONAIS,-{:.2},{}\n",
        report.total_expenses,
        percent_of(report.total_expenses, report.total_revenue)
    ));
    csv.push_str(&format!(
        "RESULTADO OPERACIONAL,{:.2},{}\n",
        report.operational_result,
        percent_of(report.operational_result, report.total_revenue)
    ));
    csv.push_str(&format!(
        "RESULTADO FINANCEIRO,{:.2},{}\n",
        report.financial_result,
        percent_of(report.financial_result, report.total_revenue)
    ));
    csv.push_str(&format!(
        "RESULTADO LÍQUIDO DO PERÍODO,{:.2},{}\n",
        report.net_result,
        percent_of(report.net_result, report.total_revenue)
    ));
    csv
}

/// Cash-flow rows with the running accumulated balance.
pub fn cashflow_to_csv(months: &[CashflowMonth]) -> String {
    let mut csv = String::from("Mês,Receitas,Despesas,Resultado,Saldo Acumulado\n");
    for row in months {
        csv.push_str(&format!(
            "{},{:.2},{:.2},{:.2},{:.2}\n",
            row.month, row.revenue, row.expenses, row.result, row.accumulated
        ));
    }
    csv
}
