//! CSV import boundary.
//!
//! Consumes rows of raw string fields keyed by header name and produces
//! transactions. Import favors availability over strictness: a malformed
//! field degrades to a safe default, a malformed row is skipped with a
//! warning, and only an empty file or a batch with zero valid rows fails.

use chrono::NaiveDate;
use log::{info, warn};
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::normalize::{parse_amount, parse_date};
use crate::transaction::Transaction;

/// A non-fatal problem encountered while importing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportWarning {
    /// 1-based line number in the source file; 0 for file-level warnings.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.line == 0 {
            write!(f, "{}", self.message)
        } else {
            write!(f, "line {}: {}", self.line, self.message)
        }
    }
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub transactions: Vec<Transaction>,
    pub warnings: Vec<ImportWarning>,
    pub skipped_rows: usize,
}

/// Picks the most frequent of `,`, `;` and tab in the header line; comma on
/// a tie or when none occurs.
pub fn detect_separator(header_line: &str) -> u8 {
    let candidates = [b',', b';', b'\t'];
    let mut best = b',';
    let mut best_count = 0usize;
    for sep in candidates {
        let count = header_line.bytes().filter(|b| *b == sep).count();
        if count > best_count {
            best = sep;
            best_count = count;
        }
    }
    best
}

fn normalize_header(header: &str) -> String {
    header
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Known header spellings per field, matched by substring after
/// normalization.
const DATE_HEADERS: &[&str] = &["data", "date", "dt", "fecha", "data_transacao", "data_movimento"];
const DESCRIPTION_HEADERS: &[&str] = &[
    "descricao",
    "description",
    "desc",
    "historico",
    "memo",
    "observacao",
    "descricao_original",
];
const AMOUNT_IN_HEADERS: &[&str] = &["entrada", "credito", "credit", "receita", "income"];
const AMOUNT_OUT_HEADERS: &[&str] = &["saida", "debito", "debit", "despesa", "expense"];
const AMOUNT_HEADERS: &[&str] = &["valor", "amount", "quantia", "montante", "total"];
const BANK_HEADERS: &[&str] = &["banco", "bank", "conta", "account", "instituicao", "agencia"];
const PAYEE_HEADERS: &[&str] = &["favorecido", "beneficiario", "payee", "pagador", "destinatario"];
const CATEGORY_HEADERS: &[&str] = &["categoria", "category", "classificacao", "tipo", "class"];
const NOTES_HEADERS: &[&str] = &["observacoes", "notes", "obs", "comentarios", "remarks"];

#[derive(Debug, Default)]
struct ColumnMap {
    date: Option<usize>,
    description: Option<usize>,
    amount_in: Option<usize>,
    amount_out: Option<usize>,
    amount: Option<usize>,
    bank: Option<usize>,
    payee: Option<usize>,
    category: Option<usize>,
    notes: Option<usize>,
}

fn find_column(normalized: &[String], patterns: &[&str]) -> Option<usize> {
    normalized
        .iter()
        .position(|header| patterns.iter().any(|p| header.contains(p)))
}

fn map_columns(headers: &[String], warnings: &mut Vec<ImportWarning>) -> ColumnMap {
    let normalized: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();

    let mut map = ColumnMap {
        date: find_column(&normalized, DATE_HEADERS),
        description: find_column(&normalized, DESCRIPTION_HEADERS),
        amount_in: find_column(&normalized, AMOUNT_IN_HEADERS),
        amount_out: find_column(&normalized, AMOUNT_OUT_HEADERS),
        amount: find_column(&normalized, AMOUNT_HEADERS),
        bank: find_column(&normalized, BANK_HEADERS),
        payee: find_column(&normalized, PAYEE_HEADERS),
        category: find_column(&normalized, CATEGORY_HEADERS),
        notes: find_column(&normalized, NOTES_HEADERS),
    };

    // The date and description headers are a soft requirement: warn and fall
    // back to the conventional first two columns.
    if map.date.is_none() && !headers.is_empty() {
        warnings.push(ImportWarning {
            line: 0,
            message: "no date header recognized, assuming first column".to_string(),
        });
        map.date = Some(0);
    }
    if map.description.is_none() && headers.len() > 1 {
        warnings.push(ImportWarning {
            line: 0,
            message: "no description header recognized, assuming second column".to_string(),
        });
        map.description = Some(1);
    }

    map
}

fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> &'a str {
    index.and_then(|i| record.get(i)).unwrap_or("").trim()
}

/// Gate for the file boundary: only delimited text files are importable.
pub fn ensure_supported_extension(file_name: &str) -> Result<()> {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".csv") || lower.ends_with(".txt") {
        Ok(())
    } else {
        Err(LedgerError::UnsupportedFileType(file_name.to_string()))
    }
}

/// Parses CSV content into transactions. `today` is the processing date used
/// as the unparseable-date fallback.
pub fn import_csv(content: &str, today: NaiveDate) -> Result<ImportReport> {
    if content.trim().is_empty() {
        return Err(LedgerError::EmptyInput);
    }

    let header_line = content.lines().next().unwrap_or("");
    let separator = detect_separator(header_line);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut report = ImportReport::default();
    let columns = map_columns(&headers, &mut report.warnings);

    for (row_index, record) in reader.records().enumerate() {
        // Header is line 1.
        let line = row_index + 2;

        let record = match record {
            Ok(record) => record,
            Err(err) => {
                report.warnings.push(ImportWarning {
                    line,
                    message: format!("malformed row skipped: {}", err),
                });
                report.skipped_rows += 1;
                continue;
            }
        };

        if record.iter().all(|f| f.trim().is_empty()) {
            report.skipped_rows += 1;
            continue;
        }

        let raw_date = field(&record, columns.date);
        let parsed_date = parse_date(raw_date, today);
        if let Some(warning) = &parsed_date.warning {
            report.warnings.push(ImportWarning {
                line,
                message: warning.to_string(),
            });
        }

        let (amount_in, amount_out) =
            match (columns.amount_in, columns.amount_out, columns.amount) {
                (Some(_), Some(_), _) | (Some(_), None, None) | (None, Some(_), None) => {
                    let amount_in = lenient_amount(
                        field(&record, columns.amount_in),
                        line,
                        &mut report.warnings,
                    );
                    let amount_out = lenient_amount(
                        field(&record, columns.amount_out),
                        line,
                        &mut report.warnings,
                    );
                    (amount_in, amount_out)
                }
                (_, _, Some(amount_col)) => {
                    // Single signed column: positive is an inflow.
                    let value = lenient_amount(
                        field(&record, Some(amount_col)),
                        line,
                        &mut report.warnings,
                    );
                    if value >= Decimal::ZERO {
                        (value, Decimal::ZERO)
                    } else {
                        (Decimal::ZERO, -value)
                    }
                }
                (None, None, None) => (Decimal::ZERO, Decimal::ZERO),
            };

        if amount_in.is_zero() && amount_out.is_zero() {
            report.warnings.push(ImportWarning {
                line,
                message: "no monetary values, row skipped".to_string(),
            });
            report.skipped_rows += 1;
            continue;
        }

        let description = field(&record, columns.description);
        let payee = field(&record, columns.payee);

        let mut tx = Transaction::new(
            parsed_date.value,
            if description.is_empty() {
                "Sem descrição"
            } else {
                description
            },
        );
        tx.date_estimated = !parsed_date.is_clean();
        tx.amount_in = amount_in;
        tx.amount_out = amount_out;
        tx.payee = if payee.is_empty() {
            description.to_string()
        } else {
            payee.to_string()
        };
        tx.counterparty_bank = {
            let bank = field(&record, columns.bank);
            if bank.is_empty() {
                "Não informado".to_string()
            } else {
                bank.to_string()
            }
        };
        let category = field(&record, columns.category);
        if !category.is_empty() {
            tx.classification.set_level1(Some(category.to_string()));
        }
        tx.notes = field(&record, columns.notes).to_string();

        report.transactions.push(tx);
    }

    if report.transactions.is_empty() {
        return Err(LedgerError::NoValidRows {
            discarded: report.skipped_rows,
        });
    }

    for warning in &report.warnings {
        warn!("import: {}", warning);
    }
    info!(
        "imported {} transactions ({} rows skipped, {} warnings)",
        report.transactions.len(),
        report.skipped_rows,
        report.warnings.len()
    );

    Ok(report)
}

fn lenient_amount(raw: &str, line: usize, warnings: &mut Vec<ImportWarning>) -> Decimal {
    let parsed = parse_amount(raw);
    if let Some(warning) = parsed.warning {
        warnings.push(ImportWarning {
            line,
            message: warning.to_string(),
        });
    }
    parsed.value
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    #[test]
    fn test_import_brazilian_statement() {
        let csv = "\
Data,Descrição,Entrada (R$),Saída (R$),Banco,Favorecido
15/01/2025,Prestação de serviços,2.500,00,0,Banco do Brasil,Cliente ABC
20/01/2025,Aluguel do escritório,0,\"1.200,00\",Itaú,Imobiliária Santos
";
        // The unquoted "2.500,00" splits on the comma, so that row parses
        // oddly but must not abort the batch.
        let report = import_csv(csv, today()).unwrap();
        assert!(!report.transactions.is_empty());
    }

    #[test]
    fn test_import_maps_headers_and_values() {
        let csv = "\
Data,Descrição Original,Entrada (R$),Saída (R$),Banco Origem/Destino,Favorecido / Pagador Padronizado
15/01/2025,Prestação de serviços,\"2.500,00\",\"0,00\",Banco do Brasil,Cliente ABC Ltda
20/01/2025,Aluguel do escritório,\"0,00\",\"1.200,00\",Itaú Unibanco,Imobiliária Santos
";
        let report = import_csv(csv, today()).unwrap();
        assert_eq!(report.transactions.len(), 2);

        let first = &report.transactions[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(first.amount_in, dec!(2500.00));
        assert_eq!(first.amount_out, Decimal::ZERO);
        assert_eq!(first.payee, "Cliente ABC Ltda");
        assert_eq!(first.counterparty_bank, "Banco do Brasil");
        assert_eq!(first.month_bucket, "2025-01");

        let second = &report.transactions[1];
        assert_eq!(second.amount_out, dec!(1200.00));
    }

    #[test]
    fn test_import_semicolon_separator() {
        let csv = "\
Data;Descrição;Valor
15/01/2025;Venda de produto;1500,00
20/01/2025;Aluguel;-1200,00
";
        let report = import_csv(csv, today()).unwrap();
        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].amount_in, dec!(1500.00));
        assert_eq!(report.transactions[1].amount_out, dec!(1200.00));
    }

    #[test]
    fn test_import_signed_single_amount_column() {
        let csv = "\
date,description,amount
2025-01-15,Consulting,1500.00
2025-01-16,Rent,-800.00
";
        let report = import_csv(csv, today()).unwrap();
        assert_eq!(report.transactions[0].amount_in, dec!(1500.00));
        assert_eq!(report.transactions[0].amount_out, Decimal::ZERO);
        assert_eq!(report.transactions[1].amount_out, dec!(800.00));
    }

    #[test]
    fn test_import_empty_input_is_fatal() {
        assert!(matches!(
            import_csv("", today()),
            Err(LedgerError::EmptyInput)
        ));
        assert!(matches!(
            import_csv("   \n  ", today()),
            Err(LedgerError::EmptyInput)
        ));
    }

    #[test]
    fn test_import_zero_valid_rows_is_fatal() {
        let csv = "\
Data;Descrição;Valor
;;
15/01/2025;Sem valor;0,00
";
        assert!(matches!(
            import_csv(csv, today()),
            Err(LedgerError::NoValidRows { .. })
        ));
    }

    #[test]
    fn test_import_bad_date_falls_back_with_warning() {
        let csv = "\
Data;Descrição;Valor
not-a-date;Venda;100,00
";
        let report = import_csv(csv, today()).unwrap();
        let tx = &report.transactions[0];
        assert_eq!(tx.date, today());
        assert!(tx.date_estimated);
        assert!(report.warnings.iter().any(|w| w.line == 2));
    }

    #[test]
    fn test_import_skips_zero_amount_rows() {
        let csv = "\
Data;Descrição;Entrada;Saída
15/01/2025;Com valor;100,00;0,00
16/01/2025;Sem valor;0,00;0,00
";
        let report = import_csv(csv, today()).unwrap();
        assert_eq!(report.transactions.len(), 1);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn test_import_warns_on_unrecognized_headers() {
        let csv = "\
Coluna A;Coluna B;Valor
15/01/2025;Venda;100,00
";
        let report = import_csv(csv, today()).unwrap();
        assert!(report
            .warnings
            .iter()
            .any(|w| w.line == 0 && w.message.contains("date header")));
        assert_eq!(
            report.transactions[0].date,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert_eq!(report.transactions[0].description, "Venda");
    }

    #[test]
    fn test_import_doubled_quotes_unescape() {
        let csv = "\
date,description,amount
2025-01-15,\"Pagamento \"\"urgente\"\" ao fornecedor\",100.00
";
        let report = import_csv(csv, today()).unwrap();
        assert_eq!(
            report.transactions[0].description,
            "Pagamento \"urgente\" ao fornecedor"
        );
    }

    #[test]
    fn test_unsupported_file_type() {
        assert!(ensure_supported_extension("extrato.csv").is_ok());
        assert!(ensure_supported_extension("EXTRATO.CSV").is_ok());
        assert!(ensure_supported_extension("extrato.txt").is_ok());
        assert!(matches!(
            ensure_supported_extension("extrato.xlsx"),
            Err(LedgerError::UnsupportedFileType(_))
        ));
    }

    #[test]
    fn test_detect_separator() {
        assert_eq!(detect_separator("a,b,c"), b',');
        assert_eq!(detect_separator("a;b;c"), b';');
        assert_eq!(detect_separator("a\tb\tc"), b'\t');
        assert_eq!(detect_separator("sem separador"), b',');
    }

    #[test]
    fn test_category_column_seeds_level1() {
        let csv = "\
Data;Descrição;Valor;Categoria
15/01/2025;Venda;100,00;1.0 RECEITAS OPERACIONAIS
";
        let report = import_csv(csv, today()).unwrap();
        assert_eq!(
            report.transactions[0].classification.level1.as_deref(),
            Some("1.0 RECEITAS OPERACIONAIS")
        );
    }
}
