//! Schema normalization for raw ledger rows
//!
//! Turns a raw tabular import into canonical [`Transaction`] records, or a
//! [`RowError`] for each row that cannot be coerced. Rows keep their original
//! position as the transaction id so findings can be traced back to the
//! source file.

use crate::config::ConfigError;
use crate::Transaction;
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Date formats accepted by the normalizer, tried in order (ISO first)
const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d", "%d/%m/%Y"];

/// Raw tabular input as handed over by the upload/import collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new<S: Into<String>>(headers: Vec<S>, rows: Vec<Vec<S>>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: rows
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }
}

/// Why a row failed normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowErrorKind {
    MissingField,
    BadDate,
    BadAmount,
}

/// A row excluded from the run, reported alongside the anomaly list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize,
    pub kind: RowErrorKind,
    pub message: String,
}

impl std::fmt::Display for RowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "row {}: {}", self.row, self.message)
    }
}

/// Resolved positions of the expected columns
struct ColumnIndex {
    date: usize,
    description: usize,
    debit: usize,
    tps: usize,
    tvq: usize,
    address: Option<usize>,
}

impl ColumnIndex {
    /// Resolve headers case-insensitively, accepting the common aliases
    /// seen in client exports (vendor/fournisseur, amount/montant, gst/qst).
    fn resolve(headers: &[String]) -> Result<Self, ConfigError> {
        let find = |aliases: &[&str]| -> Option<usize> {
            headers
                .iter()
                .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
        };

        let date = find(&["date"]).ok_or(ConfigError::MissingColumn("DATE"))?;
        let description = find(&["description", "vendor", "fournisseur"])
            .ok_or(ConfigError::MissingColumn("DESCRIPTION"))?;
        let debit =
            find(&["debit", "amount", "montant"]).ok_or(ConfigError::MissingColumn("DEBIT"))?;
        let tps = find(&["tps", "gst"]).ok_or(ConfigError::MissingColumn("TPS"))?;
        let tvq = find(&["tvq", "qst"]).ok_or(ConfigError::MissingColumn("TVQ"))?;
        let address = find(&["address", "adresse"]);

        Ok(Self {
            date,
            description,
            debit,
            tps,
            tvq,
            address,
        })
    }
}

/// Normalize a raw table into transactions plus per-row errors.
///
/// A missing required column is fatal (every row would fail the same way);
/// a bad value in a single row only excludes that row.
pub fn normalize(table: &RawTable) -> Result<(Vec<Transaction>, Vec<RowError>), ConfigError> {
    let columns = ColumnIndex::resolve(&table.headers)?;
    // Currency symbols, thousands separators and stray whitespace are
    // stripped before numeric parsing.
    let cleanup = Regex::new(r"[$,\s]").unwrap();

    let mut transactions = Vec::with_capacity(table.rows.len());
    let mut errors = Vec::new();

    for (row_index, row) in table.rows.iter().enumerate() {
        match normalize_row(row_index, row, &columns, &cleanup) {
            Ok(txn) => transactions.push(txn),
            Err(err) => errors.push(err),
        }
    }

    Ok((transactions, errors))
}

fn normalize_row(
    row_index: usize,
    row: &[String],
    columns: &ColumnIndex,
    cleanup: &Regex,
) -> Result<Transaction, RowError> {
    let cell = |index: usize| row.get(index).map(|s| s.trim()).unwrap_or("");

    let date_raw = cell(columns.date);
    if date_raw.is_empty() {
        return Err(RowError {
            row: row_index,
            kind: RowErrorKind::MissingField,
            message: "missing DATE".to_string(),
        });
    }
    let date = parse_date(date_raw).ok_or_else(|| RowError {
        row: row_index,
        kind: RowErrorKind::BadDate,
        message: format!("unparseable date: {date_raw:?}"),
    })?;

    let description_raw = cell(columns.description);
    if description_raw.is_empty() {
        return Err(RowError {
            row: row_index,
            kind: RowErrorKind::MissingField,
            message: "missing DESCRIPTION".to_string(),
        });
    }

    let debit_raw = cell(columns.debit);
    if debit_raw.is_empty() {
        return Err(RowError {
            row: row_index,
            kind: RowErrorKind::MissingField,
            message: "missing DEBIT".to_string(),
        });
    }
    let debit = parse_amount(debit_raw, cleanup).ok_or_else(|| RowError {
        row: row_index,
        kind: RowErrorKind::BadAmount,
        message: format!("unparseable or negative DEBIT: {debit_raw:?}"),
    })?;

    // Empty tax cells are common in real exports and mean "no tax charged".
    let tps = parse_tax(cell(columns.tps), cleanup).map_err(|raw| RowError {
        row: row_index,
        kind: RowErrorKind::BadAmount,
        message: format!("unparseable or negative TPS: {raw:?}"),
    })?;
    let tvq = parse_tax(cell(columns.tvq), cleanup).map_err(|raw| RowError {
        row: row_index,
        kind: RowErrorKind::BadAmount,
        message: format!("unparseable or negative TVQ: {raw:?}"),
    })?;

    let address = columns.address.and_then(|i| {
        let a = cell(i);
        (!a.is_empty()).then(|| a.to_string())
    });

    Ok(Transaction {
        id: row_index,
        date,
        description: description_raw.to_uppercase(),
        debit,
        tps,
        tvq,
        address,
    })
}

/// First successful parse wins, ISO tried first.
fn parse_date(raw: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Coerce a currency cell to a non-negative finite amount.
fn parse_amount(raw: &str, cleanup: &Regex) -> Option<f64> {
    let stripped = cleanup.replace_all(raw, "");
    let value: f64 = stripped.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn parse_tax(raw: &str, cleanup: &Regex) -> Result<f64, String> {
    if raw.is_empty() {
        return Ok(0.0);
    }
    parse_amount(raw, cleanup).ok_or_else(|| raw.to_string())
}
