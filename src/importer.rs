use std::path::Path;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::db::now;
use crate::error::{LedgerError, Result};
use crate::ledger;
use crate::models::NewTransaction;

/// A validated record handed over by an ingestion source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestRecord {
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub transaction_date: Option<String>,
    #[serde(default)]
    pub posted_date: Option<String>,
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}

impl IngestRecord {
    fn to_new_transaction(&self, file_name: Option<&str>) -> NewTransaction {
        NewTransaction {
            description: self.description.clone(),
            amount: self.amount,
            transaction_date: self.transaction_date.clone(),
            posted_date: self.posted_date.clone(),
            card_number: self.card_number.clone(),
            file_name: file_name.map(str::to_string),
            category_id: self.category_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s: String = raw.chars().filter(|c| !matches!(c, ',' | '"' | '$')).collect();
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

/// Accepts `YYYY-MM-DD` or `MM/DD/YYYY`; returns `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| chrono::NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

// ---------------------------------------------------------------------------
// Ingestion
// ---------------------------------------------------------------------------

/// Insert every record whose dedup key is not already present, in any
/// partition. Records repeated inside the batch are inserted once. The batch
/// is all-or-nothing.
pub fn ingest(
    conn: &mut Connection,
    file_name: Option<&str>,
    checksum: Option<&str>,
    records: &[IngestRecord],
) -> Result<ImportResult> {
    let tx = conn.transaction()?;
    let mut imported = 0usize;
    let mut skipped = 0usize;
    for record in records {
        let new = record.to_new_transaction(file_name);
        if ledger::find_duplicate(&tx, &new)? {
            skipped += 1;
            continue;
        }
        ledger::create_transaction(&tx, &new)?;
        imported += 1;
    }
    tx.execute(
        "INSERT INTO imports (file_name, record_count, imported, skipped, checksum, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![file_name, records.len() as i64, imported as i64, skipped as i64, checksum, now()],
    )?;
    tx.commit()?;
    tracing::info!(file_name = ?file_name, imported, skipped, "ingested batch");
    Ok(ImportResult { imported, skipped })
}

// ---------------------------------------------------------------------------
// Card statement CSV
// ---------------------------------------------------------------------------

struct Columns {
    transaction_date: usize,
    posted_date: Option<usize>,
    card_number: Option<usize>,
    description: usize,
    debit: Option<usize>,
    credit: Option<usize>,
    amount: Option<usize>,
}

impl Columns {
    fn from_header(header: &csv::StringRecord) -> Option<Self> {
        let find = |names: &[&str]| {
            header
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };
        let columns = Columns {
            transaction_date: find(&["Transaction Date", "Date"])?,
            posted_date: find(&["Posted Date", "Post Date"]),
            card_number: find(&["Card No.", "Card No", "Card Number"]),
            description: find(&["Description"])?,
            debit: find(&["Debit"]),
            credit: find(&["Credit"]),
            amount: find(&["Amount"]),
        };
        if columns.amount.is_none() && columns.debit.is_none() && columns.credit.is_none() {
            return None;
        }
        Some(columns)
    }

    fn field<'r>(record: &'r csv::StringRecord, idx: Option<usize>) -> Option<&'r str> {
        idx.and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Debits are charges (positive), credits are refunds or payments (negative).
    fn amount(&self, record: &csv::StringRecord) -> Option<f64> {
        if let Some(v) = Self::field(record, self.debit).and_then(parse_amount) {
            return Some(v.abs());
        }
        if let Some(v) = Self::field(record, self.credit).and_then(parse_amount) {
            return Some(-v.abs());
        }
        Self::field(record, self.amount).and_then(parse_amount)
    }
}

/// Read a card statement export. The header row is located by column names;
/// the statement's own category column is ignored. Rows without a
/// description, a parseable date or an amount are dropped.
pub fn parse_csv(data: &[u8]) -> Result<Vec<IngestRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data);
    let mut columns: Option<Columns> = None;
    let mut rows = Vec::new();

    for result in rdr.records() {
        let record = result?;
        let Some(cols) = &columns else {
            columns = Columns::from_header(&record);
            continue;
        };
        let Some(description) = Columns::field(&record, Some(cols.description)) else {
            continue;
        };
        let Some(transaction_date) =
            Columns::field(&record, Some(cols.transaction_date)).and_then(parse_date)
        else {
            continue;
        };
        let Some(amount) = cols.amount(&record) else {
            continue;
        };
        rows.push(IngestRecord {
            description: description.to_string(),
            amount,
            transaction_date: Some(transaction_date),
            posted_date: Columns::field(&record, cols.posted_date).and_then(parse_date),
            card_number: Columns::field(&record, cols.card_number).map(str::to_string),
            category_id: None,
        });
    }

    if columns.is_none() {
        return Err(LedgerError::Validation(
            "no header row with date, description and amount columns".to_string(),
        ));
    }
    Ok(rows)
}

/// Read, parse and ingest a statement file.
pub fn import_file(conn: &mut Connection, file_path: &Path) -> Result<ImportResult> {
    let data = std::fs::read(file_path)?;
    let checksum = compute_checksum(&data);
    let records = parse_csv(&data)?;
    let file_name = file_path.file_name().and_then(|n| n.to_str());
    ingest(conn, file_name, Some(&checksum), &records)
}
