use std::collections::BTreeSet;

use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::{new_id, now};
use crate::error::{LedgerError, Result};
use crate::models::{NewTransaction, Transaction};

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

/// Transaction columns plus the assignment set folded into one text column.
const SELECT_TRANSACTION: &str = "\
    SELECT t.id, t.description, t.amount, t.transaction_date, t.posted_date, t.card_number, \
           t.file_name, t.category_id, t.archive_id, t.created_at, t.updated_at, \
           (SELECT group_concat(tp.person_id, ',') FROM transaction_people tp \
            WHERE tp.transaction_id = t.id) AS assigned \
    FROM transactions t";

/// Newest upload first; rowid breaks ties inside the same millisecond.
const NEWEST_FIRST: &str = "ORDER BY t.created_at DESC, t.rowid DESC";

fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let assigned: Option<String> = row.get(11)?;
    let mut assigned_to: Vec<String> = assigned
        .map(|s| s.split(',').map(str::to_string).collect())
        .unwrap_or_default();
    assigned_to.sort();
    Ok(Transaction {
        id: row.get(0)?,
        description: row.get(1)?,
        amount: row.get(2)?,
        transaction_date: row.get(3)?,
        posted_date: row.get(4)?,
        card_number: row.get(5)?,
        file_name: row.get(6)?,
        category_id: row.get(7)?,
        archive_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        assigned_to,
    })
}

fn query_transactions(
    conn: &Connection,
    clause: &str,
    params: &[&dyn rusqlite::types::ToSql],
) -> Result<Vec<Transaction>> {
    let sql = format!("{SELECT_TRANSACTION} WHERE {clause} {NEWEST_FIRST}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Round to cents. Amounts are stored with 2-decimal precision.
pub fn round_amount(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

fn normalize(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn validate(new: &NewTransaction) -> Result<(String, f64)> {
    let description = new.description.trim();
    if description.is_empty() {
        return Err(LedgerError::Validation("description is required".to_string()));
    }
    // Huge finite inputs overflow once scaled to cents, so check after rounding.
    let amount = round_amount(new.amount);
    if !amount.is_finite() {
        return Err(LedgerError::Validation(format!("invalid amount: {}", new.amount)));
    }
    Ok((description.to_string(), amount))
}

fn ensure_category(conn: &Connection, id: &str) -> Result<()> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM categories WHERE id = ?1")?
        .exists([id])?;
    if exists {
        Ok(())
    } else {
        Err(LedgerError::NotFound(format!("category {id}")))
    }
}

fn ensure_transaction(conn: &Connection, id: &str) -> Result<()> {
    let exists = conn
        .prepare_cached("SELECT 1 FROM transactions WHERE id = ?1")?
        .exists([id])?;
    if exists {
        Ok(())
    } else {
        Err(LedgerError::NotFound(format!("transaction {id}")))
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Insert a new active, unassigned transaction. Duplicate detection is the
/// importer's job; this never re-checks.
pub fn create_transaction(conn: &Connection, new: &NewTransaction) -> Result<Transaction> {
    let (description, amount) = validate(new)?;
    let category_id = normalize(&new.category_id);
    if let Some(category_id) = &category_id {
        ensure_category(conn, category_id)?;
    }
    let ts = now();
    let id = new_id();
    conn.execute(
        "INSERT INTO transactions (id, description, amount, transaction_date, posted_date, \
         card_number, file_name, category_id, archive_id, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, NULL, ?9, ?9)",
        rusqlite::params![
            id,
            description,
            amount,
            normalize(&new.transaction_date),
            normalize(&new.posted_date),
            normalize(&new.card_number),
            normalize(&new.file_name),
            category_id,
            ts,
        ],
    )?;
    get_transaction(conn, &id)
}

/// Replace the whole assignment set. Callers compute the new full set;
/// repeated ids collapse to one assignee.
pub fn assign(conn: &mut Connection, id: &str, person_ids: &[String]) -> Result<Transaction> {
    let people: BTreeSet<&str> = person_ids.iter().map(String::as_str).collect();
    let tx = conn.transaction()?;
    ensure_transaction(&tx, id)?;
    {
        let mut known = tx.prepare_cached("SELECT 1 FROM people WHERE id = ?1")?;
        for person_id in &people {
            if !known.exists([*person_id])? {
                return Err(LedgerError::NotFound(format!("person {person_id}")));
            }
        }
    }
    tx.execute("DELETE FROM transaction_people WHERE transaction_id = ?1", [id])?;
    {
        let mut insert = tx.prepare_cached(
            "INSERT INTO transaction_people (transaction_id, person_id) VALUES (?1, ?2)",
        )?;
        for person_id in &people {
            insert.execute([id, *person_id])?;
        }
    }
    tx.execute(
        "UPDATE transactions SET updated_at = ?1 WHERE id = ?2",
        rusqlite::params![now(), id],
    )?;
    let updated = get_transaction(&tx, id)?;
    tx.commit()?;
    tracing::debug!(transaction_id = %id, assignees = people.len(), "assignment replaced");
    Ok(updated)
}

pub fn set_category(conn: &Connection, id: &str, category_id: Option<&str>) -> Result<Transaction> {
    ensure_transaction(conn, id)?;
    if let Some(category_id) = category_id {
        ensure_category(conn, category_id)?;
    }
    conn.execute(
        "UPDATE transactions SET category_id = ?1, updated_at = ?2 WHERE id = ?3",
        rusqlite::params![category_id, now(), id],
    )?;
    get_transaction(conn, id)
}

/// Delete one transaction, active or archived. Unknown ids delete nothing.
pub fn delete_transaction(conn: &Connection, id: &str) -> Result<usize> {
    Ok(conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?)
}

/// Delete every active transaction. Archived ones are never touched.
pub fn clear_active(conn: &Connection) -> Result<usize> {
    let removed = conn.execute("DELETE FROM transactions WHERE archive_id IS NULL", [])?;
    tracing::info!(removed, "cleared active transactions");
    Ok(removed)
}

/// Remove a person from every transaction that references them, including
/// archived ones. Archive snapshots are left as recorded.
pub fn unassign_person(conn: &Connection, person_id: &str) -> Result<usize> {
    conn.execute(
        "UPDATE transactions SET updated_at = ?1 WHERE id IN \
         (SELECT transaction_id FROM transaction_people WHERE person_id = ?2)",
        rusqlite::params![now(), person_id],
    )?;
    Ok(conn.execute("DELETE FROM transaction_people WHERE person_id = ?1", [person_id])?)
}

/// Sweep every currently active transaction into `archive_id`. Only the
/// archive engine calls this, inside its own unit of work.
pub fn move_all_active_to(conn: &Connection, archive_id: &str) -> Result<usize> {
    Ok(conn.execute(
        "UPDATE transactions SET archive_id = ?1, updated_at = ?2 WHERE archive_id IS NULL",
        rusqlite::params![archive_id, now()],
    )?)
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub fn get_transaction(conn: &Connection, id: &str) -> Result<Transaction> {
    let sql = format!("{SELECT_TRANSACTION} WHERE t.id = ?1");
    conn.query_row(&sql, [id], transaction_from_row)
        .optional()?
        .ok_or_else(|| LedgerError::NotFound(format!("transaction {id}")))
}

pub fn list_active(conn: &Connection) -> Result<Vec<Transaction>> {
    query_transactions(conn, "t.archive_id IS NULL", &[])
}

pub fn list_archived(conn: &Connection, archive_id: &str) -> Result<Vec<Transaction>> {
    query_transactions(conn, "t.archive_id = ?1", &[&archive_id])
}

pub fn count_active(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT count(*) FROM transactions WHERE archive_id IS NULL",
        [],
        |r| r.get(0),
    )?)
}

/// True when a transaction with the same dedup key already exists, in any
/// partition. Missing optional fields compare equal to each other.
pub fn find_duplicate(conn: &Connection, new: &NewTransaction) -> Result<bool> {
    let (description, amount) = validate(new)?;
    let mut stmt = conn.prepare_cached(
        "SELECT 1 FROM transactions WHERE description = ?1 AND amount = ?2 \
         AND transaction_date IS ?3 AND posted_date IS ?4 AND card_number IS ?5",
    )?;
    Ok(stmt.exists(rusqlite::params![
        description,
        amount,
        normalize(&new.transaction_date),
        normalize(&new.posted_date),
        normalize(&new.card_number),
    ])?)
}
