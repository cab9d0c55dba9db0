//! Sweeps the active ledger into a frozen archive.
//!
//! The whole sequence (read active set, compute splits, insert archive, move
//! transactions, record person totals) runs inside one immediate SQLite
//! transaction. The write lock is held from the first read, so no
//! transaction can slip in between counting the active set and sweeping it,
//! and any failure rolls back every step.

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};
use serde::Serialize;

use crate::db::{new_id, now};
use crate::error::{LedgerError, Result};
use crate::ledger;
use crate::models::{Archive, ArchivePersonTotal};
use crate::registry::list_people;
use crate::splits::{compute_totals, grand_total};

pub const NO_ACTIVE_TRANSACTIONS: &str = "no active transactions to archive";

/// Shares whose magnitude is below this are float residue from offsetting
/// charges and get no snapshot row. Far smaller than any real split share.
const ZERO_SHARE: f64 = 1e-9;

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveOutcome {
    pub archive: Archive,
    pub person_totals: Vec<ArchivePersonTotal>,
}

const ARCHIVE_COLUMNS: &str =
    "id, name, description, archived_at, transaction_count, total_amount, created_at, updated_at";

fn archive_from_row(row: &Row<'_>) -> rusqlite::Result<Archive> {
    Ok(Archive {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        archived_at: row.get(3)?,
        transaction_count: row.get(4)?,
        total_amount: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

pub fn create_archive(conn: &mut Connection, name: &str, description: Option<&str>) -> Result<ArchiveOutcome> {
    let name = name.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation("archive name is required".to_string()));
    }
    let description = description.map(str::trim).filter(|d| !d.is_empty());

    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let active = ledger::list_active(&tx)?;
    if active.is_empty() {
        return Err(LedgerError::PreconditionFailed(NO_ACTIVE_TRANSACTIONS.to_string()));
    }

    let totals = compute_totals(&active, &list_people(&tx)?);
    let total_amount = grand_total(&totals)?;
    // Counts unassigned transactions too, unlike total_amount.
    let transaction_count = active.len() as i64;

    let ts = now();
    let archive = Archive {
        id: new_id(),
        name: name.to_string(),
        description: description.map(str::to_string),
        archived_at: ts.clone(),
        transaction_count,
        total_amount,
        created_at: ts.clone(),
        updated_at: ts,
    };
    tx.execute(
        &format!("INSERT INTO archives ({ARCHIVE_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
        rusqlite::params![
            archive.id,
            archive.name,
            archive.description,
            archive.archived_at,
            archive.transaction_count,
            archive.total_amount,
            archive.created_at,
            archive.updated_at,
        ],
    )?;

    let moved = ledger::move_all_active_to(&tx, &archive.id)?;
    if moved as i64 != transaction_count {
        return Err(LedgerError::Internal(format!(
            "archive swept {moved} transactions but counted {transaction_count}"
        )));
    }

    let mut person_totals = Vec::with_capacity(totals.len());
    {
        let mut insert = tx.prepare_cached(
            "INSERT INTO archive_person_totals (archive_id, person_id, person_name, total_amount) \
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for total in totals.iter().filter(|t| t.total.abs() >= ZERO_SHARE) {
            insert.execute(rusqlite::params![archive.id, total.person_id, total.person, total.total])?;
            person_totals.push(ArchivePersonTotal {
                archive_id: archive.id.clone(),
                person_id: total.person_id.clone(),
                person_name: total.person.clone(),
                total_amount: total.total,
            });
        }
    }

    tx.commit()?;
    tracing::info!(
        archive_id = %archive.id,
        name = %archive.name,
        transaction_count,
        total_amount,
        people = person_totals.len(),
        "archive created"
    );
    Ok(ArchiveOutcome {
        archive,
        person_totals,
    })
}

pub fn get_archive(conn: &Connection, id: &str) -> Result<Archive> {
    conn.query_row(
        &format!("SELECT {ARCHIVE_COLUMNS} FROM archives WHERE id = ?1"),
        [id],
        archive_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("archive {id}")))
}

/// Most recent first.
pub fn list_archives(conn: &Connection) -> Result<Vec<Archive>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ARCHIVE_COLUMNS} FROM archives ORDER BY archived_at DESC, rowid DESC"
    ))?;
    let rows = stmt
        .query_map([], archive_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn archive_person_totals(conn: &Connection, id: &str) -> Result<Vec<ArchivePersonTotal>> {
    let mut stmt = conn.prepare(
        "SELECT archive_id, person_id, person_name, total_amount FROM archive_person_totals \
         WHERE archive_id = ?1 ORDER BY person_name, person_id",
    )?;
    let rows = stmt
        .query_map([id], |row| {
            Ok(ArchivePersonTotal {
                archive_id: row.get(0)?,
                person_id: row.get(1)?,
                person_name: row.get(2)?,
                total_amount: row.get(3)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The archive row plus its frozen person totals.
pub fn archive_details(conn: &Connection, id: &str) -> Result<ArchiveOutcome> {
    let archive = get_archive(conn, id)?;
    let person_totals = archive_person_totals(conn, id)?;
    Ok(ArchiveOutcome {
        archive,
        person_totals,
    })
}

pub fn archived_transactions(conn: &Connection, id: &str) -> Result<Vec<crate::models::Transaction>> {
    get_archive(conn, id)?;
    ledger::list_archived(conn, id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_db;
    use crate::models::NewTransaction;
    use crate::registry::{create_person, delete_person};

    const EPSILON: f64 = 0.01;

    fn add_txn(conn: &mut Connection, description: &str, amount: f64, people: &[&str]) -> String {
        let new = NewTransaction {
            description: description.to_string(),
            amount,
            ..Default::default()
        };
        let t = ledger::create_transaction(conn, &new).unwrap();
        let ids: Vec<String> = people.iter().map(|s| s.to_string()).collect();
        ledger::assign(conn, &t.id, &ids).unwrap();
        t.id
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_empty_ledger_is_precondition_failure() {
        let (_dir, mut conn) = test_db();
        let err = create_archive(&mut conn, "January", None).unwrap_err();
        assert!(matches!(err, LedgerError::PreconditionFailed(_)));
        assert!(err.to_string().contains("no active transactions"));
        assert_eq!(count(&conn, "archives"), 0);
    }

    #[test]
    fn test_blank_name_rejected() {
        let (_dir, mut conn) = test_db();
        add_txn(&mut conn, "Lunch", 10.0, &[]);
        let err = create_archive(&mut conn, "  ", None).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert_eq!(ledger::count_active(&conn).unwrap(), 1);
    }

    #[test]
    fn test_archive_snapshots_and_sweeps() {
        let (_dir, mut conn) = test_db();
        let alice = create_person(&conn, "Alice", None).unwrap();
        let bob = create_person(&conn, "Bob", None).unwrap();
        add_txn(&mut conn, "Lunch", 25.50, &[&alice.id]);
        add_txn(&mut conn, "Coffee", 4.50, &[&alice.id]);
        add_txn(&mut conn, "Gas", 40.00, &[&bob.id]);
        add_txn(&mut conn, "Unclaimed", 100.00, &[]);

        let outcome = create_archive(&mut conn, "January", Some("Trip")).unwrap();

        assert_eq!(outcome.archive.transaction_count, 4);
        assert!((outcome.archive.total_amount - 70.0).abs() < EPSILON);
        assert_eq!(outcome.archive.description.as_deref(), Some("Trip"));
        assert_eq!(outcome.person_totals.len(), 2);
        assert_eq!(outcome.person_totals[0].person_name, "Alice");
        assert!((outcome.person_totals[0].total_amount - 30.0).abs() < EPSILON);
        assert_eq!(outcome.person_totals[1].person_name, "Bob");

        assert!(ledger::list_active(&conn).unwrap().is_empty());
        let archived = archived_transactions(&conn, &outcome.archive.id).unwrap();
        assert_eq!(archived.len(), 4);
        assert!(archived.iter().all(|t| t.archive_id.as_deref() == Some(outcome.archive.id.as_str())));
    }

    #[test]
    fn test_zero_share_people_have_no_snapshot_row() {
        let (_dir, mut conn) = test_db();
        let alice = create_person(&conn, "Alice", None).unwrap();
        let bob = create_person(&conn, "Bob", None).unwrap();
        add_txn(&mut conn, "Refund", -10.0, &[&bob.id]);
        add_txn(&mut conn, "Charge", 10.0, &[&bob.id]);
        add_txn(&mut conn, "Lunch", 8.0, &[&alice.id]);

        let outcome = create_archive(&mut conn, "Feb", None).unwrap();
        assert_eq!(outcome.person_totals.len(), 1);
        assert_eq!(outcome.person_totals[0].person_id, alice.id);
        assert_eq!(count(&conn, "archive_person_totals"), 1);
    }

    #[test]
    fn test_float_residue_is_not_a_share() {
        let (_dir, mut conn) = test_db();
        let alice = create_person(&conn, "Alice", None).unwrap();
        let bob = create_person(&conn, "Bob", None).unwrap();
        add_txn(&mut conn, "Tip", 0.1, &[&bob.id]);
        add_txn(&mut conn, "Snack", 0.2, &[&bob.id]);
        add_txn(&mut conn, "Refund", -0.3, &[&bob.id]);
        add_txn(&mut conn, "Penny", 0.01, &[&alice.id, &bob.id]);

        let outcome = create_archive(&mut conn, "Residue", None).unwrap();
        assert_eq!(outcome.person_totals.len(), 2);
        let names: Vec<&str> = outcome.person_totals.iter().map(|t| t.person_name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert!((outcome.person_totals[0].total_amount - 0.005).abs() < 1e-12);
    }

    #[test]
    fn test_residue_only_person_gets_no_row() {
        let (_dir, mut conn) = test_db();
        let alice = create_person(&conn, "Alice", None).unwrap();
        let bob = create_person(&conn, "Bob", None).unwrap();
        add_txn(&mut conn, "Tip", 0.1, &[&bob.id]);
        add_txn(&mut conn, "Snack", 0.2, &[&bob.id]);
        add_txn(&mut conn, "Refund", -0.3, &[&bob.id]);
        add_txn(&mut conn, "Lunch", 8.0, &[&alice.id]);

        let outcome = create_archive(&mut conn, "Residue", None).unwrap();
        assert_eq!(outcome.person_totals.len(), 1);
        assert_eq!(outcome.person_totals[0].person_id, alice.id);
        assert_eq!(count(&conn, "archive_person_totals"), 1);
    }

    #[test]
    fn test_second_archive_only_takes_new_transactions() {
        let (_dir, mut conn) = test_db();
        add_txn(&mut conn, "One", 1.0, &[]);
        let first = create_archive(&mut conn, "First", None).unwrap();
        assert!(matches!(
            create_archive(&mut conn, "Again", None),
            Err(LedgerError::PreconditionFailed(_))
        ));
        add_txn(&mut conn, "Two", 2.0, &[]);
        add_txn(&mut conn, "Three", 3.0, &[]);
        let second = create_archive(&mut conn, "Second", None).unwrap();

        assert_eq!(second.archive.transaction_count, 2);
        assert_eq!(archived_transactions(&conn, &first.archive.id).unwrap().len(), 1);

        let listed = list_archives(&conn).unwrap();
        assert_eq!(listed[0].id, second.archive.id);
        assert_eq!(listed[1].id, first.archive.id);
    }

    #[test]
    fn test_failure_rolls_back_everything() {
        let (_dir, mut conn) = test_db();
        let alice = create_person(&conn, "Alice", None).unwrap();
        add_txn(&mut conn, "Lunch", 12.0, &[&alice.id]);
        conn.execute_batch(
            "CREATE TRIGGER reject_totals BEFORE INSERT ON archive_person_totals \
             BEGIN SELECT RAISE(ABORT, 'snapshot rejected'); END;",
        )
        .unwrap();

        assert!(create_archive(&mut conn, "Broken", None).is_err());
        assert_eq!(count(&conn, "archives"), 0);
        assert_eq!(ledger::count_active(&conn).unwrap(), 1);
    }

    #[test]
    fn test_person_deletion_leaves_snapshot_frozen() {
        let (_dir, mut conn) = test_db();
        let alice = create_person(&conn, "Alice", None).unwrap();
        let txn_id = add_txn(&mut conn, "Dinner", 60.0, &[&alice.id]);
        let outcome = create_archive(&mut conn, "March", None).unwrap();

        delete_person(&mut conn, &alice.id).unwrap();

        let details = archive_details(&conn, &outcome.archive.id).unwrap();
        assert_eq!(details.person_totals.len(), 1);
        assert_eq!(details.person_totals[0].person_name, "Alice");
        assert_eq!(details.archive.total_amount, 60.0);
        assert!(ledger::get_transaction(&conn, &txn_id).unwrap().assigned_to.is_empty());
    }

    #[test]
    fn test_unknown_archive_not_found() {
        let (_dir, conn) = test_db();
        let id = new_id();
        assert!(matches!(get_archive(&conn, &id), Err(LedgerError::NotFound(_))));
        assert!(matches!(archived_transactions(&conn, &id), Err(LedgerError::NotFound(_))));
    }
}
