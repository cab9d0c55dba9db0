use std::collections::HashMap;

use rusqlite::Connection;

use crate::error::{LedgerError, Result};
use crate::ledger::list_active;
use crate::models::{Person, PersonTotal, Transaction};
use crate::registry::list_people;

/// Equal-share totals per person.
///
/// Every transaction with N assignees adds amount / N to each of them.
/// Unassigned transactions contribute nothing, so the grand total is the sum
/// of assigned amounts only. Shares are summed unrounded. Assignees missing
/// from `people` are skipped. Output is ordered by name, byte-wise.
pub fn compute_totals(transactions: &[Transaction], people: &[Person]) -> Vec<PersonTotal> {
    let names: HashMap<&str, &str> = people
        .iter()
        .map(|p| (p.id.as_str(), p.name.as_str()))
        .collect();

    let mut sums: HashMap<&str, f64> = HashMap::new();
    for txn in transactions {
        if txn.assigned_to.is_empty() {
            continue;
        }
        let share = txn.amount / txn.assigned_to.len() as f64;
        for person_id in &txn.assigned_to {
            *sums.entry(person_id.as_str()).or_default() += share;
        }
    }

    let mut totals: Vec<PersonTotal> = sums
        .into_iter()
        .filter_map(|(id, total)| {
            names.get(id).map(|name| PersonTotal {
                person_id: id.to_string(),
                person: name.to_string(),
                total,
            })
        })
        .collect();
    totals.sort_by(|a, b| a.person.cmp(&b.person).then_with(|| a.person_id.cmp(&b.person_id)));
    totals
}

pub fn grand_total(totals: &[PersonTotal]) -> Result<f64> {
    let sum: f64 = totals.iter().map(|t| t.total).sum();
    if !sum.is_finite() {
        return Err(LedgerError::Internal(format!("total is not a finite number: {sum}")));
    }
    Ok(sum)
}

/// Totals over the current active set.
pub fn totals_for_active(conn: &Connection) -> Result<Vec<PersonTotal>> {
    let transactions = list_active(conn)?;
    let people = list_people(conn)?;
    Ok(compute_totals(&transactions, &people))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 0.01;

    fn person(id: &str, name: &str) -> Person {
        Person {
            id: id.to_string(),
            name: name.to_string(),
            email: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn txn(amount: f64, assigned: &[&str]) -> Transaction {
        Transaction {
            id: String::new(),
            description: "t".to_string(),
            amount,
            assigned_to: assigned.iter().map(|s| s.to_string()).collect(),
            transaction_date: None,
            posted_date: None,
            card_number: None,
            file_name: None,
            category_id: None,
            archive_id: None,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    fn lookup<'a>(totals: &'a [PersonTotal], name: &str) -> &'a PersonTotal {
        totals.iter().find(|t| t.person == name).unwrap()
    }

    #[test]
    fn test_individual_assignments_sorted_by_name() {
        let people = vec![person("b", "Bob"), person("a", "Alice")];
        let txns = vec![txn(25.50, &["a"]), txn(40.00, &["b"]), txn(4.50, &["a"])];
        let totals = compute_totals(&txns, &people);
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].person, "Alice");
        assert!((totals[0].total - 30.00).abs() < EPSILON);
        assert_eq!(totals[1].person, "Bob");
        assert!((totals[1].total - 40.00).abs() < EPSILON);
    }

    #[test]
    fn test_joint_assignments() {
        let people = vec![person("c", "Charlie"), person("d", "Diana")];
        let txns = vec![txn(60.00, &["c", "d"]), txn(80.00, &["c", "d"])];
        let totals = compute_totals(&txns, &people);
        assert!((lookup(&totals, "Charlie").total - 70.00).abs() < EPSILON);
        assert!((lookup(&totals, "Diana").total - 70.00).abs() < EPSILON);
    }

    #[test]
    fn test_three_way_split_is_exact() {
        let people = vec![person("x", "Xan"), person("y", "Yu"), person("z", "Zed")];
        let totals = compute_totals(&[txn(150.00, &["x", "y", "z"])], &people);
        assert_eq!(totals.len(), 3);
        for t in &totals {
            assert_eq!(t.total, 50.00);
        }
    }

    #[test]
    fn test_uneven_cents_within_tolerance() {
        let people = vec![person("a", "Alice"), person("b", "Bob")];
        let totals = compute_totals(&[txn(33.33, &["a", "b"])], &people);
        assert_eq!(totals.len(), 2);
        for t in &totals {
            assert!((t.total - 16.665).abs() < EPSILON);
        }
    }

    #[test]
    fn test_unassigned_excluded_from_grand_total() {
        let people = vec![person("a", "Alice")];
        let txns = vec![txn(10.0, &["a"]), txn(99.0, &[])];
        let totals = compute_totals(&txns, &people);
        assert_eq!(totals.len(), 1);
        assert!((grand_total(&totals).unwrap() - 10.0).abs() < EPSILON);
    }

    #[test]
    fn test_case_sensitive_ordering() {
        let people = vec![person("1", "alice"), person("2", "Bob"), person("3", "Alice")];
        let totals = compute_totals(&[txn(3.0, &["1", "2", "3"])], &people);
        let names: Vec<&str> = totals.iter().map(|t| t.person.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "alice"]);
    }

    #[test]
    fn test_negative_amounts_reduce_totals() {
        let people = vec![person("a", "Alice")];
        let totals = compute_totals(&[txn(50.0, &["a"]), txn(-20.0, &["a"])], &people);
        assert!((totals[0].total - 30.0).abs() < EPSILON);
    }

    #[test]
    fn test_empty_input() {
        assert!(compute_totals(&[], &[]).is_empty());
        assert_eq!(grand_total(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_grand_total_rejects_overflow() {
        let totals = vec![
            PersonTotal { person_id: "a".into(), person: "A".into(), total: f64::MAX },
            PersonTotal { person_id: "b".into(), person: "B".into(), total: f64::MAX },
        ];
        assert!(matches!(grand_total(&totals), Err(LedgerError::Internal(_))));
    }

    #[test]
    fn test_totals_for_active_reads_store() {
        let (_dir, mut conn) = crate::db::test_db();
        let alice = crate::registry::create_person(&conn, "Alice", None).unwrap();
        let new = crate::models::NewTransaction {
            description: "Lunch".into(),
            amount: 25.5,
            ..Default::default()
        };
        let t = crate::ledger::create_transaction(&conn, &new).unwrap();
        crate::ledger::assign(&mut conn, &t.id, &[alice.id.clone()]).unwrap();
        let totals = totals_for_active(&conn).unwrap();
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].person_id, alice.id);
        assert_eq!(totals[0].total, 25.5);
    }
}
