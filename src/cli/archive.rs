use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::archiver::{archive_details, archived_transactions, create_archive, list_archives, ArchiveOutcome};
use crate::error::{parse_id, Result};
use crate::fmt::money;

use super::open_db;

pub fn create(name: &str, description: Option<&str>) -> Result<()> {
    let mut conn = open_db()?;
    let outcome = create_archive(&mut conn, name, description)?;
    println!(
        "{} {} ({} transactions, {})",
        "Archived".green().bold(),
        outcome.archive.name,
        outcome.archive.transaction_count,
        money(outcome.archive.total_amount)
    );
    print_person_totals(&outcome);
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let archives = list_archives(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Archived", "Count", "Total"]);
    for a in archives {
        table.add_row(vec![
            Cell::new(a.id),
            Cell::new(a.name),
            Cell::new(a.archived_at),
            Cell::new(a.transaction_count).set_alignment(CellAlignment::Right),
            Cell::new(money(a.total_amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Archives\n{table}");
    Ok(())
}

pub fn show(id: &str) -> Result<()> {
    let id = parse_id(id, "archive")?;
    let conn = open_db()?;
    let details = archive_details(&conn, &id)?;
    let contents = archived_transactions(&conn, &id)?;

    println!("{}", details.archive.name.bold());
    if let Some(desc) = details.archive.description.as_deref().filter(|d| !d.is_empty()) {
        println!("{desc}");
    }
    println!("Archived at {}", details.archive.archived_at);
    print_person_totals(&details);

    let mut table = Table::new();
    table.set_header(vec!["Date", "Description", "Amount", "Shared by"]);
    for t in contents {
        table.add_row(vec![
            Cell::new(t.transaction_date.unwrap_or_default()),
            Cell::new(t.description),
            Cell::new(money(t.amount)).set_alignment(CellAlignment::Right),
            Cell::new(t.assigned_to.len()).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("Transactions\n{table}");
    Ok(())
}

fn print_person_totals(outcome: &ArchiveOutcome) {
    if outcome.person_totals.is_empty() {
        println!("{}", "No person totals recorded.".yellow());
        return;
    }
    let mut table = Table::new();
    table.set_header(vec!["Person", "Share"]);
    for pt in &outcome.person_totals {
        table.add_row(vec![
            Cell::new(&pt.person_name),
            Cell::new(money(pt.total_amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{table}");
}
