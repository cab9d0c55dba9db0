use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::ledger::count_active;
use crate::splits::{grand_total, totals_for_active};

use super::open_db;

pub fn run() -> Result<()> {
    let conn = open_db()?;
    let totals = totals_for_active(&conn)?;
    let active = count_active(&conn)?;

    if totals.is_empty() {
        println!("No assigned transactions ({active} active).");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Person", "Share"]);
    for t in &totals {
        table.add_row(vec![
            Cell::new(&t.person),
            Cell::new(money(t.total)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        Cell::new("Total".bold()),
        Cell::new(money(grand_total(&totals)?).bold()).set_alignment(CellAlignment::Right),
    ]);
    println!("Totals across {active} active transactions\n{table}");
    Ok(())
}
