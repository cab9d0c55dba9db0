use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::registry::{create_person, list_people};

use super::open_db;

pub fn add(name: &str, email: Option<&str>) -> Result<()> {
    let conn = open_db()?;
    let person = create_person(&conn, name, email)?;
    println!("Added person: {} ({})", person.name, person.id);
    Ok(())
}

pub fn list() -> Result<()> {
    let conn = open_db()?;
    let people = list_people(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Email"]);
    for p in people {
        table.add_row(vec![
            Cell::new(p.id),
            Cell::new(p.name),
            Cell::new(p.email.unwrap_or_default()),
        ]);
    }
    println!("People\n{table}");
    Ok(())
}
