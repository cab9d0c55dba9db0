use std::sync::OnceLock;

use regex::Regex;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::{new_id, now};
use crate::error::{classify_db, LedgerError, Result};
use crate::ledger;
use crate::models::{Category, Person};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn required_name(raw: &str, what: &str) -> Result<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(LedgerError::Validation(format!("{what} name is required")));
    }
    Ok(name.to_string())
}

fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

fn color_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("static regex"))
}

pub fn validate_color(color: Option<&str>) -> Result<Option<String>> {
    match optional_text(color) {
        Some(c) if !color_pattern().is_match(&c) => Err(LedgerError::Validation(format!(
            "invalid color: {c} (expected #RRGGBB)"
        ))),
        other => Ok(other),
    }
}

// ---------------------------------------------------------------------------
// People
// ---------------------------------------------------------------------------

const PERSON_COLUMNS: &str = "id, name, email, created_at, updated_at";

fn person_from_row(row: &Row<'_>) -> rusqlite::Result<Person> {
    Ok(Person {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

pub fn create_person(conn: &Connection, name: &str, email: Option<&str>) -> Result<Person> {
    let name = required_name(name, "person")?;
    let ts = now();
    let person = Person {
        id: new_id(),
        name,
        email: optional_text(email),
        created_at: ts.clone(),
        updated_at: ts,
    };
    conn.execute(
        "INSERT INTO people (id, name, email, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![person.id, person.name, person.email, person.created_at, person.updated_at],
    )
    .map_err(|e| classify_db(e, &format!("person named '{}' already exists", person.name)))?;
    tracing::info!(person_id = %person.id, name = %person.name, "person created");
    Ok(person)
}

pub fn get_person(conn: &Connection, id: &str) -> Result<Person> {
    conn.query_row(
        &format!("SELECT {PERSON_COLUMNS} FROM people WHERE id = ?1"),
        [id],
        person_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("person {id}")))
}

pub fn list_people(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt = conn.prepare(&format!("SELECT {PERSON_COLUMNS} FROM people ORDER BY name"))?;
    let rows = stmt
        .query_map([], person_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_person(conn: &Connection, id: &str, name: &str, email: Option<&str>) -> Result<Person> {
    let name = required_name(name, "person")?;
    let changed = conn
        .execute(
            "UPDATE people SET name = ?1, email = ?2, updated_at = ?3 WHERE id = ?4",
            rusqlite::params![name, optional_text(email), now(), id],
        )
        .map_err(|e| classify_db(e, &format!("person named '{name}' already exists")))?;
    if changed == 0 {
        return Err(LedgerError::NotFound(format!("person {id}")));
    }
    get_person(conn, id)
}

/// Delete a person after stripping them from every transaction, active or
/// archived. Archive snapshots keep the frozen name and total.
pub fn delete_person(conn: &mut Connection, id: &str) -> Result<()> {
    let tx = conn.transaction()?;
    get_person(&tx, id)?;
    let stripped = ledger::unassign_person(&tx, id)?;
    tx.execute("DELETE FROM people WHERE id = ?1", [id])?;
    tx.commit()?;
    tracing::info!(person_id = %id, stripped, "person deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

const CATEGORY_COLUMNS: &str = "id, name, description, color, created_at, updated_at";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        color: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub fn create_category(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<Category> {
    let name = required_name(name, "category")?;
    let color = validate_color(color)?;
    let ts = now();
    let category = Category {
        id: new_id(),
        name,
        description: optional_text(description),
        color,
        created_at: ts.clone(),
        updated_at: ts,
    };
    conn.execute(
        "INSERT INTO categories (id, name, description, color, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            category.id,
            category.name,
            category.description,
            category.color,
            category.created_at,
            category.updated_at,
        ],
    )
    .map_err(|e| classify_db(e, &format!("category named '{}' already exists", category.name)))?;
    Ok(category)
}

pub fn get_category(conn: &Connection, id: &str) -> Result<Category> {
    conn.query_row(
        &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = ?1"),
        [id],
        category_from_row,
    )
    .optional()?
    .ok_or_else(|| LedgerError::NotFound(format!("category {id}")))
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY name"))?;
    let rows = stmt
        .query_map([], category_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn update_category(
    conn: &Connection,
    id: &str,
    name: &str,
    description: Option<&str>,
    color: Option<&str>,
) -> Result<Category> {
    let name = required_name(name, "category")?;
    let color = validate_color(color)?;
    let changed = conn
        .execute(
            "UPDATE categories SET name = ?1, description = ?2, color = ?3, updated_at = ?4 WHERE id = ?5",
            rusqlite::params![name, optional_text(description), color, now(), id],
        )
        .map_err(|e| classify_db(e, &format!("category named '{name}' already exists")))?;
    if changed == 0 {
        return Err(LedgerError::NotFound(format!("category {id}")));
    }
    get_category(conn, id)
}

/// Referencing transactions fall back to uncategorized via `ON DELETE SET NULL`.
pub fn delete_category(conn: &Connection, id: &str) -> Result<()> {
    let removed = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(LedgerError::NotFound(format!("category {id}")));
    }
    Ok(())
}
