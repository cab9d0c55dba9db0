use std::path::PathBuf;

use crate::error::Result;
use crate::importer::import_file;

use super::open_db;

pub fn run(file: &str) -> Result<()> {
    let file_path = PathBuf::from(file);
    let mut conn = open_db()?;

    let result = import_file(&mut conn, &file_path)?;
    println!("{} imported, {} skipped (duplicates)", result.imported, result.skipped);
    Ok(())
}
