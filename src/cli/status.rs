use crate::db::get_connection;
use crate::error::Result;
use crate::settings::load_settings;

pub fn run() -> Result<()> {
    let settings = load_settings();
    let db_path = settings.db_path();

    println!("Data dir:   {}", settings.data_dir);
    println!("Database:   {}", db_path.display());
    println!("Listen:     {}", settings.listen_addr);

    if db_path.exists() {
        let conn = get_connection(&db_path)?;

        let people: i64 = conn.query_row("SELECT count(*) FROM people", [], |r| r.get(0))?;
        let active: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE archive_id IS NULL",
            [],
            |r| r.get(0),
        )?;
        let archived: i64 = conn.query_row(
            "SELECT count(*) FROM transactions WHERE archive_id IS NOT NULL",
            [],
            |r| r.get(0),
        )?;
        let archives: i64 = conn.query_row("SELECT count(*) FROM archives", [], |r| r.get(0))?;

        println!();
        println!("People:        {people}");
        println!("Active:        {active}");
        println!("Archived:      {archived}");
        println!("Archives:      {archives}");
    } else {
        println!();
        println!("Database not found. Run `splitledger init` to set up.");
    }

    Ok(())
}
