use crate::api::{self, AppState};
use crate::db::{get_connection, init_db};
use crate::error::{LedgerError, Result};
use crate::settings::load_settings;

pub fn run(addr: Option<String>) -> Result<()> {
    let settings = load_settings();
    let addr = addr.unwrap_or_else(|| settings.listen_addr.clone());

    let db_path = settings.db_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    tracing::info!("Using database {}", db_path.display());

    let runtime = tokio::runtime::Runtime::new()?;
    runtime
        .block_on(api::serve(AppState::new(conn), &addr))
        .map_err(|e| LedgerError::Internal(format!("{e:#}")))
}
