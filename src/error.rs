use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    PreconditionFailed(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Settings error: {0}")]
    Settings(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;

/// Classify a storage error by its SQLite extended code.
///
/// Unique-constraint violations become `Conflict` with the given message;
/// everything else stays a database error.
pub fn classify_db(err: rusqlite::Error, conflict: &str) -> LedgerError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY) =>
        {
            LedgerError::Conflict(conflict.to_string())
        }
        _ => LedgerError::Db(err),
    }
}

/// Parse an id supplied by a caller. Ids are UUIDs stored as text.
pub fn parse_id(raw: &str, what: &str) -> Result<String> {
    uuid::Uuid::parse_str(raw.trim())
        .map(|id| id.to_string())
        .map_err(|_| LedgerError::Validation(format!("invalid {what} id: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_accepts_uuid() {
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(parse_id(&id, "person").unwrap(), id);
    }

    #[test]
    fn test_parse_id_rejects_garbage() {
        let err = parse_id("not-an-id", "person").unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(err.to_string().contains("invalid person id"));
    }

    #[test]
    fn test_classify_unique_violation() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (name TEXT UNIQUE); INSERT INTO t VALUES ('a');")
            .unwrap();
        let err = conn.execute("INSERT INTO t VALUES ('a')", []).unwrap_err();
        assert!(matches!(classify_db(err, "dup"), LedgerError::Conflict(m) if m == "dup"));
    }

    #[test]
    fn test_classify_other_errors_stay_db() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.execute("INSERT INTO missing VALUES (1)", []).unwrap_err();
        assert!(matches!(classify_db(err, "dup"), LedgerError::Db(_)));
    }
}
