use crate::core::broker::DbBroker;
use crate::core::error;
use crate::core::schemas;
use crate::core::store::Store;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

pub fn db_connect(db_path: &str) -> Result<Connection, error::FormsError> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))
        .map_err(error::FormsError::RusqliteError)?;
    conn.query_row("PRAGMA journal_mode=WAL;", [], |_| Ok(()))
        .map_err(error::FormsError::RusqliteError)?;
    conn.execute("PRAGMA foreign_keys=ON;", [])
        .map_err(error::FormsError::RusqliteError)?;
    Ok(conn)
}

pub fn forms_db_path(store: &Store) -> PathBuf {
    store.db_path()
}

pub fn initialize_forms_db(store: &Store) -> Result<(), error::FormsError> {
    fs::create_dir_all(&store.root).map_err(error::FormsError::IoError)?;

    let db_path = forms_db_path(store);
    let broker = DbBroker::new(store);
    broker.with_conn(&db_path, "forms.init", |conn| {
        for statement in schemas::FORMS_DB_SCHEMA {
            conn.execute(statement, [])?;
        }
        Ok(())
    })?;

    tracing::debug!(path = %db_path.display(), "forms database initialized");
    Ok(())
}
