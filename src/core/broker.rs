use crate::core::db;
use crate::core::error;
use crate::core::store::Store;
use crate::core::time;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Kind of entity an audit event refers to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEntity {
    Form,
    Page,
    Condition,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    MakeLive,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuditEvent {
    pub ts: String,
    pub event_id: String,
    pub actor: String,
    pub op: String,
    pub entity: AuditEntity,
    pub entity_id: String,
    pub form_id: String,
    pub event: AuditAction,
}

/// Listener for committed mutations. Never consulted for decisions.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: &AuditEvent) -> Result<(), error::FormsError>;
}

/// Appends one JSON object per line to the audit log file.
pub struct JsonlAuditLog {
    path: PathBuf,
}

impl JsonlAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSink for JsonlAuditLog {
    fn record(&self, event: &AuditEvent) -> Result<(), error::FormsError> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(error::FormsError::IoError)?;

        writeln!(f, "{}", serde_json::to_string(event)?).map_err(error::FormsError::IoError)?;
        Ok(())
    }
}

pub struct NoopAudit;

impl AuditSink for NoopAudit {
    fn record(&self, _event: &AuditEvent) -> Result<(), error::FormsError> {
        Ok(())
    }
}

/// The DB Broker is the single path for state access.
///
/// Writes are serialized in-process and run inside one SQLite transaction;
/// audit events go out only after the transaction commits.
pub struct DbBroker {
    actor: String,
    audit: Arc<dyn AuditSink>,
}

impl DbBroker {
    pub fn new(store: &Store) -> Self {
        let audit: Arc<dyn AuditSink> = if store.audit_enabled {
            Arc::new(JsonlAuditLog::new(store.audit_log_path()))
        } else {
            Arc::new(NoopAudit)
        };
        Self {
            actor: store.actor.clone(),
            audit,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    /// Execute a closure with a serialized connection to the specified DB.
    pub fn with_conn<F, R>(&self, db_path: &Path, op_name: &str, f: F) -> Result<R, error::FormsError>
    where
        F: FnOnce(&Connection) -> Result<R, error::FormsError>,
    {
        let _lock = db_lock();
        let conn = db::db_connect(&db_path.to_string_lossy())?;
        tracing::debug!(op = op_name, "broker read");
        f(&conn)
    }

    /// Execute a closure inside one transaction: commit on `Ok`, roll back on `Err`.
    pub fn with_tx<F, R>(&self, db_path: &Path, op_name: &str, f: F) -> Result<R, error::FormsError>
    where
        F: FnOnce(&Connection) -> Result<R, error::FormsError>,
    {
        let _lock = db_lock();
        let mut conn = db::db_connect(&db_path.to_string_lossy())?;
        let tx = conn.transaction()?;

        match f(&tx) {
            Ok(value) => {
                tx.commit()?;
                tracing::debug!(op = op_name, "broker commit");
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(op = op_name, error = %e, "broker rollback");
                // Dropping the transaction rolls it back.
                drop(tx);
                Err(e)
            }
        }
    }

    /// Fire-and-forget notification of a committed mutation.
    pub fn notify(
        &self,
        op: &str,
        entity: AuditEntity,
        entity_id: &str,
        form_id: &str,
        event: AuditAction,
    ) {
        let ev = AuditEvent {
            ts: time::now_epoch_z(),
            event_id: time::new_event_id(),
            actor: self.actor.clone(),
            op: op.to_string(),
            entity,
            entity_id: entity_id.to_string(),
            form_id: form_id.to_string(),
            event,
        };
        if let Err(e) = self.audit.record(&ev) {
            tracing::warn!(op, entity_id, error = %e, "audit event dropped");
        }
    }
}

/// The lock guards no data, so a poisoned lock is simply taken back.
fn db_lock() -> MutexGuard<'static, ()> {
    static DB_LOCK: Mutex<()> = Mutex::new(());
    DB_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}
