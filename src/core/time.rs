//! Shared timestamp and identifier helpers.

use ulid::Ulid;

/// Returns unix-epoch seconds with `Z` suffix (e.g. `1771220592Z`).
pub fn now_epoch_z() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("{}Z", secs)
}

pub fn new_event_id() -> String {
    Ulid::new().to_string()
}

/// Opaque entity id: a kind prefix followed by a ULID (`P_01J...`).
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}
