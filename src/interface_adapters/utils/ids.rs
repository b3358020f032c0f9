use crate::use_cases::ConnId;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// Connection token, unique for the lifetime of the process.
///
/// Tokens are never reused, so a stale connection can always be told apart from the one
/// that replaced it.
pub fn next_conn_id() -> ConnId {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

/// Opaque session token for the in-memory store.
pub fn session_token() -> String {
    Uuid::new_v4().to_string()
}
