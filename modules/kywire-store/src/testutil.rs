//! Test helper: a migrated in-memory store.

use crate::{migrate, Store};

/// Open an in-memory SQLite store with the full schema applied.
pub async fn mem_store() -> Store {
    let store = Store::open_in_memory()
        .await
        .expect("Failed to open in-memory store");
    migrate::migrate(&store)
        .await
        .expect("Failed to migrate in-memory store");
    store
}
