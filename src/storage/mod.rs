//! Storage collaborators consumed by the transfer pipeline.
//!
//! The pipeline only needs four operations from the inventory database,
//! captured by [`InventoryStore`]. Two implementations ship with the crate:
//!
//! | Store | Use |
//! |-------|-----|
//! | [`MemoryStore`] | Tests and embedding applications with their own persistence |
//! | [`SqliteStore`] | The CLI's on-disk inventory |
//!
//! [`ImageStore`] owns the application's persistent image directory.

mod images;
mod memory;
mod sqlite;
mod traits;

pub use images::ImageStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::InventoryStore;

use std::sync::{Mutex, MutexGuard};

/// Acquires a mutex, recovering the inner value if a previous holder panicked.
pub(crate) fn acquire_lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Store mutex was poisoned, recovering");
            metrics::counter!("store_mutex_poison_recovery_total").increment(1);
            poisoned.into_inner()
        },
    }
}
