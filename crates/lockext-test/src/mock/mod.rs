//! Recording fakes for the query engine, the job engine and object storage.

mod batch;
mod object;
mod query;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use batch::MockBatchJobProvider;
pub use object::InMemoryStores;
pub use query::MockQueryProvider;

/// Locks a mutex, recovering the data if a panicking test poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
