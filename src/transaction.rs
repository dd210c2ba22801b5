//! Transaction manager: scoped acquisition of a transaction, propagated
//! through an explicit operation context, all-or-nothing commit.
//!
//! The active transaction travels as an explicit `OperationContext` value
//! rather than thread-local state, so repositories route to it when present
//! and auto-commit a single operation against the store otherwise.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::model::{DekRow, TransitKeyRow};

#[derive(Clone, Default)]
pub(crate) struct StoreInner {
    pub transit_keys: Vec<TransitKeyRow>,
    pub deks: HashMap<Uuid, DekRow>,
}

/// The in-memory reference store backing [`crate::repository`]'s default
/// repository implementations. Guarded by a single mutex: every transaction
/// holds it for its full duration, which trivially gives serializable
/// isolation (stronger than strictly required, but simplest to reason about
/// for a reference store whose real-world counterpart is a relational
/// database).
pub struct InMemoryStore {
    inner: Mutex<StoreInner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }
}

/// The active transaction, if any, carried explicitly through an operation
/// rather than via thread-local state.
pub enum OperationContext<'s> {
    Autocommit(&'s InMemoryStore),
    InTransaction {
        store: &'s InMemoryStore,
        guard: MutexGuard<'s, StoreInner>,
        snapshot: StoreInner,
    },
}

impl<'s> OperationContext<'s> {
    /// A fresh context with no active transaction; repository calls made
    /// directly against it auto-commit one operation at a time.
    pub fn autocommit(store: &'s InMemoryStore) -> Self {
        OperationContext::Autocommit(store)
    }

    pub(crate) fn with_data<R>(&mut self, f: impl FnOnce(&mut StoreInner) -> R) -> R {
        match self {
            OperationContext::Autocommit(store) => {
                let mut guard = store.inner.lock().unwrap_or_else(|p| p.into_inner());
                f(&mut guard)
            }
            OperationContext::InTransaction { guard, .. } => f(guard),
        }
    }
}

/// Opens a transaction, runs `f` with a derived context in which every
/// repository call sees that transaction, and commits on a clean `Ok` return
/// or rolls back on any `Err` — including a panic unwinding out of `f`.
/// Calling this again with a context that already has an active transaction
/// reuses it; only the outermost call commits or rolls back.
pub fn with_tx<'s, T, E>(
    ctx: &mut OperationContext<'s>,
    f: impl FnOnce(&mut OperationContext<'s>) -> Result<T, E>,
) -> Result<T, E> {
    if matches!(ctx, OperationContext::InTransaction { .. }) {
        return f(ctx);
    }

    let store = match ctx {
        OperationContext::Autocommit(store) => *store,
        OperationContext::InTransaction { .. } => unreachable!("handled above"),
    };

    let guard = store.inner.lock().unwrap_or_else(|p| p.into_inner());
    let snapshot = guard.clone();
    let mut tx_ctx = OperationContext::InTransaction {
        store,
        guard,
        snapshot,
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut tx_ctx)));

    match outcome {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            rollback(&mut tx_ctx);
            Err(err)
        }
        Err(payload) => {
            rollback(&mut tx_ctx);
            panic::resume_unwind(payload)
        }
    }
}

fn rollback(tx_ctx: &mut OperationContext<'_>) {
    if let OperationContext::InTransaction { guard, snapshot, .. } = tx_ctx {
        **guard = snapshot.clone();
    }
}
