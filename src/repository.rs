//! Transit-key and DEK repositories.
//!
//! The real persistence engine (a relational store with transactions) is an
//! external concern; what belongs here is the contract — the two traits
//! below — plus one reference implementation backed by
//! [`crate::transaction::InMemoryStore`], sufficient for tests and the demo
//! binary. A production deployment supplies its own implementation against a
//! real database behind the same traits.

use thiserror::Error;
use uuid::Uuid;

use crate::model::{DekRow, TransitKeyRow};
use crate::transaction::OperationContext;

/// Pagination requests above this are clamped: callers may pass any
/// non-negative `limit`, but an unbounded in-memory allocation is not
/// acceptable.
pub const MAX_LIST_LIMIT: u64 = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("io error: {0}")]
    Io(String),
}

pub trait TransitKeyRepository {
    fn create(
        &self,
        ctx: &mut OperationContext<'_>,
        row: TransitKeyRow,
    ) -> Result<(), RepositoryError>;

    /// Idempotent: no error if the row is already deleted or does not exist.
    fn delete(&self, ctx: &mut OperationContext<'_>, id: Uuid) -> Result<(), RepositoryError>;

    fn get_by_name(
        &self,
        ctx: &mut OperationContext<'_>,
        name: &str,
    ) -> Result<TransitKeyRow, RepositoryError>;

    fn get_by_name_and_version(
        &self,
        ctx: &mut OperationContext<'_>,
        name: &str,
        version: u64,
    ) -> Result<TransitKeyRow, RepositoryError>;

    /// Ordered by name ascending: one row per name (its latest non-deleted
    /// version).
    fn list(
        &self,
        ctx: &mut OperationContext<'_>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TransitKeyRow>, RepositoryError>;
}

pub trait DekRepository {
    fn create(&self, ctx: &mut OperationContext<'_>, row: DekRow) -> Result<(), RepositoryError>;

    fn get(&self, ctx: &mut OperationContext<'_>, id: Uuid) -> Result<DekRow, RepositoryError>;
}

/// Reference implementation of both repositories against
/// [`crate::transaction::InMemoryStore`].
pub struct InMemoryRepositories;

impl TransitKeyRepository for InMemoryRepositories {
    fn create(
        &self,
        ctx: &mut OperationContext<'_>,
        row: TransitKeyRow,
    ) -> Result<(), RepositoryError> {
        ctx.with_data(|inner| {
            let duplicate = inner
                .transit_keys
                .iter()
                .any(|existing| existing.name == row.name && existing.version == row.version);
            if duplicate {
                return Err(RepositoryError::Conflict(format!(
                    "transit key {:?} version {} already exists",
                    row.name, row.version
                )));
            }
            inner.transit_keys.push(row);
            Ok(())
        })
    }

    fn delete(&self, ctx: &mut OperationContext<'_>, id: Uuid) -> Result<(), RepositoryError> {
        ctx.with_data(|inner| {
            if let Some(row) = inner.transit_keys.iter_mut().find(|r| r.id == id) {
                if row.deleted_at.is_none() {
                    row.deleted_at = Some(crate::model::now_unix_seconds());
                }
            }
            Ok(())
        })
    }

    fn get_by_name(
        &self,
        ctx: &mut OperationContext<'_>,
        name: &str,
    ) -> Result<TransitKeyRow, RepositoryError> {
        ctx.with_data(|inner| {
            inner
                .transit_keys
                .iter()
                .filter(|r| r.name == name && !r.is_deleted())
                .max_by_key(|r| r.version)
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    fn get_by_name_and_version(
        &self,
        ctx: &mut OperationContext<'_>,
        name: &str,
        version: u64,
    ) -> Result<TransitKeyRow, RepositoryError> {
        ctx.with_data(|inner| {
            inner
                .transit_keys
                .iter()
                .find(|r| r.name == name && r.version == version && !r.is_deleted())
                .cloned()
                .ok_or(RepositoryError::NotFound)
        })
    }

    fn list(
        &self,
        ctx: &mut OperationContext<'_>,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TransitKeyRow>, RepositoryError> {
        let limit = limit.min(MAX_LIST_LIMIT);
        ctx.with_data(|inner| {
            let mut latest_by_name: std::collections::BTreeMap<&str, &TransitKeyRow> =
                std::collections::BTreeMap::new();
            for row in inner.transit_keys.iter().filter(|r| !r.is_deleted()) {
                latest_by_name
                    .entry(row.name.as_str())
                    .and_modify(|current| {
                        if row.version > current.version {
                            *current = row;
                        }
                    })
                    .or_insert(row);
            }

            Ok(latest_by_name
                .into_values()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect())
        })
    }
}

impl DekRepository for InMemoryRepositories {
    fn create(&self, ctx: &mut OperationContext<'_>, row: DekRow) -> Result<(), RepositoryError> {
        ctx.with_data(|inner| {
            inner.deks.insert(row.id, row);
            Ok(())
        })
    }

    fn get(&self, ctx: &mut OperationContext<'_>, id: Uuid) -> Result<DekRow, RepositoryError> {
        ctx.with_data(|inner| inner.deks.get(&id).cloned().ok_or(RepositoryError::NotFound))
    }
}
