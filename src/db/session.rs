use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::future::Future;

use crate::error::{AppError, Result};

/// Wraps a pool-backed `DatabaseConnection`. The Rust equivalent of the
/// source's single async session factory: `with_transaction` opens a
/// `DatabaseTransaction`, runs the closure, commits on `Ok`, rolls back
/// and re-raises on `Err` — no `async with`, so this is expressed as a
/// closure-based helper instead of a context manager.
#[derive(Clone)]
pub struct SessionFactory {
    db: DatabaseConnection,
}

impl SessionFactory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Runs `op` inside a transaction. Writes that span multiple
    /// repositories must share the same `DatabaseTransaction` passed
    /// into each repository constructor for the duration of the call.
    pub async fn with_transaction<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(DatabaseTransaction) -> Fut,
        Fut: Future<Output = Result<(DatabaseTransaction, T)>>,
    {
        let txn = self.db.begin().await.map_err(AppError::from_db_err)?;
        match op(txn).await {
            Ok((txn, value)) => {
                txn.commit().await.map_err(AppError::from_db_err)?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }
}
