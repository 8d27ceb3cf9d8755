//! Cross-repository transaction coordination
//!
//! The coordinator opens one transaction, hands a shared handle to every
//! participating repository, runs the caller's transactional work, and
//! resolves commit or rollback from the work's outcome. Participants are
//! detached unconditionally before the call returns, success or failure.

use crate::errors::RepoError;
use crate::session::SessionFactory;
use config::DatabaseConfig;
use sqlx::{PgPool, Postgres, Transaction};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Transaction isolation levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// SQL applied as the first statement of the coordinated transaction
    pub fn set_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => {
                "SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED"
            }
            IsolationLevel::ReadCommitted => "SET TRANSACTION ISOLATION LEVEL READ COMMITTED",
            IsolationLevel::RepeatableRead => "SET TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            IsolationLevel::Serializable => "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// Shared handle to the coordinator-owned transaction.
///
/// Participants only read the handle: each attached repository locks it for
/// the duration of one operation so that operation joins the transaction's
/// connection. The coordinator remains the sole owner of the transaction
/// lifecycle (begin, commit, rollback, drop).
#[derive(Clone)]
pub struct TransactionHandle {
    tx: Arc<Mutex<Transaction<'static, Postgres>>>,
    isolation: IsolationLevel,
}

impl TransactionHandle {
    fn new(tx: Transaction<'static, Postgres>, isolation: IsolationLevel) -> Self {
        Self {
            tx: Arc::new(Mutex::new(tx)),
            isolation,
        }
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub(crate) async fn lock_owned(&self) -> OwnedMutexGuard<Transaction<'static, Postgres>> {
        Arc::clone(&self.tx).lock_owned().await
    }

    fn into_inner(self) -> Arc<Mutex<Transaction<'static, Postgres>>> {
        self.tx
    }
}

impl fmt::Debug for TransactionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionHandle")
            .field("isolation", &self.isolation)
            .finish()
    }
}

/// The attach/detach contract a repository offers to the coordinator.
///
/// Attachment is a pure state flip: Detached → Attached on
/// `set_context_transaction`, Attached → Detached on
/// `free_context_transaction`. Instances are reusable across cycles.
pub trait TransactionParticipant: Send + Sync {
    fn set_context_transaction(&self, handle: TransactionHandle);
    fn free_context_transaction(&self);
}

/// Coordinates one physical transaction across several repositories
pub struct TransactionCoordinator {
    factory: SessionFactory,
}

impl TransactionCoordinator {
    pub fn new(factory: SessionFactory) -> Self {
        Self { factory }
    }

    /// Run `work` inside one transaction shared by every participant.
    ///
    /// Commits when `work` returns `Ok(true)`, rolls back on `Ok(false)` or
    /// `Err`. Participants are detached before this returns in every case;
    /// errors from `work` propagate to the caller after that cleanup.
    pub async fn execute_with_transaction<F, Fut>(
        &self,
        isolation: IsolationLevel,
        participants: &[&dyn TransactionParticipant],
        work: F,
    ) -> Result<bool, RepoError>
    where
        F: FnOnce(TransactionHandle) -> Fut,
        Fut: Future<Output = Result<bool, RepoError>>,
    {
        self.run(self.factory.pool(), isolation, participants, work)
            .await
    }

    /// Same protocol against an explicitly configured target store
    pub async fn execute_with_transaction_on<F, Fut>(
        &self,
        config: &DatabaseConfig,
        isolation: IsolationLevel,
        participants: &[&dyn TransactionParticipant],
        work: F,
    ) -> Result<bool, RepoError>
    where
        F: FnOnce(TransactionHandle) -> Fut,
        Fut: Future<Output = Result<bool, RepoError>>,
    {
        let factory = SessionFactory::from_config(config).await?;
        self.run(factory.pool(), isolation, participants, work)
            .await
    }

    async fn run<F, Fut>(
        &self,
        pool: &PgPool,
        isolation: IsolationLevel,
        participants: &[&dyn TransactionParticipant],
        work: F,
    ) -> Result<bool, RepoError>
    where
        F: FnOnce(TransactionHandle) -> Fut,
        Fut: Future<Output = Result<bool, RepoError>>,
    {
        let mut tx = pool.begin().await?;
        sqlx::query(isolation.set_sql()).execute(&mut *tx).await?;

        let handle = TransactionHandle::new(tx, isolation);
        for participant in participants {
            participant.set_context_transaction(handle.clone());
        }
        tracing::debug!(
            ?isolation,
            participants = participants.len(),
            "transaction attached"
        );

        let outcome = work(handle.clone()).await;

        // Unconditional detachment, independent of commit/rollback outcome
        for participant in participants {
            participant.free_context_transaction();
        }

        // Reclaim sole ownership; a clone retained past `work` makes the
        // outcome undecidable, so commit is refused and the transaction
        // rolls back on drop.
        let reclaimed = Arc::try_unwrap(handle.into_inner())
            .ok()
            .map(|mutex| mutex.into_inner());

        match (outcome, reclaimed) {
            (Ok(true), Some(tx)) => {
                tx.commit()
                    .await
                    .map_err(|e| RepoError::TransactionFailure(e.to_string()))?;
                tracing::debug!("transaction committed");
                Ok(true)
            }
            (Ok(false), Some(tx)) => {
                tx.rollback()
                    .await
                    .map_err(|e| RepoError::TransactionFailure(e.to_string()))?;
                tracing::debug!("transaction rolled back");
                Ok(false)
            }
            (Err(err), Some(tx)) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(%rollback_err, "rollback failed after work error");
                }
                Err(err)
            }
            (Err(err), None) => {
                tracing::warn!("transaction handle leaked out of failed work");
                Err(err)
            }
            (Ok(_), None) => Err(RepoError::TransactionFailure(
                "transaction handle is still shared after work completed; commit refused"
                    .to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isolation_levels_render_set_statements() {
        assert_eq!(
            IsolationLevel::ReadUncommitted.set_sql(),
            "SET TRANSACTION ISOLATION LEVEL READ UNCOMMITTED"
        );
        assert_eq!(
            IsolationLevel::Serializable.set_sql(),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE"
        );
    }
}
