use crate::errors::RepoError;
use crate::session::{Session, SessionFactory};
use crate::transaction::{TransactionHandle, TransactionParticipant};
use entity_mapping::Entity;
use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};

/// Generic repository over one entity type.
///
/// Attachment state machine: a repository starts Detached; the transaction
/// coordinator flips it to Attached with `set_context_transaction` and back
/// with `free_context_transaction`. While Attached, every session this
/// repository opens joins the shared transaction; while Detached, each
/// operation gets a private session scoped to that one call. Instances are
/// reusable across any number of attach/detach cycles.
pub struct Repository<E: Entity> {
    factory: SessionFactory,
    attached: Mutex<Option<TransactionHandle>>,
    _marker: PhantomData<E>,
}

impl<E: Entity> std::fmt::Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("table", &E::table_name())
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(factory: SessionFactory) -> Self {
        Self {
            factory,
            attached: Mutex::new(None),
            _marker: PhantomData,
        }
    }

    pub fn session_factory(&self) -> &SessionFactory {
        &self.factory
    }

    /// Whether this repository currently joins a coordinated transaction
    pub fn is_attached(&self) -> bool {
        self.attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Open the session for one operation, honoring the attachment state
    pub(crate) async fn open_session(&self) -> Result<Session<E>, RepoError> {
        let context = self
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        self.factory.session::<E>(context.as_ref()).await
    }
}

impl<E: Entity> TransactionParticipant for Repository<E> {
    fn set_context_transaction(&self, handle: TransactionHandle) {
        tracing::debug!(table = E::table_name(), "joining shared transaction");
        *self
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn free_context_transaction(&self) {
        tracing::debug!(table = E::table_name(), "leaving shared transaction");
        *self
            .attached
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}
