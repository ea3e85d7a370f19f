//! Storage: resource-type keyed routing to slots.
//!
//! Owns:
//! - The type → slot map, behind one map-level lock that is never held while
//!   a slot operation runs
//! - Slot lifecycle (lazy pack creation, replace-and-kill of disposable slots)
//! - Optimistic retry around every pack mutation

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::clock::{Clock, SystemClock};
use crate::config::env_parse;
use crate::error::StorageError;
use crate::repository::ResourceRepository;
use crate::resource::{Quantity, Resource, ResourceKind};
use crate::retry::{RetryError, RetryPolicy};
use crate::slot::{DisposableSlot, PackSlot, Slot};

#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// Capacity of lazily created pack slots.
    pub pack_capacity: usize,
    pub retry: RetryPolicy,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pack_capacity: env_parse("RIBEYE_PACK_CAPACITY").unwrap_or(10),
            retry: RetryPolicy::default(),
        }
    }
}

pub struct Storage {
    slots: Mutex<HashMap<ResourceKind, Slot>>,
    config: StorageConfig,
    clock: Arc<dyn Clock>,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<ResourceKind, Slot>> {
        match self.slots.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Storage slot map poisoned - recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn get_slot(&self, kind: ResourceKind) -> Option<Slot> {
        self.lock_slots().get(&kind).cloned()
    }

    /// Install `slot` for `kind`. A disposable slot being replaced is killed
    /// before the new one becomes visible.
    pub fn set_slot(&self, kind: ResourceKind, slot: Slot) -> Option<Slot> {
        let mut slots = self.lock_slots();
        if let Some(Slot::Disposable(old)) = slots.get(&kind) {
            old.kill();
        }
        slots.insert(kind, slot)
    }

    /// Existing pack slot for `kind`, or a fresh one sized to the configured capacity.
    fn pack_slot(&self, kind: ResourceKind) -> Arc<PackSlot> {
        let mut slots = self.lock_slots();
        if let Some(Slot::Pack(pack)) = slots.get(&kind) {
            return Arc::clone(pack);
        }
        tracing::debug!(%kind, capacity = self.config.pack_capacity, "Creating pack slot");
        let pack = Arc::new(PackSlot::new(kind, self.config.pack_capacity));
        slots.insert(kind, Slot::Pack(Arc::clone(&pack)));
        pack
    }

    async fn add_to_pack(&self, resource: Resource) -> Result<(), StorageError> {
        let kind = resource.kind;
        let pack = self.pack_slot(kind);
        self.config
            .retry
            .run_versioned(
                || pack.version(),
                || {
                    let pack = Arc::clone(&pack);
                    let resource = resource.clone();
                    async move { pack.add(resource).await.map(|version| (version, ())) }
                },
            )
            .await
            .map_err(|err| Self::pack_error(kind, err))
    }

    async fn pull_from_pack(
        &self,
        pack: Arc<PackSlot>,
        quantity: Quantity,
    ) -> Result<Resource, StorageError> {
        let kind = pack.kind();
        self.config
            .retry
            .run_versioned(|| pack.version(), || pack.pull(quantity))
            .await
            .map_err(|err| Self::pack_error(kind, err))
    }

    fn pack_error(kind: ResourceKind, err: RetryError<crate::error::SlotError>) -> StorageError {
        match err {
            RetryError::Rejected(slot_err) => StorageError::from_slot(kind, slot_err),
            RetryError::Exhausted { attempts } => {
                tracing::warn!(%kind, attempts, "Pack operation gave up on version conflicts");
                StorageError::ExhaustedRetries { kind, attempts }
            }
        }
    }

    fn replace_disposable(&self, resource: &Resource) -> Result<(), StorageError> {
        let expected = resource.kind.slot_kind().request_unit();
        if resource.quantity.unit() != expected {
            return Err(StorageError::UnitMismatch {
                kind: resource.kind,
                expected,
                actual: resource.quantity.unit(),
            });
        }

        let slot = Arc::new(DisposableSlot::for_resource(resource));
        self.set_slot(resource.kind, Slot::Disposable(slot));
        tracing::debug!(
            kind = %resource.kind,
            capacity = %resource.quantity,
            "Disposable slot replaced"
        );
        Ok(())
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::new(StorageConfig::default())
    }
}

#[async_trait]
impl ResourceRepository for Storage {
    async fn pull(&self, kind: ResourceKind, quantity: Quantity) -> Result<Resource, StorageError> {
        match self.get_slot(kind) {
            None => Err(StorageError::NotFound(kind)),
            Some(Slot::Pack(pack)) => self.pull_from_pack(pack, quantity).await,
            Some(Slot::Disposable(slot)) => slot
                .pull(quantity)
                .await
                .map_err(|err| StorageError::from_slot(kind, err)),
        }
    }

    async fn put(&self, resource: Resource) -> Result<(), StorageError> {
        if resource.is_rotten(self.clock.now()) {
            tracing::warn!(
                kind = %resource.kind,
                expiration = %resource.expiration,
                "Rejecting rotten resource"
            );
            return Err(StorageError::RottenResource {
                kind: resource.kind,
                expiration: resource.expiration,
            });
        }

        if resource.kind.slot_kind().is_disposable() {
            self.replace_disposable(&resource)
        } else {
            self.add_to_pack(resource).await
        }
    }

    async fn size(&self, kind: ResourceKind) -> Quantity {
        let empty = Quantity::zero(kind.slot_kind().size_unit());
        match self.get_slot(kind) {
            None => empty,
            Some(Slot::Pack(pack)) => pack.size(),
            Some(Slot::Disposable(slot)) => match slot.size().await {
                Ok(size) => size,
                Err(err) => {
                    tracing::debug!(
                        %kind,
                        error = %err,
                        "Slot died during size read, reporting empty"
                    );
                    empty
                }
            },
        }
    }
}
