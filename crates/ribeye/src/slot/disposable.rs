//! Single-generation slot for weighed or counted stock.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};

use super::lock_slot;
use crate::error::SlotError;
use crate::resource::{Macronutrients, Quantity, Resource, ResourceKind, Unit};

/// Disposable slot: a shared expiration and nutrition profile over `capacity`
/// units, handed out in arbitrary amounts until exhausted or killed.
pub struct DisposableSlot {
    kind: ResourceKind,
    unit: Unit,
    macronutrients: Macronutrients,
    expiration: DateTime<Utc>,
    capacity: u64,
    size: Mutex<u64>,
    /// Read without the lock for the early check, written only under it.
    active: AtomicBool,
}

impl DisposableSlot {
    pub fn new(
        kind: ResourceKind,
        macronutrients: Macronutrients,
        expiration: DateTime<Utc>,
        capacity: Quantity,
    ) -> Self {
        Self {
            kind,
            unit: capacity.unit(),
            macronutrients,
            expiration,
            capacity: capacity.amount(),
            size: Mutex::new(capacity.amount()),
            active: AtomicBool::new(true),
        }
    }

    /// A slot holding exactly the supplied resource.
    pub fn for_resource(resource: &Resource) -> Self {
        Self::new(
            resource.kind,
            resource.macronutrients,
            resource.expiration,
            resource.quantity,
        )
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn capacity(&self) -> Quantity {
        Quantity::of(self.unit, self.capacity)
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Deactivate the slot permanently. There is no way back.
    ///
    /// Returns `false` if the slot was already dead.
    pub fn kill(&self) -> bool {
        let _size = lock_slot(&self.size);
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if was_active {
            tracing::debug!(kind = %self.kind, "Disposable slot killed");
        }
        was_active
    }

    fn ensure_active(&self) -> Result<(), SlotError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(SlotError::InactiveSlot)
        }
    }

    /// Hand out `request` units, generating the resource view from this
    /// slot's nutrition and expiration.
    ///
    /// Liveness is checked before the call yields to the scheduler and again
    /// once the lock is held, so a kill that lands while this call is queued
    /// is still observed.
    pub async fn pull(&self, request: Quantity) -> Result<Resource, SlotError> {
        self.ensure_active()?;
        tokio::task::yield_now().await;
        self.take(request)
    }

    fn take(&self, request: Quantity) -> Result<Resource, SlotError> {
        if request.unit() != self.unit {
            return Err(SlotError::UnitMismatch {
                expected: self.unit,
                actual: request.unit(),
            });
        }

        let mut size = lock_slot(&self.size);
        self.ensure_active()?;
        let remaining = size.checked_sub(request.amount()).ok_or(SlotError::Empty)?;
        *size = remaining;

        Ok(Resource::new(
            self.kind,
            self.macronutrients,
            request,
            self.expiration,
        ))
    }

    /// Units left. Fails with `InactiveSlot` if the slot dies around the read.
    pub async fn size(&self) -> Result<Quantity, SlotError> {
        self.ensure_active()?;
        tokio::task::yield_now().await;
        let size = lock_slot(&self.size);
        self.ensure_active()?;
        Ok(Quantity::of(self.unit, *size))
    }
}
