//! Reusable, versioned slot of individually packed resources.

use std::collections::VecDeque;
use std::sync::Mutex;

use super::lock_slot;
use crate::error::SlotError;
use crate::resource::{Quantity, Resource, ResourceKind, Unit};

struct PackInner {
    entries: VecDeque<Resource>,
    /// Lives under the same lock as `entries`: a reader sees a bump only once
    /// the mutating critical section has exited.
    version: u64,
}

/// Ordered collection of concrete entries, bounded by `capacity`.
///
/// Every committed `pull`/`add` bumps `version` by exactly one and returns
/// the new value, so callers can detect interleaved writers.
pub struct PackSlot {
    kind: ResourceKind,
    capacity: usize,
    inner: Mutex<PackInner>,
}

impl PackSlot {
    pub fn new(kind: ResourceKind, capacity: usize) -> Self {
        Self {
            kind,
            capacity,
            inner: Mutex::new(PackInner {
                entries: VecDeque::with_capacity(capacity),
                version: 0,
            }),
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn version(&self) -> u64 {
        lock_slot(&self.inner).version
    }

    pub fn len(&self) -> usize {
        lock_slot(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of packed entries.
    pub fn size(&self) -> Quantity {
        Quantity::Piece(self.len() as u64)
    }

    /// Remove the first entry whose quantity covers `request`.
    ///
    /// Returns the version after the removal together with the entry.
    pub async fn pull(&self, request: Quantity) -> Result<(u64, Resource), SlotError> {
        tokio::task::yield_now().await;
        self.take_first_covering(request)
    }

    fn take_first_covering(&self, request: Quantity) -> Result<(u64, Resource), SlotError> {
        if request.unit() != Unit::Weight {
            return Err(SlotError::UnitMismatch {
                expected: Unit::Weight,
                actual: request.unit(),
            });
        }

        let mut inner = lock_slot(&self.inner);
        let position = inner
            .entries
            .iter()
            .position(|entry| entry.quantity.amount() >= request.amount())
            .ok_or(SlotError::Empty)?;
        let entry = inner.entries.remove(position).ok_or(SlotError::Empty)?;
        inner.version += 1;
        Ok((inner.version, entry))
    }

    /// Append an entry if there is room. Returns the version after the append.
    pub async fn add(&self, resource: Resource) -> Result<u64, SlotError> {
        tokio::task::yield_now().await;
        self.append(resource)
    }

    fn append(&self, resource: Resource) -> Result<u64, SlotError> {
        let mut inner = lock_slot(&self.inner);
        if inner.entries.len() >= self.capacity {
            return Err(SlotError::Full);
        }
        inner.entries.push_back(resource);
        inner.version += 1;
        Ok(inner.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Macronutrients;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn meat(grams: u64) -> Resource {
        Resource::new(
            ResourceKind::Meat,
            Macronutrients::new(20.0, 19.0, 0.0, 260.0),
            Quantity::Weight(grams),
            Utc::now() + Duration::hours(48),
        )
    }

    #[tokio::test]
    async fn add_and_pull_bump_version_by_one() {
        let slot = PackSlot::new(ResourceKind::Meat, 2);
        assert_eq!(slot.version(), 0);

        assert_eq!(slot.add(meat(400)).await, Ok(1));
        assert_eq!(slot.add(meat(350)).await, Ok(2));

        let before = slot.version();
        let (version, entry) = slot.pull(Quantity::Weight(380)).await.unwrap();
        assert_eq!(version, before + 1);
        assert_eq!(entry.quantity, Quantity::Weight(400));
        assert_eq!(slot.size(), Quantity::Piece(1));
    }

    #[tokio::test]
    async fn pull_takes_first_covering_entry() {
        let slot = PackSlot::new(ResourceKind::Meat, 3);
        slot.add(meat(300)).await.unwrap();
        slot.add(meat(360)).await.unwrap();
        slot.add(meat(450)).await.unwrap();

        let (_, entry) = slot.pull(Quantity::Weight(350)).await.unwrap();
        assert_eq!(entry.quantity, Quantity::Weight(360));
        assert_eq!(slot.len(), 2);
    }

    #[tokio::test]
    async fn failures_do_not_bump_version() {
        let slot = PackSlot::new(ResourceKind::Meat, 1);
        assert_eq!(slot.pull(Quantity::Weight(1)).await, Err(SlotError::Empty));
        slot.add(meat(300)).await.unwrap();
        assert_eq!(slot.add(meat(300)).await, Err(SlotError::Full));
        assert_eq!(slot.pull(Quantity::Weight(301)).await, Err(SlotError::Empty));
        assert_eq!(slot.version(), 1);
    }

    #[tokio::test]
    async fn pull_requires_weight_request() {
        let slot = PackSlot::new(ResourceKind::Meat, 1);
        slot.add(meat(300)).await.unwrap();
        assert!(matches!(
            slot.pull(Quantity::Piece(1)).await,
            Err(SlotError::UnitMismatch { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn single_entry_goes_to_exactly_one_puller() {
        let slot = Arc::new(PackSlot::new(ResourceKind::Meat, 1));
        slot.add(meat(400)).await.unwrap();

        let handles: Vec<_> = (0..100)
            .map(|_| {
                let slot = Arc::clone(&slot);
                tokio::spawn(async move { slot.pull(Quantity::Weight(350)).await })
            })
            .collect();

        let mut succeeded = 0;
        let mut empty = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(SlotError::Empty) => empty += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(succeeded, 1);
        assert_eq!(empty, 99);
        assert!(slot.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_producers_and_consumers_conserve_entries() {
        let slot = Arc::new(PackSlot::new(ResourceKind::Meat, 50));

        let mut producers = Vec::new();
        let mut consumers = Vec::new();
        for _ in 0..200 {
            let producer = Arc::clone(&slot);
            producers.push(tokio::spawn(async move { producer.add(meat(400)).await }));
            let consumer = Arc::clone(&slot);
            consumers.push(tokio::spawn(async move {
                consumer.pull(Quantity::Weight(350)).await
            }));
        }

        let mut adds = 0u64;
        for handle in producers {
            if handle.await.unwrap().is_ok() {
                adds += 1;
            }
        }
        let mut pulls = 0u64;
        for handle in consumers {
            if handle.await.unwrap().is_ok() {
                pulls += 1;
            }
        }

        let final_size = slot.len() as u64;
        assert_eq!(adds, pulls + final_size);
        assert!(final_size <= 50);
        // Every committed mutation moved the version exactly once.
        assert_eq!(slot.version(), adds + pulls);
    }
}
