//! Repository contract consumed by the cooking process.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::resource::{Quantity, Resource, ResourceKind};

/// Narrow storage contract.
///
/// This abstraction lets the cooking process run against any storage, and
/// lets tests substitute scripted repositories.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Take `quantity` of `kind` out of storage.
    ///
    /// Fails with `NotFound`, `Empty`, or `ExhaustedRetries`.
    async fn pull(&self, kind: ResourceKind, quantity: Quantity) -> Result<Resource, StorageError>;

    /// Supply a resource. Fails with `RottenResource` or `Full`.
    async fn put(&self, resource: Resource) -> Result<(), StorageError>;

    /// Current fill of the slot for `kind`; zero when there is none.
    async fn size(&self, kind: ResourceKind) -> Quantity;
}
