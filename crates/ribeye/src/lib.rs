//! ribeye: versioned in-memory resource storage and a fork-join cooking process.

mod config;

pub mod clock;
pub mod error;
pub mod messenger;
pub mod process;
pub mod repository;
pub mod resource;
pub mod retry;
pub mod slot;
pub mod storage;

pub use clock::{Clock, FakeClock, SystemClock};
pub use error::{ProcessError, SlotError, StorageError};
pub use messenger::{MemoryMessenger, Messenger, TracingMessenger};
pub use process::{
    CookingProcess, CookingSteps, Event, EventListener, Kitchen, KitchenConfig, MemoryListener,
    NoopListener, State, Steak, Step, TracingListener,
};
pub use repository::ResourceRepository;
pub use resource::{Macronutrients, Quantity, Resource, ResourceKind, SlotKind, Unit};
pub use retry::{RetryError, RetryPolicy};
pub use slot::{DisposableSlot, PackSlot, Slot};
pub use storage::{Storage, StorageConfig};
