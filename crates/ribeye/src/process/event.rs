//! Step completion events.
//!
//! Listeners observe every step invocation after the fact. They cannot
//! influence the process.

use std::sync::Mutex;

use chrono::{DateTime, Utc};

use super::state::{State, Step};
use crate::error::ProcessError;

#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub step: Step,
    pub result: Result<State, ProcessError>,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(step: Step, result: Result<State, ProcessError>, timestamp: DateTime<Utc>) -> Self {
        Self {
            step,
            result,
            timestamp,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub trait EventListener: Send + Sync {
    fn on_event(&self, event: &Event);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl EventListener for NoopListener {
    fn on_event(&self, _event: &Event) {}
}

/// Logs each completed step.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingListener;

impl EventListener for TracingListener {
    fn on_event(&self, event: &Event) {
        match &event.result {
            Ok(state) => tracing::info!(
                step = %event.step,
                quantity = %state.quantity(),
                elapsed_ms = state.elapsed().as_millis() as u64,
                value = state.value(),
                "Step completed"
            ),
            Err(err) if err.is_cancelled() => {
                tracing::debug!(step = %event.step, "Step cancelled")
            }
            Err(err) => tracing::warn!(step = %event.step, error = %err, "Step failed"),
        }
    }
}

/// Records events in arrival order.
#[derive(Debug, Default)]
pub struct MemoryListener {
    events: Mutex<Vec<Event>>,
}

impl MemoryListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn steps(&self) -> Vec<Step> {
        self.events().iter().map(|event| event.step).collect()
    }
}

impl EventListener for MemoryListener {
    fn on_event(&self, event: &Event) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
