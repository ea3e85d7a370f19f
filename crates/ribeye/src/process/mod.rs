//! Cooking process - composes the step catalog into branches and joins.
//!
//! Flow:
//! 1. meat (get, check, marinate) and grill (get, check) in a fail-fast join
//! 2. put the meat on the grill
//! 3. roast (critical) alongside sauce and rosemary (non-critical)
//! 4. serve with whatever garnish made it, then finish
//!
//! Every completed step invocation is reported to the event listener.

mod combinator;
mod event;
mod kitchen;
mod state;
mod steps;

use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::Instrument;
use uuid::Uuid;

use crate::clock::{Clock, SystemClock};
use crate::error::ProcessError;
use crate::repository::ResourceRepository;

pub use combinator::{
    finish, next, prepare_meat_and_grill, prepare_sauce_and_rosemary, split,
    split_and_cancel_first,
};
pub use event::{Event, EventListener, MemoryListener, NoopListener, TracingListener};
pub use kitchen::{FixedOverhead, Kitchen, KitchenConfig, StepDurations, TimeLimits, ValueChain};
pub use state::{State, Steak, Step};
pub use steps::CookingSteps;

type StepFuture = BoxFuture<'static, Result<State, ProcessError>>;

#[derive(Clone)]
pub struct CookingProcess {
    steps: Arc<dyn CookingSteps>,
    repository: Arc<dyn ResourceRepository>,
    listener: Arc<dyn EventListener>,
    clock: Arc<dyn Clock>,
}

impl CookingProcess {
    pub fn new(steps: Arc<dyn CookingSteps>, repository: Arc<dyn ResourceRepository>) -> Self {
        Self {
            steps,
            repository,
            listener: Arc::new(TracingListener),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Cook one steak.
    ///
    /// Fails with the first failure of the meat or grill branch, or of the
    /// roasting itself. Missing garnish only degrades the result.
    pub async fn run(&self) -> Result<Steak, ProcessError> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("cooking", %run_id);
        self.cook().instrument(span).await
    }

    async fn cook(&self) -> Result<Steak, ProcessError> {
        tracing::info!("Cooking started");

        let prepared = prepare_meat_and_grill(
            self.meat_branch().in_current_span(),
            self.grill_branch().in_current_span(),
            |meat, grill| {
                self.invoke(Step::MeatPrepare, move |steps| {
                    steps.prepare_for_roasting(meat, grill)
                })
            },
        )
        .await;

        let served = next(prepared, |prepared| {
            prepare_sauce_and_rosemary(
                self.invoke(Step::MeatRoast, move |steps| steps.roast_meat(prepared))
                    .in_current_span(),
                self.sauce_branch().in_current_span(),
                self.rosemary_branch().in_current_span(),
                |meat, sauce, rosemary| {
                    self.invoke(Step::MeatServe, move |steps| {
                        steps.serve(meat, sauce, rosemary)
                    })
                },
            )
        })
        .await;

        let steak = finish(served, |served| self.finish_step(served)).await;

        match &steak {
            Ok(steak) => tracing::info!(
                weight = %steak.state.quantity(),
                elapsed_ms = steak.state.elapsed().as_millis() as u64,
                value = steak.state.value(),
                garnish = ?steak.garnish(),
                "Steak ready"
            ),
            Err(err) => tracing::warn!(error = %err, "Cooking failed"),
        }
        steak
    }

    fn meat_branch(&self) -> StepFuture {
        let this = self.clone();
        async move {
            let meat = this
                .fetch(Step::MeatGet, |steps, repository| steps.get_meat(repository))
                .await;
            let meat = next(meat, |meat| {
                this.invoke(Step::MeatCheck, move |steps| steps.check_meat(meat))
            })
            .await;
            next(meat, |meat| {
                this.invoke(Step::MeatMarinate, move |steps| steps.marinate_meat(meat))
            })
            .await
        }
        .boxed()
    }

    fn grill_branch(&self) -> StepFuture {
        let this = self.clone();
        async move {
            let grill = this
                .fetch(Step::GrillGet, |steps, repository| steps.get_grill(repository))
                .await;
            next(grill, |grill| {
                this.invoke(Step::GrillCheck, move |steps| steps.check_grill(grill))
            })
            .await
        }
        .boxed()
    }

    fn sauce_branch(&self) -> StepFuture {
        let this = self.clone();
        async move {
            let sauce = this
                .fetch(Step::SauceGet, |steps, repository| steps.get_sauce(repository))
                .await;
            next(sauce, |sauce| {
                this.invoke(Step::SaucePrepare, move |steps| steps.prepare_sauce(sauce))
            })
            .await
        }
        .boxed()
    }

    fn rosemary_branch(&self) -> StepFuture {
        let this = self.clone();
        async move {
            let rosemary = this
                .fetch(Step::RosemaryGet, |steps, repository| {
                    steps.get_rosemary(repository)
                })
                .await;
            next(rosemary, |rosemary| {
                this.invoke(Step::RosemaryRoast, move |steps| {
                    steps.roast_rosemary(rosemary)
                })
            })
            .await
        }
        .boxed()
    }

    /// Invoke a step as an owned future and report its outcome.
    fn invoke<F>(&self, step: Step, call: F) -> StepFuture
    where
        F: for<'a> FnOnce(&'a dyn CookingSteps) -> BoxFuture<'a, Result<State, ProcessError>>
            + Send
            + 'static,
    {
        let this = self.clone();
        async move {
            let result = call(this.steps.as_ref()).await;
            this.observe(step, result)
        }
        .boxed()
    }

    /// Like `invoke`, for the first step of a branch.
    fn fetch<F>(&self, step: Step, call: F) -> StepFuture
    where
        F: for<'a> FnOnce(
                &'a dyn CookingSteps,
                &'a dyn ResourceRepository,
            ) -> BoxFuture<'a, Result<State, ProcessError>>
            + Send
            + 'static,
    {
        let this = self.clone();
        async move {
            let result = call(this.steps.as_ref(), this.repository.as_ref()).await;
            this.observe(step, result)
        }
        .boxed()
    }

    async fn finish_step(&self, served: State) -> Result<Steak, ProcessError> {
        let steak = self.steps.finish(served).await;
        let snapshot = match &steak {
            Ok(steak) => Ok(steak.state.clone()),
            Err(err) => Err(err.clone()),
        };
        self.emit(Step::Finish, snapshot);
        steak
    }

    /// Reject a state carrying the wrong tag, then emit the event.
    fn observe(
        &self,
        step: Step,
        result: Result<State, ProcessError>,
    ) -> Result<State, ProcessError> {
        let result = result.and_then(|state| {
            state.expect(step)?;
            Ok(state)
        });
        self.emit(step, result.clone());
        result
    }

    fn emit(&self, step: Step, result: Result<State, ProcessError>) {
        self.listener
            .on_event(&Event::new(step, result, self.clock.now()));
    }
}
