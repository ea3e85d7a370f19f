//! Default step catalog: simulated work plus acceptance rules.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::state::{State, Steak, Step};
use super::steps::CookingSteps;
use crate::clock::{Clock, SystemClock};
use crate::error::ProcessError;
use crate::messenger::Messenger;
use crate::repository::ResourceRepository;
use crate::resource::{Quantity, Resource, ResourceKind};

/// Value a step adds to the dish.
pub trait ValueChain: Send + Sync {
    fn value(&self, step: Step, elapsed: Duration) -> f64;
}

/// Flat overhead per step regardless of time spent.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedOverhead;

impl ValueChain for FixedOverhead {
    fn value(&self, step: Step, _elapsed: Duration) -> f64 {
        match step {
            Step::MeatGet | Step::MeatMarinate => 20.0,
            Step::MeatCheck => 25.0,
            Step::GrillGet => 10.0,
            Step::MeatRoast => 40.0,
            Step::Finish | Step::GrillCheck => 0.0,
            _ => 15.0,
        }
    }
}

/// How long each step takes.
#[derive(Debug, Clone, PartialEq)]
pub struct StepDurations {
    pub fetch: Duration,
    pub check: Duration,
    pub marinate: Duration,
    pub light_grill: Duration,
    pub prepare: Duration,
    pub roast: Duration,
    pub sauce: Duration,
    pub rosemary: Duration,
    pub serve: Duration,
}

impl StepDurations {
    pub fn of(&self, step: Step) -> Duration {
        match step {
            Step::MeatGet | Step::GrillGet | Step::SauceGet | Step::RosemaryGet => self.fetch,
            Step::MeatCheck => self.check,
            Step::MeatMarinate => self.marinate,
            Step::GrillCheck => self.light_grill,
            Step::MeatPrepare => self.prepare,
            Step::MeatRoast => self.roast,
            Step::SaucePrepare => self.sauce,
            Step::RosemaryRoast => self.rosemary,
            Step::MeatServe => self.serve,
            Step::Finish => Duration::ZERO,
        }
    }
}

impl Default for StepDurations {
    fn default() -> Self {
        Self {
            fetch: Duration::from_millis(1),
            check: Duration::from_millis(2),
            marinate: Duration::from_millis(30),
            light_grill: Duration::from_millis(35),
            prepare: Duration::from_millis(5),
            roast: Duration::from_millis(40),
            sauce: Duration::from_millis(15),
            rosemary: Duration::from_millis(10),
            serve: Duration::from_millis(5),
        }
    }
}

/// How long a step may take and still be accepted.
///
/// Kitchen time runs one millisecond per minute: a 15..=45 minute marinade
/// is 15..=45 ms.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeLimits {
    pub meat_get: RangeInclusive<Duration>,
    pub meat_check: RangeInclusive<Duration>,
    pub marinate: RangeInclusive<Duration>,
    pub grill_get: RangeInclusive<Duration>,
    pub grill_check: RangeInclusive<Duration>,
}

impl TimeLimits {
    /// `None` for steps that accept any duration.
    pub fn of(&self, step: Step) -> Option<&RangeInclusive<Duration>> {
        match step {
            Step::MeatGet => Some(&self.meat_get),
            Step::MeatCheck => Some(&self.meat_check),
            Step::MeatMarinate => Some(&self.marinate),
            Step::GrillGet => Some(&self.grill_get),
            Step::GrillCheck => Some(&self.grill_check),
            _ => None,
        }
    }
}

impl Default for TimeLimits {
    fn default() -> Self {
        Self {
            meat_get: Duration::from_micros(500)..=Duration::from_millis(3),
            meat_check: Duration::ZERO..=Duration::from_millis(5),
            marinate: Duration::from_millis(15)..=Duration::from_millis(45),
            grill_get: Duration::from_micros(500)..=Duration::from_millis(2),
            grill_check: Duration::from_millis(30)..=Duration::from_millis(40),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct KitchenConfig {
    pub meat_request: Quantity,
    pub grill_request: Quantity,
    pub sauce_request: Quantity,
    pub rosemary_request: Quantity,
    /// Acceptable weight of a pulled steak, grams.
    pub meat_weight: RangeInclusive<u64>,
    /// Acceptable fats of a ribeye, per 100 g.
    pub meat_fats: RangeInclusive<f64>,
    /// Acceptable grill supply, grams.
    pub grill_weight: RangeInclusive<u64>,
    /// Weight gained while marinating, whole percents.
    pub marinate_gain_percent: u64,
    pub durations: StepDurations,
    pub time_limits: TimeLimits,
}

impl Default for KitchenConfig {
    fn default() -> Self {
        Self {
            meat_request: Quantity::Weight(350),
            grill_request: Quantity::Weight(800),
            sauce_request: Quantity::Weight(150),
            rosemary_request: Quantity::Piece(3),
            meat_weight: 350..=450,
            meat_fats: 18.0..=25.0,
            grill_weight: 500..=1000,
            marinate_gain_percent: 7,
            durations: StepDurations::default(),
            time_limits: TimeLimits::default(),
        }
    }
}

pub struct Kitchen {
    config: KitchenConfig,
    messenger: Arc<dyn Messenger>,
    clock: Arc<dyn Clock>,
    value_chain: Arc<dyn ValueChain>,
}

impl Kitchen {
    pub fn new(config: KitchenConfig, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            config,
            messenger,
            clock: Arc::new(SystemClock),
            value_chain: Arc::new(FixedOverhead),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_value_chain(mut self, value_chain: Arc<dyn ValueChain>) -> Self {
        self.value_chain = value_chain;
        self
    }

    /// Spend the time `step` takes, rejecting it if that is out of limits.
    async fn work(&self, step: Step) -> Result<Duration, ProcessError> {
        let elapsed = self.config.durations.of(step);
        tokio::time::sleep(elapsed).await;
        match self.config.time_limits.of(step) {
            Some(limits) if !limits.contains(&elapsed) => Err(ProcessError::rejected(
                step,
                format!(
                    "took {elapsed:?}, expected {:?}..={:?}",
                    limits.start(),
                    limits.end()
                ),
            )),
            _ => Ok(elapsed),
        }
    }

    /// Pull `request` of `kind` and start a branch from it.
    async fn fetch(
        &self,
        repository: &dyn ResourceRepository,
        step: Step,
        kind: ResourceKind,
        request: Quantity,
    ) -> Result<(Resource, State), ProcessError> {
        let resource = repository.pull(kind, request).await?;
        let elapsed = self.work(step).await?;
        if resource.is_rotten(self.clock.now()) {
            return Err(ProcessError::rejected(
                step,
                format!("{kind} is rotten, expired at {}", resource.expiration),
            ));
        }
        let value = self.value_chain.value(step, elapsed);
        let state = State::from_resource(step, &resource, elapsed, value);
        Ok((resource, state))
    }

    /// Successor of `state` after doing `step`'s work.
    async fn transition(
        &self,
        state: State,
        from: Step,
        step: Step,
    ) -> Result<State, ProcessError> {
        state.expect(from)?;
        let elapsed = self.work(step).await?;
        let value = self.value_chain.value(step, elapsed);
        Ok(state.advance(step, elapsed, value))
    }

    async fn notify_missing(&self, kind: ResourceKind, err: &ProcessError) {
        tracing::warn!(%kind, error = %err, "Serving without garnish");
        self.messenger
            .send(format!(
                "Sorry, no {kind} today ({err}). Your steak will be fine without it."
            ))
            .await;
    }
}

#[async_trait]
impl CookingSteps for Kitchen {
    async fn get_meat(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError> {
        let (meat, state) = self
            .fetch(
                repository,
                Step::MeatGet,
                ResourceKind::Meat,
                self.config.meat_request,
            )
            .await?;
        let grams = meat.quantity.amount();
        if !self.config.meat_weight.contains(&grams) {
            return Err(ProcessError::rejected(
                Step::MeatGet,
                format!(
                    "weight {grams}g outside {}..={}g",
                    self.config.meat_weight.start(),
                    self.config.meat_weight.end()
                ),
            ));
        }
        Ok(state)
    }

    async fn check_meat(&self, meat: State) -> Result<State, ProcessError> {
        meat.expect(Step::MeatGet)?;
        let fats = meat.macronutrients().fats;
        if !self.config.meat_fats.contains(&fats) {
            return Err(ProcessError::rejected(
                Step::MeatCheck,
                format!(
                    "fats {fats}g outside {}..={}g",
                    self.config.meat_fats.start(),
                    self.config.meat_fats.end()
                ),
            ));
        }
        self.transition(meat, Step::MeatGet, Step::MeatCheck).await
    }

    async fn marinate_meat(&self, meat: State) -> Result<State, ProcessError> {
        let marinated = self
            .transition(meat, Step::MeatCheck, Step::MeatMarinate)
            .await?;
        let quantity = marinated
            .quantity()
            .add_percent(self.config.marinate_gain_percent);
        Ok(marinated.with_quantity(quantity))
    }

    async fn get_grill(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError> {
        let (grill, state) = self
            .fetch(
                repository,
                Step::GrillGet,
                ResourceKind::Grill,
                self.config.grill_request,
            )
            .await?;
        let grams = grill.quantity.amount();
        if !self.config.grill_weight.contains(&grams) {
            return Err(ProcessError::rejected(
                Step::GrillGet,
                format!(
                    "grill supply {grams}g outside {}..={}g",
                    self.config.grill_weight.start(),
                    self.config.grill_weight.end()
                ),
            ));
        }
        Ok(state)
    }

    async fn check_grill(&self, grill: State) -> Result<State, ProcessError> {
        // Lighting burns the whole supply.
        let lit = self
            .transition(grill, Step::GrillGet, Step::GrillCheck)
            .await?;
        let burnt = Quantity::zero(lit.quantity().unit());
        Ok(lit.with_quantity(burnt))
    }

    async fn prepare_for_roasting(&self, meat: State, grill: State) -> Result<State, ProcessError> {
        meat.expect(Step::MeatMarinate)?;
        grill.expect(Step::GrillCheck)?;
        let on_grill = meat.merge(&grill);
        self.transition(on_grill, Step::MeatMarinate, Step::MeatPrepare)
            .await
    }

    async fn roast_meat(&self, meat: State) -> Result<State, ProcessError> {
        self.transition(meat, Step::MeatPrepare, Step::MeatRoast)
            .await
    }

    async fn get_sauce(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError> {
        let (_, state) = self
            .fetch(
                repository,
                Step::SauceGet,
                ResourceKind::Sauce,
                self.config.sauce_request,
            )
            .await?;
        Ok(state)
    }

    async fn prepare_sauce(&self, sauce: State) -> Result<State, ProcessError> {
        self.transition(sauce, Step::SauceGet, Step::SaucePrepare)
            .await
    }

    async fn get_rosemary(
        &self,
        repository: &dyn ResourceRepository,
    ) -> Result<State, ProcessError> {
        let (_, state) = self
            .fetch(
                repository,
                Step::RosemaryGet,
                ResourceKind::Rosemary,
                self.config.rosemary_request,
            )
            .await?;
        Ok(state)
    }

    async fn roast_rosemary(&self, rosemary: State) -> Result<State, ProcessError> {
        self.transition(rosemary, Step::RosemaryGet, Step::RosemaryRoast)
            .await
    }

    async fn serve(
        &self,
        meat: State,
        sauce: Result<State, ProcessError>,
        rosemary: Result<State, ProcessError>,
    ) -> Result<State, ProcessError> {
        let mut plate = self
            .transition(meat, Step::MeatRoast, Step::MeatServe)
            .await?;

        for (kind, expected, garnish) in [
            (ResourceKind::Sauce, Step::SaucePrepare, sauce),
            (ResourceKind::Rosemary, Step::RosemaryRoast, rosemary),
        ] {
            let garnish = garnish.and_then(|state| {
                state.expect(expected)?;
                Ok(state)
            });
            match garnish {
                Ok(state) => plate = plate.garnish(&state),
                Err(err) => self.notify_missing(kind, &err).await,
            }
        }

        Ok(plate)
    }

    async fn finish(&self, served: State) -> Result<Steak, ProcessError> {
        served.expect(Step::MeatServe)?;
        let value = self.value_chain.value(Step::Finish, Duration::ZERO);
        Ok(Steak {
            state: served.advance(Step::Finish, Duration::ZERO, value),
            finished_at: self.clock.now(),
        })
    }
}
