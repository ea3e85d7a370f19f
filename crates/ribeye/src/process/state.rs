//! Step tags and the immutable per-branch state record.

use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use crate::error::ProcessError;
use crate::resource::{Macronutrients, Quantity, Resource, ResourceKind};

/// Closed set of operations. Each branch runs its steps in declaration order;
/// `Finish` is terminal and belongs to no branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Step {
    #[serde(rename = "meat.get")]
    MeatGet,
    #[serde(rename = "meat.check")]
    MeatCheck,
    #[serde(rename = "meat.marinate")]
    MeatMarinate,
    #[serde(rename = "meat.prepare")]
    MeatPrepare,
    #[serde(rename = "meat.roast")]
    MeatRoast,
    #[serde(rename = "meat.serve")]
    MeatServe,
    #[serde(rename = "grill.get")]
    GrillGet,
    #[serde(rename = "grill.check")]
    GrillCheck,
    #[serde(rename = "sauce.get")]
    SauceGet,
    #[serde(rename = "sauce.prepare")]
    SaucePrepare,
    #[serde(rename = "rosemary.get")]
    RosemaryGet,
    #[serde(rename = "rosemary.roast")]
    RosemaryRoast,
    #[serde(rename = "finish")]
    Finish,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MeatGet => "meat.get",
            Self::MeatCheck => "meat.check",
            Self::MeatMarinate => "meat.marinate",
            Self::MeatPrepare => "meat.prepare",
            Self::MeatRoast => "meat.roast",
            Self::MeatServe => "meat.serve",
            Self::GrillGet => "grill.get",
            Self::GrillCheck => "grill.check",
            Self::SauceGet => "sauce.get",
            Self::SaucePrepare => "sauce.prepare",
            Self::RosemaryGet => "rosemary.get",
            Self::RosemaryRoast => "rosemary.roast",
            Self::Finish => "finish",
        }
    }

    /// Resource branch this step belongs to.
    pub fn branch(&self) -> Option<ResourceKind> {
        match self {
            Self::MeatGet
            | Self::MeatCheck
            | Self::MeatMarinate
            | Self::MeatPrepare
            | Self::MeatRoast
            | Self::MeatServe => Some(ResourceKind::Meat),
            Self::GrillGet | Self::GrillCheck => Some(ResourceKind::Grill),
            Self::SauceGet | Self::SaucePrepare => Some(ResourceKind::Sauce),
            Self::RosemaryGet | Self::RosemaryRoast => Some(ResourceKind::Rosemary),
            Self::Finish => None,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn as_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

/// Snapshot of a branch after one step.
///
/// Never mutated once produced: every transition below consumes or clones the
/// previous snapshot and returns its successor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct State {
    step: Step,
    macronutrients: Macronutrients,
    quantity: Quantity,
    #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
    elapsed: Duration,
    value: f64,
    ingredients: BTreeSet<ResourceKind>,
}

impl State {
    /// First state of a branch, built from the resource it pulled.
    pub fn from_resource(step: Step, resource: &Resource, elapsed: Duration, value: f64) -> Self {
        Self {
            step,
            macronutrients: resource.macronutrients,
            quantity: resource.quantity,
            elapsed,
            value,
            ingredients: BTreeSet::from([resource.kind]),
        }
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn macronutrients(&self) -> Macronutrients {
        self.macronutrients
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn ingredients(&self) -> &BTreeSet<ResourceKind> {
        &self.ingredients
    }

    /// Fail unless this state was produced by `step`.
    pub fn expect(&self, step: Step) -> Result<&Self, ProcessError> {
        if self.step == step {
            Ok(self)
        } else {
            Err(ProcessError::UnexpectedStep {
                expected: step,
                actual: self.step,
            })
        }
    }

    /// Successor produced by `step` after `elapsed`, adding `value`.
    pub fn advance(self, step: Step, elapsed: Duration, value: f64) -> Self {
        Self {
            step,
            elapsed: self.elapsed + elapsed,
            value: self.value + value,
            ..self
        }
    }

    pub fn with_quantity(self, quantity: Quantity) -> Self {
        Self { quantity, ..self }
    }

    /// Fold a sibling branch into this one. Branches ran concurrently, so the
    /// wall time is the longer of the two.
    pub fn merge(self, other: &State) -> Self {
        let mut ingredients = self.ingredients;
        ingredients.extend(other.ingredients.iter().copied());
        Self {
            elapsed: self.elapsed.max(other.elapsed),
            value: self.value + other.value,
            ingredients,
            ..self
        }
    }

    /// Add a garnish prepared alongside this branch. Its time overlapped
    /// with ours and is not added.
    pub fn garnish(self, other: &State) -> Self {
        let mut ingredients = self.ingredients;
        ingredients.extend(other.ingredients.iter().copied());
        Self {
            value: self.value + other.value,
            ingredients,
            ..self
        }
    }
}

/// The finished artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Steak {
    #[serde(flatten)]
    pub state: State,
    pub finished_at: DateTime<Utc>,
}

impl Steak {
    /// Side components that made it onto the plate.
    pub fn garnish(&self) -> Vec<ResourceKind> {
        self.state
            .ingredients
            .iter()
            .copied()
            .filter(|kind| matches!(kind, ResourceKind::Sauce | ResourceKind::Rosemary))
            .collect()
    }

    pub fn has(&self, kind: ResourceKind) -> bool {
        self.state.ingredients.contains(&kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn state(kind: ResourceKind, step: Step, ms: u64) -> State {
        let resource = Resource::new(
            kind,
            Macronutrients::default(),
            Quantity::Weight(100),
            Utc::now() + ChronoDuration::days(1),
        );
        State::from_resource(step, &resource, Duration::from_millis(ms), 10.0)
    }

    #[test]
    fn step_names_and_branches() {
        assert_eq!(Step::MeatMarinate.to_string(), "meat.marinate");
        assert_eq!(Step::RosemaryRoast.branch(), Some(ResourceKind::Rosemary));
        assert_eq!(Step::Finish.branch(), None);
        assert_eq!(
            serde_json::to_value(Step::GrillCheck).unwrap(),
            serde_json::json!("grill.check")
        );
    }

    #[test]
    fn expect_checks_the_tag() {
        let meat = state(ResourceKind::Meat, Step::MeatGet, 5);
        assert!(meat.expect(Step::MeatGet).is_ok());
        assert_eq!(
            meat.expect(Step::MeatCheck),
            Err(ProcessError::UnexpectedStep {
                expected: Step::MeatCheck,
                actual: Step::MeatGet
            })
        );
    }

    #[test]
    fn advance_accumulates() {
        let meat = state(ResourceKind::Meat, Step::MeatGet, 5).advance(
            Step::MeatCheck,
            Duration::from_millis(7),
            2.5,
        );
        assert_eq!(meat.step(), Step::MeatCheck);
        assert_eq!(meat.elapsed(), Duration::from_millis(12));
        assert_eq!(meat.value(), 12.5);
    }

    #[test]
    fn merge_takes_longest_branch_time() {
        let meat = state(ResourceKind::Meat, Step::MeatMarinate, 30);
        let grill = state(ResourceKind::Grill, Step::GrillCheck, 50);
        let merged = meat.merge(&grill);
        assert_eq!(merged.elapsed(), Duration::from_millis(50));
        assert_eq!(merged.value(), 20.0);
        assert!(merged.ingredients().contains(&ResourceKind::Grill));
        assert_eq!(merged.step(), Step::MeatMarinate);
    }

    #[test]
    fn steak_reports_garnish_only() {
        let served = state(ResourceKind::Meat, Step::MeatServe, 1)
            .garnish(&state(ResourceKind::Grill, Step::GrillCheck, 1))
            .garnish(&state(ResourceKind::Sauce, Step::SaucePrepare, 1));
        let steak = Steak {
            state: served,
            finished_at: Utc::now(),
        };
        assert_eq!(steak.garnish(), vec![ResourceKind::Sauce]);
        assert!(!steak.has(ResourceKind::Rosemary));
    }
}
