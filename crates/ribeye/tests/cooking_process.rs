//! End-to-end cooking runs against a real storage.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use ribeye::{
    CookingProcess, CookingSteps, FakeClock, Kitchen, KitchenConfig, Macronutrients,
    MemoryListener, MemoryMessenger, ProcessError, Quantity, Resource, ResourceKind,
    ResourceRepository, State, Steak, Step, Storage, StorageConfig, StorageError,
};

fn resource(kind: ResourceKind, quantity: Quantity) -> Resource {
    let fats = if kind == ResourceKind::Meat { 21.0 } else { 2.0 };
    Resource::new(
        kind,
        Macronutrients::new(19.0, fats, 0.5, 270.0),
        quantity,
        Utc::now() + ChronoDuration::days(3),
    )
}

fn full_pantry() -> Vec<Resource> {
    vec![
        resource(ResourceKind::Meat, Quantity::Weight(420)),
        resource(ResourceKind::Grill, Quantity::Weight(900)),
        resource(ResourceKind::Sauce, Quantity::Weight(500)),
        resource(ResourceKind::Rosemary, Quantity::Piece(12)),
    ]
}

fn without(kinds: &[ResourceKind]) -> Vec<Resource> {
    full_pantry()
        .into_iter()
        .filter(|resource| !kinds.contains(&resource.kind))
        .collect()
}

async fn stocked(resources: Vec<Resource>) -> Arc<Storage> {
    let storage = Arc::new(Storage::new(StorageConfig::default()));
    for resource in resources {
        storage.put(resource).await.unwrap();
    }
    storage
}

struct Run {
    result: Result<Steak, ProcessError>,
    messages: Vec<String>,
    steps: Vec<Step>,
}

async fn cook(
    storage: Arc<Storage>,
    steps: impl FnOnce(Arc<MemoryMessenger>) -> Arc<dyn CookingSteps>,
) -> Run {
    let messenger = Arc::new(MemoryMessenger::new());
    let listener = Arc::new(MemoryListener::new());
    let process = CookingProcess::new(steps(Arc::clone(&messenger)), storage)
        .with_listener(listener.clone());

    let result = process.run().await;
    Run {
        result,
        messages: messenger.messages(),
        steps: listener.steps(),
    }
}

fn kitchen(messenger: Arc<MemoryMessenger>) -> Arc<dyn CookingSteps> {
    Arc::new(Kitchen::new(KitchenConfig::default(), messenger))
}

#[tokio::test(start_paused = true)]
async fn full_pantry_yields_a_garnished_steak() {
    let storage = stocked(full_pantry()).await;
    let run = cook(Arc::clone(&storage), kitchen).await;

    let steak = run.result.unwrap();
    assert_eq!(
        steak.garnish(),
        vec![ResourceKind::Sauce, ResourceKind::Rosemary]
    );
    // 420 g plus 7 % marinade.
    assert_eq!(steak.state.quantity(), Quantity::Weight(449));
    assert!(run.messages.is_empty());

    assert_eq!(storage.size(ResourceKind::Meat).await, Quantity::Piece(0));
    assert_eq!(storage.size(ResourceKind::Grill).await, Quantity::Weight(100));
    assert_eq!(storage.size(ResourceKind::Sauce).await, Quantity::Weight(350));
    assert_eq!(storage.size(ResourceKind::Rosemary).await, Quantity::Piece(9));
}

#[tokio::test(start_paused = true)]
async fn missing_sauce_degrades_with_one_message() {
    let storage = stocked(without(&[ResourceKind::Sauce])).await;
    let run = cook(storage, kitchen).await;

    let steak = run.result.unwrap();
    assert_eq!(steak.garnish(), vec![ResourceKind::Rosemary]);
    assert!(!steak.has(ResourceKind::Sauce));
    assert_eq!(run.messages.len(), 1);
    assert!(run.messages[0].contains("sauce"));
    assert!(!run.steps.contains(&Step::SaucePrepare));
}

#[tokio::test(start_paused = true)]
async fn plain_steak_when_no_garnish_is_available() {
    let storage = stocked(without(&[ResourceKind::Sauce, ResourceKind::Rosemary])).await;
    let run = cook(storage, kitchen).await;

    assert!(run.result.unwrap().garnish().is_empty());
    assert_eq!(run.messages.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn lean_meat_aborts_before_roasting() {
    let mut pantry = without(&[ResourceKind::Meat]);
    pantry.push(Resource::new(
        ResourceKind::Meat,
        Macronutrients::new(24.0, 8.0, 0.0, 160.0),
        Quantity::Weight(400),
        Utc::now() + ChronoDuration::days(3),
    ));
    let storage = stocked(pantry).await;
    let run = cook(storage, kitchen).await;

    assert!(matches!(
        run.result,
        Err(ProcessError::Rejected {
            step: Step::MeatCheck,
            ..
        })
    ));
    assert!(run.messages.is_empty());
    assert!(!run.steps.contains(&Step::MeatMarinate));
    assert!(!run.steps.contains(&Step::MeatRoast));
    assert!(!run.steps.contains(&Step::Finish));
}

#[tokio::test(start_paused = true)]
async fn missing_grill_fails_the_run() {
    let storage = stocked(without(&[ResourceKind::Grill])).await;
    let run = cook(storage, kitchen).await;

    assert_eq!(
        run.result,
        Err(ProcessError::Storage(StorageError::NotFound(
            ResourceKind::Grill
        )))
    );
    // The meat branch was still fetching when the grill failed.
    assert!(!run.steps.contains(&Step::MeatMarinate));
}

#[tokio::test(start_paused = true)]
async fn meat_spoiled_in_storage_is_refused() {
    let mut pantry = vec![resource(ResourceKind::Meat, Quantity::Weight(420))];
    for mut item in without(&[ResourceKind::Meat]) {
        item.expiration = Utc::now() + ChronoDuration::days(365);
        pantry.push(item);
    }
    let storage = stocked(pantry).await;
    let clock = FakeClock::default();
    clock.advance(ChronoDuration::days(7));

    let run = cook(storage, |messenger| -> Arc<dyn CookingSteps> {
        let kitchen = Kitchen::new(KitchenConfig::default(), messenger);
        Arc::new(kitchen.with_clock(Arc::new(clock)))
    })
    .await;

    assert!(matches!(
        run.result,
        Err(ProcessError::Rejected {
            step: Step::MeatGet,
            ..
        })
    ));
    assert!(!run.steps.contains(&Step::GrillCheck));
}

/// Kitchen whose roasting always burns the steak.
struct BurntRoast(Kitchen);

#[async_trait]
impl CookingSteps for BurntRoast {
    async fn get_meat(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError> {
        self.0.get_meat(repository).await
    }

    async fn check_meat(&self, meat: State) -> Result<State, ProcessError> {
        self.0.check_meat(meat).await
    }

    async fn marinate_meat(&self, meat: State) -> Result<State, ProcessError> {
        self.0.marinate_meat(meat).await
    }

    async fn get_grill(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError> {
        self.0.get_grill(repository).await
    }

    async fn check_grill(&self, grill: State) -> Result<State, ProcessError> {
        self.0.check_grill(grill).await
    }

    async fn prepare_for_roasting(&self, meat: State, grill: State) -> Result<State, ProcessError> {
        self.0.prepare_for_roasting(meat, grill).await
    }

    async fn roast_meat(&self, _meat: State) -> Result<State, ProcessError> {
        tokio::task::yield_now().await;
        Err(ProcessError::rejected(Step::MeatRoast, "burnt"))
    }

    async fn get_sauce(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError> {
        self.0.get_sauce(repository).await
    }

    async fn prepare_sauce(&self, sauce: State) -> Result<State, ProcessError> {
        self.0.prepare_sauce(sauce).await
    }

    async fn get_rosemary(
        &self,
        repository: &dyn ResourceRepository,
    ) -> Result<State, ProcessError> {
        self.0.get_rosemary(repository).await
    }

    async fn roast_rosemary(&self, rosemary: State) -> Result<State, ProcessError> {
        self.0.roast_rosemary(rosemary).await
    }

    async fn serve(
        &self,
        meat: State,
        sauce: Result<State, ProcessError>,
        rosemary: Result<State, ProcessError>,
    ) -> Result<State, ProcessError> {
        self.0.serve(meat, sauce, rosemary).await
    }

    async fn finish(&self, served: State) -> Result<Steak, ProcessError> {
        self.0.finish(served).await
    }
}

#[tokio::test(start_paused = true)]
async fn burnt_roast_cancels_garnish() {
    let storage = stocked(full_pantry()).await;
    let run = cook(storage, |messenger| -> Arc<dyn CookingSteps> {
        Arc::new(BurntRoast(Kitchen::new(KitchenConfig::default(), messenger)))
    })
    .await;

    assert_eq!(
        run.result,
        Err(ProcessError::rejected(Step::MeatRoast, "burnt"))
    );
    assert!(run.messages.is_empty());
    for step in [
        Step::SauceGet,
        Step::SaucePrepare,
        Step::RosemaryGet,
        Step::RosemaryRoast,
        Step::MeatServe,
        Step::Finish,
    ] {
        assert!(!run.steps.contains(&step), "{step} should not have completed");
    }
}
