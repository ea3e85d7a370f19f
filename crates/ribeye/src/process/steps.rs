//! Step catalog consumed by the cooking process.

use async_trait::async_trait;

use super::state::{State, Steak};
use crate::error::ProcessError;
use crate::repository::ResourceRepository;

/// One async operation per step. Each takes the state produced by the step
/// before it in the same branch; the first step of a branch pulls from the
/// repository instead.
#[async_trait]
pub trait CookingSteps: Send + Sync {
    async fn get_meat(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError>;
    async fn check_meat(&self, meat: State) -> Result<State, ProcessError>;
    async fn marinate_meat(&self, meat: State) -> Result<State, ProcessError>;

    async fn get_grill(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError>;
    async fn check_grill(&self, grill: State) -> Result<State, ProcessError>;

    /// Put the marinated meat on the ready grill.
    async fn prepare_for_roasting(&self, meat: State, grill: State) -> Result<State, ProcessError>;
    async fn roast_meat(&self, meat: State) -> Result<State, ProcessError>;

    async fn get_sauce(&self, repository: &dyn ResourceRepository) -> Result<State, ProcessError>;
    async fn prepare_sauce(&self, sauce: State) -> Result<State, ProcessError>;

    async fn get_rosemary(
        &self,
        repository: &dyn ResourceRepository,
    ) -> Result<State, ProcessError>;
    async fn roast_rosemary(&self, rosemary: State) -> Result<State, ProcessError>;

    /// Plate the roasted meat. Receives each garnish branch's raw result and
    /// decides how to degrade when one is missing.
    async fn serve(
        &self,
        meat: State,
        sauce: Result<State, ProcessError>,
        rosemary: Result<State, ProcessError>,
    ) -> Result<State, ProcessError>;

    async fn finish(&self, served: State) -> Result<Steak, ProcessError>;
}
