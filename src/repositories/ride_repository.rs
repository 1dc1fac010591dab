//! Contrato del store de viajes
//!
//! Cada método es una unidad de trabajo atómica: o se persisten todas sus
//! escrituras o ninguna. `accept_ride` y `complete_ride` deben tomar un lock
//! exclusivo sobre el viaje antes de leer su estado y mantenerlo hasta el
//! commit o el abort.

use async_trait::async_trait;

use crate::models::{
    Coordinates, DriverId, Feedback, FeedbackId, NewFeedback, Ride, RideDetails, RideId,
    RideStatus, RideTransition, RiderId,
};
use crate::utils::errors::{AppError, AppResult};

#[async_trait]
pub trait RideRepository: Send + Sync {
    /// Crea las dos ubicaciones, el viaje (`requested`) y sus participantes.
    async fn create_ride(
        &self,
        rider_id: RiderId,
        pickup: Coordinates,
        dropoff: Coordinates,
    ) -> AppResult<RideId>;

    /// `requested -> accepted` y asignación del driver.
    async fn accept_ride(&self, ride_id: RideId, driver_id: DriverId) -> AppResult<Ride>;

    /// `accepted -> completed` y registro de `end_time`.
    async fn complete_ride(&self, ride_id: RideId) -> AppResult<Ride>;

    /// Inserta el feedback y su enlace con el viaje.
    async fn create_feedback(&self, feedback: NewFeedback) -> AppResult<FeedbackId>;

    async fn find_ride(&self, ride_id: RideId) -> AppResult<Option<RideDetails>>;

    async fn list_feedback(&self, ride_id: RideId) -> AppResult<Vec<Feedback>>;
}

/// Comprueba la transición sobre el estado leído bajo lock.
///
/// Un viaje inexistente (`None`) se trata igual que un estado incorrecto.
pub fn ensure_transition(
    ride_id: RideId,
    current: Option<RideStatus>,
    transition: RideTransition,
) -> AppResult<RideStatus> {
    current
        .and_then(|status| status.apply(transition))
        .ok_or(AppError::Conflict {
            ride_id,
            transition,
        })
}
