//! Gestor del ciclo de vida de los viajes
//!
//! Punto de entrada de las cuatro operaciones del sistema (solicitar,
//! aceptar, completar, feedback) más las lecturas. Valida la entrada y
//! delega cada unidad de trabajo en el `RideRepository` inyectado; no guarda
//! estado propio entre llamadas.

use std::sync::Arc;

use tracing::{info, warn};
use validator::Validate;

use crate::dto::{
    AcceptRideRequest, CompleteRideRequest, ProvideFeedbackRequest, RequestRideRequest,
};
use crate::models::{Feedback, FeedbackId, NewFeedback, Ride, RideDetails, RideId};
use crate::repositories::RideRepository;
use crate::utils::errors::{validation_error, AppError, AppResult};
use crate::utils::validation::validate_positive;

#[derive(Clone)]
pub struct RideLifecycleManager {
    repository: Arc<dyn RideRepository>,
}

impl RideLifecycleManager {
    pub fn new(repository: Arc<dyn RideRepository>) -> Self {
        Self { repository }
    }

    /// Solicitar un viaje: ubicaciones, viaje `requested` y rider, todo o nada
    pub async fn request_ride(&self, request: RequestRideRequest) -> AppResult<RideId> {
        request.validate()?;

        let ride_id = self
            .repository
            .create_ride(request.rider_id, request.pickup(), request.dropoff())
            .await
            .map_err(|e| log_failure("request_ride", None, e))?;

        info!("✅ Viaje {} solicitado por rider {}", ride_id, request.rider_id);
        Ok(ride_id)
    }

    /// Aceptar un viaje `requested`; sólo uno de varios intentos concurrentes gana
    pub async fn accept_ride(&self, request: AcceptRideRequest) -> AppResult<Ride> {
        request.validate()?;

        let ride = self
            .repository
            .accept_ride(request.ride_id, request.driver_id)
            .await
            .map_err(|e| log_failure("accept_ride", Some(request.ride_id), e))?;

        info!("✅ Viaje {} aceptado por driver {}", ride.ride_id, request.driver_id);
        Ok(ride)
    }

    /// Completar un viaje `accepted`
    pub async fn complete_ride(&self, request: CompleteRideRequest) -> AppResult<Ride> {
        request.validate()?;

        let ride = self
            .repository
            .complete_ride(request.ride_id)
            .await
            .map_err(|e| log_failure("complete_ride", Some(request.ride_id), e))?;

        info!("🏁 Viaje {} completado", ride.ride_id);
        Ok(ride)
    }

    /// Registrar feedback. Se permite en cualquier estado del viaje.
    pub async fn provide_feedback(&self, request: ProvideFeedbackRequest) -> AppResult<FeedbackId> {
        request.validate()?;

        let ride_id = request.ride_id;
        let feedback = NewFeedback {
            ride_id,
            rider_rating: request.rider_rating,
            driver_rating: request.driver_rating,
            rider_comments: request.rider_comments,
            driver_comments: request.driver_comments,
        };

        let feedback_id = self
            .repository
            .create_feedback(feedback)
            .await
            .map_err(|e| log_failure("provide_feedback", Some(ride_id), e))?;

        info!("📝 Feedback {} registrado para el viaje {}", feedback_id, ride_id);
        Ok(feedback_id)
    }

    pub async fn get_ride(&self, ride_id: RideId) -> AppResult<RideDetails> {
        validate_ride_id(ride_id)?;

        self.repository
            .find_ride(ride_id)
            .await?
            .ok_or(AppError::UnknownRide { ride_id })
    }

    pub async fn list_feedback(&self, ride_id: RideId) -> AppResult<Vec<Feedback>> {
        // 404 para viajes inexistentes en lugar de una lista vacía
        self.get_ride(ride_id).await?;
        self.repository.list_feedback(ride_id).await
    }
}

fn validate_ride_id(ride_id: RideId) -> AppResult<()> {
    validate_positive(ride_id).map_err(|_| validation_error("ride_id", "ride_id must be positive"))
}

fn log_failure(operation: &str, ride_id: Option<RideId>, error: AppError) -> AppError {
    match ride_id {
        Some(ride_id) => warn!("❌ {} falló para el viaje {}: {}", operation, ride_id, error),
        None => warn!("❌ {} falló: {}", operation, error),
    }
    error
}
