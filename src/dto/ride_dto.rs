use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{Coordinates, Feedback, FeedbackId, RideDetails, RideId, RideStatus};
use crate::utils::validation::validate_coordinates;

// Request para solicitar un viaje
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_ride_coordinates", skip_on_field_errors = false))]
pub struct RequestRideRequest {
    #[validate(range(min = 1))]
    pub rider_id: i64,
    pub pickup_lat: f64,
    pub pickup_long: f64,
    pub dropoff_lat: f64,
    pub dropoff_long: f64,
}

impl RequestRideRequest {
    pub fn pickup(&self) -> Coordinates {
        Coordinates::new(self.pickup_lat, self.pickup_long)
    }

    pub fn dropoff(&self) -> Coordinates {
        Coordinates::new(self.dropoff_lat, self.dropoff_long)
    }
}

// Rango y finitud de ambas coordenadas (`range` deja pasar NaN)
fn validate_ride_coordinates(request: &RequestRideRequest) -> Result<(), ValidationError> {
    validate_coordinates(request.pickup_lat, request.pickup_long)?;
    validate_coordinates(request.dropoff_lat, request.dropoff_long)
}

// Request para aceptar un viaje
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AcceptRideRequest {
    #[validate(range(min = 1))]
    pub ride_id: i64,
    #[validate(range(min = 1))]
    pub driver_id: i64,
}

// Request para completar un viaje
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompleteRideRequest {
    #[validate(range(min = 1))]
    pub ride_id: i64,
}

// Request para dejar feedback
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProvideFeedbackRequest {
    #[validate(range(min = 1))]
    pub ride_id: i64,
    #[validate(range(min = 1, max = 5))]
    pub rider_rating: i32,
    #[validate(range(min = 1, max = 5))]
    pub driver_rating: i32,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub rider_comments: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub driver_comments: String,
}

// Query del dispatcher legacy: /api?endpoint=request_ride
#[derive(Debug, Deserialize)]
pub struct LegacyEndpointQuery {
    pub endpoint: Option<String>,
}

// Response genérica: `status` + payload aplanado
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            status: "success",
            message: None,
            data,
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            status: "success",
            message: Some(message.into()),
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RideCreated {
    pub ride_id: RideId,
}

#[derive(Debug, Serialize)]
pub struct RideTransitioned {
    pub ride_id: RideId,
    pub ride_status: RideStatus,
}

#[derive(Debug, Serialize)]
pub struct FeedbackCreated {
    pub feedback_id: FeedbackId,
}

#[derive(Debug, Serialize)]
pub struct RideResponse {
    pub ride: RideDetails,
}

#[derive(Debug, Serialize)]
pub struct FeedbackListResponse {
    pub feedback: Vec<Feedback>,
}
