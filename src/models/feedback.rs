//! Modelo de Feedback
//!
//! Valoraciones y comentarios de rider y driver. Se enlazan a un viaje a
//! través de la tabla ride_feedback (un viaje puede tener varios).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ride::RideId;

pub type FeedbackId = i64;

/// Feedback principal - mapea a la tabla feedback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Feedback {
    pub feedback_id: FeedbackId,
    pub rider_rating: i32,
    pub driver_rating: i32,
    pub rider_comments: String,
    pub driver_comments: String,
}

/// Feedback validado y listo para insertar
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub ride_id: RideId,
    pub rider_rating: i32,
    pub driver_rating: i32,
    pub rider_comments: String,
    pub driver_comments: String,
}

/// Enlace ride_feedback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, FromRow)]
pub struct RideFeedback {
    pub ride_id: RideId,
    pub feedback_id: FeedbackId,
}
