//! Modelo de Ride
//!
//! Este módulo contiene el struct Ride, el ENUM ride_status y la máquina de
//! estados del ciclo de vida de un viaje:
//!
//! ```text
//! requested --accept--> accepted --complete--> completed
//! ```
//!
//! Las transiciones son monótonas: un viaje nunca vuelve a un estado anterior
//! ni salta `accepted` para llegar a `completed`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

use super::location::{Location, LocationId};
use super::participants::{DriverId, RiderId};

pub type RideId = i64;

/// Estado del viaje - mapea al ENUM ride_status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Type, PartialEq, Eq, Hash)]
#[sqlx(type_name = "ride_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RideStatus {
    Requested,
    Accepted,
    Completed,
}

/// Transiciones que un caller puede solicitar sobre un viaje existente
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RideTransition {
    Accept,
    Complete,
}

impl RideStatus {
    /// Aplica una transición; `None` si no está permitida desde este estado.
    pub fn apply(self, transition: RideTransition) -> Option<RideStatus> {
        if self != transition.required_status() {
            return None;
        }

        Some(match transition {
            RideTransition::Accept => RideStatus::Accepted,
            RideTransition::Complete => RideStatus::Completed,
        })
    }

    pub fn is_terminal(self) -> bool {
        self == RideStatus::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RideStatus::Requested => "requested",
            RideStatus::Accepted => "accepted",
            RideStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl RideTransition {
    /// Estado requerido para que la transición sea válida
    pub fn required_status(self) -> RideStatus {
        match self {
            RideTransition::Accept => RideStatus::Requested,
            RideTransition::Complete => RideStatus::Accepted,
        }
    }

    /// Mensaje devuelto al caller cuando la transición es rechazada
    pub fn conflict_message(self) -> &'static str {
        match self {
            RideTransition::Accept => "Ride not found or already accepted",
            RideTransition::Complete => "Ride not found or cannot be completed",
        }
    }

    pub fn success_message(self) -> &'static str {
        match self {
            RideTransition::Accept => "Ride accepted",
            RideTransition::Complete => "Ride completed",
        }
    }
}

impl fmt::Display for RideTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RideTransition::Accept => f.write_str("accept"),
            RideTransition::Complete => f.write_str("complete"),
        }
    }
}

/// Ride principal - mapea exactamente a la tabla rides
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ride {
    pub ride_id: RideId,
    pub pickup_location_id: LocationId,
    pub dropoff_location_id: LocationId,
    pub status: RideStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Vista de lectura: viaje con ubicaciones y participantes
#[derive(Debug, Clone, Serialize)]
pub struct RideDetails {
    pub ride_id: RideId,
    pub status: RideStatus,
    pub pickup: Location,
    pub dropoff: Location,
    pub rider_id: RiderId,
    pub driver_id: Option<DriverId>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}
