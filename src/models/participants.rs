//! Modelo de RideParticipants
//!
//! Asocia un viaje con exactamente un rider (al crearlo) y como mucho un
//! driver (asignado una única vez, al aceptarlo).

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ride::RideId;

pub type RiderId = i64;
pub type DriverId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct RideParticipants {
    pub ride_id: RideId,
    pub rider_id: RiderId,
    pub driver_id: Option<DriverId>,
}
