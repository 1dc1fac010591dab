//! Modelo de Location
//!
//! Punto inmutable (latitud/longitud) creado una vez por cada recogida o
//! destino. Mapea a la tabla `locations`.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub type LocationId = i64;

/// Location principal - mapea a la tabla locations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Location {
    pub location_id: LocationId,
    pub latitude: f64,
    pub longitude: f64,
}

/// Coordenadas todavía sin persistir
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}
