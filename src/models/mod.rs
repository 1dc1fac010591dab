//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos que mapean exactamente
//! al schema PostgreSQL (ver `migrations/`).

pub mod feedback;
pub mod location;
pub mod participants;
pub mod ride;

pub use feedback::{Feedback, FeedbackId, NewFeedback, RideFeedback};
pub use location::{Coordinates, Location, LocationId};
pub use participants::{DriverId, RideParticipants, RiderId};
pub use ride::{Ride, RideDetails, RideId, RideStatus, RideTransition};
