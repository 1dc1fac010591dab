//! Services module
//!
//! Este módulo contiene la lógica de negocio de la aplicación.

pub mod ride_lifecycle;

pub use ride_lifecycle::RideLifecycleManager;
