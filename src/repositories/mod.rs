//! Repositorios de persistencia
//!
//! El gestor de viajes sólo conoce el trait `RideRepository`; el backend
//! concreto (PostgreSQL o memoria) se elige en el arranque.

pub mod memory_ride_repository;
pub mod pg_ride_repository;
pub mod ride_repository;

pub use memory_ride_repository::{InMemoryRideRepository, RideLockGuard, WriteStep};
pub use pg_ride_repository::PgRideRepository;
pub use ride_repository::RideRepository;
