//! Backend del ciclo de vida de viajes compartidos
//!
//! Solicitar un viaje, aceptarlo, completarlo y registrar feedback, con
//! transiciones de estado serializadas por viaje.

pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
