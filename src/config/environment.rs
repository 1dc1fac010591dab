//! Configuración de variables de entorno
//!
//! Este módulo lee la configuración del servidor y del gestor de viajes.
//! Todas las variables tienen valor por defecto; un valor presente pero
//! inválido es un error de arranque.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

/// Backend de persistencia
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(anyhow!("unknown STORE_BACKEND '{}'", other)),
        }
    }
}

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    pub log_level: tracing::Level,
    pub store_backend: StoreBackend,
    pub ride_lock_timeout: Duration,
    pub run_migrations: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            port: 3000,
            host: "0.0.0.0".to_string(),
            cors_origins: Vec::new(),
            log_level: tracing::Level::DEBUG,
            store_backend: StoreBackend::Postgres,
            ride_lock_timeout: Duration::from_millis(5000),
            run_migrations: true,
        }
    }
}

impl EnvironmentConfig {
    /// Leer la configuración desde variables de entorno
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Igual que `from_env` pero con una fuente de variables arbitraria
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let cors_origins = lookup("CORS_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or(defaults.cors_origins);

        let ride_lock_timeout = match parse_var::<u64, _>(&lookup, "RIDE_LOCK_TIMEOUT_MS")? {
            // PostgreSQL interpreta lock_timeout = 0 como espera ilimitada
            Some(0) => return Err(anyhow!("RIDE_LOCK_TIMEOUT_MS must be greater than 0")),
            Some(millis) => Duration::from_millis(millis),
            None => defaults.ride_lock_timeout,
        };

        Ok(Self {
            environment: lookup("ENVIRONMENT").unwrap_or(defaults.environment),
            port: parse_var(&lookup, "PORT")?.unwrap_or(defaults.port),
            host: lookup("HOST").unwrap_or(defaults.host),
            cors_origins,
            log_level: parse_var(&lookup, "LOG_LEVEL")?.unwrap_or(defaults.log_level),
            store_backend: parse_var(&lookup, "STORE_BACKEND")?
                .unwrap_or(defaults.store_backend),
            ride_lock_timeout,
            run_migrations: parse_var(&lookup, "RUN_MIGRATIONS")?
                .unwrap_or(defaults.run_migrations),
        })
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

pub(crate) fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow!("{}", e))
            .with_context(|| format!("{} has an invalid value '{}'", key, raw)),
        None => Ok(None),
    }
}
