//! Store PostgreSQL
//!
//! Las transiciones usan `SELECT ... FOR UPDATE` dentro de una transacción:
//! dos `accept_ride` concurrentes sobre el mismo viaje quedan serializados por
//! el lock de fila y el segundo lee el estado ya actualizado. La espera está
//! acotada con `lock_timeout` (local a la transacción).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info};

use super::ride_repository::{ensure_transition, RideRepository};
use crate::models::{
    Coordinates, DriverId, Feedback, FeedbackId, Location, LocationId, NewFeedback, Ride,
    RideDetails, RideId, RideStatus, RideTransition, RiderId,
};
use crate::utils::errors::{AppError, AppResult};

const LOCK_NOT_AVAILABLE: &str = "55P03";
const FOREIGN_KEY_VIOLATION: &str = "23503";

pub struct PgRideRepository {
    pool: PgPool,
    lock_timeout: Duration,
}

#[derive(Debug, sqlx::FromRow)]
struct RideDetailsRow {
    ride_id: RideId,
    status: RideStatus,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    pickup_location_id: LocationId,
    pickup_latitude: f64,
    pickup_longitude: f64,
    dropoff_location_id: LocationId,
    dropoff_latitude: f64,
    dropoff_longitude: f64,
    rider_id: RiderId,
    driver_id: Option<DriverId>,
}

impl From<RideDetailsRow> for RideDetails {
    fn from(row: RideDetailsRow) -> Self {
        RideDetails {
            ride_id: row.ride_id,
            status: row.status,
            pickup: Location {
                location_id: row.pickup_location_id,
                latitude: row.pickup_latitude,
                longitude: row.pickup_longitude,
            },
            dropoff: Location {
                location_id: row.dropoff_location_id,
                latitude: row.dropoff_latitude,
                longitude: row.dropoff_longitude,
            },
            rider_id: row.rider_id,
            driver_id: row.driver_id,
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}

fn has_code(error: &sqlx::Error, code: &str) -> bool {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .as_deref()
        == Some(code)
}

/// Valor para `lock_timeout`; nunca `0ms`, que en PostgreSQL desactiva el límite.
fn lock_timeout_setting(timeout: Duration) -> String {
    format!("{}ms", timeout.as_millis().max(1))
}

impl PgRideRepository {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> AppResult<Transaction<'static, Postgres>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("SELECT set_config('lock_timeout', $1, true)")
            .bind(lock_timeout_setting(self.lock_timeout))
            .execute(&mut *tx)
            .await?;

        Ok(tx)
    }

    /// Lock exclusivo sobre la fila del viaje; devuelve su estado actual.
    async fn lock_ride(
        tx: &mut Transaction<'static, Postgres>,
        ride_id: RideId,
    ) -> AppResult<Option<RideStatus>> {
        sqlx::query_scalar::<_, RideStatus>(
            "SELECT status FROM rides WHERE ride_id = $1 FOR UPDATE",
        )
        .bind(ride_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| {
            if has_code(&e, LOCK_NOT_AVAILABLE) {
                AppError::LockTimeout { ride_id }
            } else {
                AppError::Database(e)
            }
        })
    }

    async fn insert_location(
        tx: &mut Transaction<'static, Postgres>,
        coordinates: Coordinates,
    ) -> AppResult<LocationId> {
        let location_id = sqlx::query_scalar::<_, LocationId>(
            "INSERT INTO locations (latitude, longitude) VALUES ($1, $2) RETURNING location_id",
        )
        .bind(coordinates.latitude)
        .bind(coordinates.longitude)
        .fetch_one(&mut **tx)
        .await?;

        Ok(location_id)
    }
}

// Un `?` antes del commit descarta la transacción: sqlx hace rollback al soltarla.
#[async_trait]
impl RideRepository for PgRideRepository {
    async fn create_ride(
        &self,
        rider_id: RiderId,
        pickup: Coordinates,
        dropoff: Coordinates,
    ) -> AppResult<RideId> {
        let mut tx = self.pool.begin().await?;

        let pickup_id = Self::insert_location(&mut tx, pickup).await?;
        let dropoff_id = Self::insert_location(&mut tx, dropoff).await?;

        let ride_id = sqlx::query_scalar::<_, RideId>(
            r#"
            INSERT INTO rides (pickup_location_id, dropoff_location_id, status, start_time)
            VALUES ($1, $2, $3, NOW())
            RETURNING ride_id
            "#,
        )
        .bind(pickup_id)
        .bind(dropoff_id)
        .bind(RideStatus::Requested)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO ride_participants (ride_id, rider_id) VALUES ($1, $2)")
            .bind(ride_id)
            .bind(rider_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!("🚕 Viaje {} creado para rider {}", ride_id, rider_id);
        Ok(ride_id)
    }

    async fn accept_ride(&self, ride_id: RideId, driver_id: DriverId) -> AppResult<Ride> {
        let mut tx = self.begin().await?;

        let current = Self::lock_ride(&mut tx, ride_id).await?;
        let next = ensure_transition(ride_id, current, RideTransition::Accept)?;

        let ride = sqlx::query_as::<_, Ride>(
            "UPDATE rides SET status = $2 WHERE ride_id = $1 RETURNING *",
        )
        .bind(ride_id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        let bound = sqlx::query(
            "UPDATE ride_participants SET driver_id = $2 WHERE ride_id = $1 AND driver_id IS NULL",
        )
        .bind(ride_id)
        .bind(driver_id)
        .execute(&mut *tx)
        .await?;

        if bound.rows_affected() != 1 {
            return Err(AppError::Store(format!(
                "ride {} has no participants row or a driver already bound",
                ride_id
            )));
        }

        tx.commit().await?;

        debug!("Ride {} accepted by driver {}", ride_id, driver_id);
        Ok(ride)
    }

    async fn complete_ride(&self, ride_id: RideId) -> AppResult<Ride> {
        let mut tx = self.begin().await?;

        let current = Self::lock_ride(&mut tx, ride_id).await?;
        let next = ensure_transition(ride_id, current, RideTransition::Complete)?;

        let ride = sqlx::query_as::<_, Ride>(
            r#"
            UPDATE rides
            SET status = $2, end_time = GREATEST(NOW(), start_time)
            WHERE ride_id = $1
            RETURNING *
            "#,
        )
        .bind(ride_id)
        .bind(next)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!("Ride {} completed", ride_id);
        Ok(ride)
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> AppResult<FeedbackId> {
        let ride_id = feedback.ride_id;
        let mut tx = self.pool.begin().await?;

        let feedback_id = sqlx::query_scalar::<_, FeedbackId>(
            r#"
            INSERT INTO feedback (rider_rating, driver_rating, rider_comments, driver_comments)
            VALUES ($1, $2, $3, $4)
            RETURNING feedback_id
            "#,
        )
        .bind(feedback.rider_rating)
        .bind(feedback.driver_rating)
        .bind(feedback.rider_comments)
        .bind(feedback.driver_comments)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO ride_feedback (ride_id, feedback_id) VALUES ($1, $2)")
            .bind(ride_id)
            .bind(feedback_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                if has_code(&e, FOREIGN_KEY_VIOLATION) {
                    AppError::UnknownRide { ride_id }
                } else {
                    AppError::Database(e)
                }
            })?;

        tx.commit().await?;

        Ok(feedback_id)
    }

    async fn find_ride(&self, ride_id: RideId) -> AppResult<Option<RideDetails>> {
        let row = sqlx::query_as::<_, RideDetailsRow>(
            r#"
            SELECT r.ride_id, r.status, r.start_time, r.end_time,
                   p.location_id AS pickup_location_id,
                   p.latitude AS pickup_latitude,
                   p.longitude AS pickup_longitude,
                   d.location_id AS dropoff_location_id,
                   d.latitude AS dropoff_latitude,
                   d.longitude AS dropoff_longitude,
                   rp.rider_id, rp.driver_id
            FROM rides r
            JOIN locations p ON p.location_id = r.pickup_location_id
            JOIN locations d ON d.location_id = r.dropoff_location_id
            JOIN ride_participants rp ON rp.ride_id = r.ride_id
            WHERE r.ride_id = $1
            "#,
        )
        .bind(ride_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(RideDetails::from))
    }

    async fn list_feedback(&self, ride_id: RideId) -> AppResult<Vec<Feedback>> {
        let feedback = sqlx::query_as::<_, Feedback>(
            r#"
            SELECT f.feedback_id, f.rider_rating, f.driver_rating,
                   f.rider_comments, f.driver_comments
            FROM feedback f
            JOIN ride_feedback rf ON rf.feedback_id = f.feedback_id
            WHERE rf.ride_id = $1
            ORDER BY f.feedback_id
            "#,
        )
        .bind(ride_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(feedback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_setting_is_never_zero() {
        assert_eq!(lock_timeout_setting(Duration::from_millis(5000)), "5000ms");
        assert_eq!(lock_timeout_setting(Duration::ZERO), "1ms");
        assert_eq!(lock_timeout_setting(Duration::from_micros(300)), "1ms");
    }
}
