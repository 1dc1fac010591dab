//! Store embebido en memoria
//!
//! Equivalente en proceso del store PostgreSQL, usado en desarrollo
//! (`STORE_BACKEND=memory`) y en los tests. El lock de fila se sustituye por
//! un `tokio::sync::Mutex` por viaje y las escrituras de cada operación se
//! preparan en una `UnitOfWork` que se aplica de una sola vez en el commit.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use super::ride_repository::{ensure_transition, RideRepository};
use crate::models::{
    Coordinates, DriverId, Feedback, FeedbackId, Location, LocationId, NewFeedback, Ride,
    RideDetails, RideFeedback, RideId, RideParticipants, RideStatus, RideTransition, RiderId,
};
use crate::utils::errors::{AppError, AppResult};

/// Guard del lock exclusivo de un viaje
pub type RideLockGuard = OwnedMutexGuard<()>;

/// Tabla sobre la que se puede inyectar un fallo de escritura
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStep {
    Location,
    Ride,
    RideParticipants,
    Feedback,
    RideFeedback,
}

impl fmt::Display for WriteStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = match self {
            WriteStep::Location => "locations",
            WriteStep::Ride => "rides",
            WriteStep::RideParticipants => "ride_participants",
            WriteStep::Feedback => "feedback",
            WriteStep::RideFeedback => "ride_feedback",
        };
        f.write_str(table)
    }
}

#[derive(Debug, Default)]
struct Tables {
    locations: BTreeMap<LocationId, Location>,
    rides: BTreeMap<RideId, Ride>,
    participants: BTreeMap<RideId, RideParticipants>,
    feedback: BTreeMap<FeedbackId, Feedback>,
    ride_feedback: Vec<RideFeedback>,
}

#[derive(Debug)]
enum Write {
    Location(Location),
    Ride(Ride),
    RideParticipants(RideParticipants),
    Feedback(Feedback),
    RideFeedback(RideFeedback),
}

impl Write {
    fn step(&self) -> WriteStep {
        match self {
            Write::Location(_) => WriteStep::Location,
            Write::Ride(_) => WriteStep::Ride,
            Write::RideParticipants(_) => WriteStep::RideParticipants,
            Write::Feedback(_) => WriteStep::Feedback,
            Write::RideFeedback(_) => WriteStep::RideFeedback,
        }
    }
}

/// Escrituras pendientes de una operación; se descartan si no hay commit.
struct UnitOfWork<'a> {
    repo: &'a InMemoryRideRepository,
    staged: Vec<Write>,
}

impl<'a> UnitOfWork<'a> {
    fn stage(&mut self, write: Write) -> AppResult<()> {
        self.repo.check_failpoint(write.step())?;
        self.staged.push(write);
        Ok(())
    }

    fn commit(self) -> AppResult<()> {
        let mut tables = self.repo.tables()?;
        for write in self.staged {
            match write {
                Write::Location(location) => {
                    tables.locations.insert(location.location_id, location);
                }
                Write::Ride(ride) => {
                    tables.rides.insert(ride.ride_id, ride);
                }
                Write::RideParticipants(participants) => {
                    tables.participants.insert(participants.ride_id, participants);
                }
                Write::Feedback(feedback) => {
                    tables.feedback.insert(feedback.feedback_id, feedback);
                }
                Write::RideFeedback(link) => tables.ride_feedback.push(link),
            }
        }
        Ok(())
    }
}

pub struct InMemoryRideRepository {
    tables: Mutex<Tables>,
    ride_locks: Mutex<HashMap<RideId, Arc<tokio::sync::Mutex<()>>>>,
    lock_timeout: Duration,
    failpoint: Mutex<Option<WriteStep>>,
    location_seq: AtomicI64,
    ride_seq: AtomicI64,
    feedback_seq: AtomicI64,
}

impl InMemoryRideRepository {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            ride_locks: Mutex::new(HashMap::new()),
            lock_timeout,
            failpoint: Mutex::new(None),
            location_seq: AtomicI64::new(1),
            ride_seq: AtomicI64::new(1),
            feedback_seq: AtomicI64::new(1),
        }
    }

    /// Hace fallar la próxima escritura sobre `step` (una sola vez).
    pub fn fail_next_write(&self, step: WriteStep) {
        if let Ok(mut failpoint) = self.failpoint.lock() {
            *failpoint = Some(step);
        }
    }

    /// Toma el lock exclusivo del viaje, esperando como mucho `lock_timeout`.
    pub async fn lock_ride(&self, ride_id: RideId) -> AppResult<RideLockGuard> {
        let lock = {
            let mut locks = self
                .ride_locks
                .lock()
                .map_err(|_| AppError::Store("ride lock table poisoned".to_string()))?;
            Arc::clone(locks.entry(ride_id).or_default())
        };

        tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                warn!("⏳ Timeout esperando el lock del viaje {}", ride_id);
                AppError::LockTimeout { ride_id }
            })
    }

    pub fn ride_count(&self) -> usize {
        self.tables().map(|t| t.rides.len()).unwrap_or(0)
    }

    pub fn location_count(&self) -> usize {
        self.tables().map(|t| t.locations.len()).unwrap_or(0)
    }

    pub fn feedback_count(&self) -> usize {
        self.tables().map(|t| t.feedback.len()).unwrap_or(0)
    }

    fn tables(&self) -> AppResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| AppError::Store("tables poisoned".to_string()))
    }

    fn unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            repo: self,
            staged: Vec::new(),
        }
    }

    fn check_failpoint(&self, step: WriteStep) -> AppResult<()> {
        let mut failpoint = self
            .failpoint
            .lock()
            .map_err(|_| AppError::Store("failpoint poisoned".to_string()))?;

        if *failpoint == Some(step) {
            *failpoint = None;
            return Err(AppError::Store(format!("write to {} failed", step)));
        }
        Ok(())
    }

    fn current_status(&self, ride_id: RideId) -> AppResult<Option<RideStatus>> {
        Ok(self.tables()?.rides.get(&ride_id).map(|ride| ride.status))
    }

    /// Lock + lectura de estado + comprobación de la transición.
    ///
    /// Un viaje inexistente se rechaza sin crear entrada en la tabla de locks.
    async fn lock_for_transition(
        &self,
        ride_id: RideId,
        transition: RideTransition,
    ) -> AppResult<(RideLockGuard, Ride, RideStatus)> {
        if self.current_status(ride_id)?.is_none() {
            return Err(AppError::Conflict {
                ride_id,
                transition,
            });
        }

        let guard = self.lock_ride(ride_id).await?;

        let ride = self.tables()?.rides.get(&ride_id).cloned();
        let next = ensure_transition(ride_id, ride.as_ref().map(|r| r.status), transition)?;
        let ride = ride.ok_or(AppError::Conflict {
            ride_id,
            transition,
        })?;

        Ok((guard, ride, next))
    }

    fn release_lock_entry(&self, ride_id: RideId) {
        if let Ok(mut locks) = self.ride_locks.lock() {
            locks.remove(&ride_id);
        }
    }
}

#[async_trait]
impl RideRepository for InMemoryRideRepository {
    async fn create_ride(
        &self,
        rider_id: RiderId,
        pickup: Coordinates,
        dropoff: Coordinates,
    ) -> AppResult<RideId> {
        let mut uow = self.unit_of_work();

        let pickup = Location {
            location_id: self.location_seq.fetch_add(1, Ordering::SeqCst),
            latitude: pickup.latitude,
            longitude: pickup.longitude,
        };
        let dropoff = Location {
            location_id: self.location_seq.fetch_add(1, Ordering::SeqCst),
            latitude: dropoff.latitude,
            longitude: dropoff.longitude,
        };
        let ride = Ride {
            ride_id: self.ride_seq.fetch_add(1, Ordering::SeqCst),
            pickup_location_id: pickup.location_id,
            dropoff_location_id: dropoff.location_id,
            status: RideStatus::Requested,
            start_time: Utc::now(),
            end_time: None,
        };
        let ride_id = ride.ride_id;

        uow.stage(Write::Location(pickup))?;
        uow.stage(Write::Location(dropoff))?;
        uow.stage(Write::Ride(ride))?;
        uow.stage(Write::RideParticipants(RideParticipants {
            ride_id,
            rider_id,
            driver_id: None,
        }))?;
        uow.commit()?;

        info!("🚕 Viaje {} creado para rider {}", ride_id, rider_id);
        Ok(ride_id)
    }

    async fn accept_ride(&self, ride_id: RideId, driver_id: DriverId) -> AppResult<Ride> {
        let (_guard, mut ride, next) = self
            .lock_for_transition(ride_id, RideTransition::Accept)
            .await?;

        let mut participants = self
            .tables()?
            .participants
            .get(&ride_id)
            .cloned()
            .ok_or_else(|| AppError::Store(format!("ride {} has no participants row", ride_id)))?;

        if participants.driver_id.is_some() {
            return Err(AppError::Store(format!(
                "ride {} already has a driver bound",
                ride_id
            )));
        }

        ride.status = next;
        participants.driver_id = Some(driver_id);

        let mut uow = self.unit_of_work();
        uow.stage(Write::Ride(ride.clone()))?;
        uow.stage(Write::RideParticipants(participants))?;
        uow.commit()?;

        debug!("Ride {} accepted by driver {}", ride_id, driver_id);
        Ok(ride)
    }

    async fn complete_ride(&self, ride_id: RideId) -> AppResult<Ride> {
        let (guard, mut ride, next) = self
            .lock_for_transition(ride_id, RideTransition::Complete)
            .await?;

        ride.status = next;
        ride.end_time = Some(Utc::now().max(ride.start_time));

        let mut uow = self.unit_of_work();
        uow.stage(Write::Ride(ride.clone()))?;
        uow.commit()?;

        // Un viaje en estado terminal no vuelve a mutar: su lock ya no hace falta.
        drop(guard);
        if ride.status.is_terminal() {
            self.release_lock_entry(ride_id);
        }

        debug!("Ride {} completed", ride_id);
        Ok(ride)
    }

    async fn create_feedback(&self, feedback: NewFeedback) -> AppResult<FeedbackId> {
        let ride_id = feedback.ride_id;
        let mut uow = self.unit_of_work();

        let record = Feedback {
            feedback_id: self.feedback_seq.fetch_add(1, Ordering::SeqCst),
            rider_rating: feedback.rider_rating,
            driver_rating: feedback.driver_rating,
            rider_comments: feedback.rider_comments,
            driver_comments: feedback.driver_comments,
        };
        let feedback_id = record.feedback_id;

        uow.stage(Write::Feedback(record))?;

        // Equivalente a la foreign key ride_feedback.ride_id -> rides
        if self.current_status(ride_id)?.is_none() {
            return Err(AppError::UnknownRide { ride_id });
        }
        uow.stage(Write::RideFeedback(RideFeedback {
            ride_id,
            feedback_id,
        }))?;
        uow.commit()?;

        Ok(feedback_id)
    }

    async fn find_ride(&self, ride_id: RideId) -> AppResult<Option<RideDetails>> {
        let tables = self.tables()?;

        let Some(ride) = tables.rides.get(&ride_id) else {
            return Ok(None);
        };

        let location = |location_id: LocationId| {
            tables.locations.get(&location_id).copied().ok_or_else(|| {
                AppError::Store(format!(
                    "location {} referenced by ride {} missing",
                    location_id, ride_id
                ))
            })
        };
        let participants = tables
            .participants
            .get(&ride_id)
            .ok_or_else(|| AppError::Store(format!("ride {} has no participants row", ride_id)))?;

        Ok(Some(RideDetails {
            ride_id,
            status: ride.status,
            pickup: location(ride.pickup_location_id)?,
            dropoff: location(ride.dropoff_location_id)?,
            rider_id: participants.rider_id,
            driver_id: participants.driver_id,
            start_time: ride.start_time,
            end_time: ride.end_time,
        }))
    }

    async fn list_feedback(&self, ride_id: RideId) -> AppResult<Vec<Feedback>> {
        let tables = self.tables()?;

        let mut feedback: Vec<Feedback> = tables
            .ride_feedback
            .iter()
            .filter(|link| link.ride_id == ride_id)
            .filter_map(|link| tables.feedback.get(&link.feedback_id).cloned())
            .collect();
        feedback.sort_by_key(|f| f.feedback_id);

        Ok(feedback)
    }
}
