//! Tests del ciclo de vida de viajes sobre el store en memoria.
//!
//! Cubren la máquina de estados, la atomicidad de cada operación y la
//! exclusión mutua por viaje bajo aceptaciones concurrentes.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use ride_sharing::dto::{
    AcceptRideRequest, CompleteRideRequest, ProvideFeedbackRequest, RequestRideRequest,
};
use ride_sharing::models::{RideId, RideStatus};
use ride_sharing::repositories::{InMemoryRideRepository, WriteStep};
use ride_sharing::services::RideLifecycleManager;
use ride_sharing::utils::{AppError, ErrorKind};

fn setup() -> (Arc<InMemoryRideRepository>, RideLifecycleManager) {
    let repository = Arc::new(InMemoryRideRepository::new(Duration::from_secs(2)));
    let manager = RideLifecycleManager::new(repository.clone());
    (repository, manager)
}

fn ride_request(rider_id: i64) -> RequestRideRequest {
    RequestRideRequest {
        rider_id,
        pickup_lat: 0.0,
        pickup_long: 0.0,
        dropoff_lat: 1.0,
        dropoff_long: 1.0,
    }
}

fn accept(ride_id: RideId, driver_id: i64) -> AcceptRideRequest {
    AcceptRideRequest { ride_id, driver_id }
}

fn complete(ride_id: RideId) -> CompleteRideRequest {
    CompleteRideRequest { ride_id }
}

fn feedback(ride_id: RideId) -> ProvideFeedbackRequest {
    ProvideFeedbackRequest {
        ride_id,
        rider_rating: 5,
        driver_rating: 4,
        rider_comments: "Smooth ride".to_string(),
        driver_comments: "Punctual rider".to_string(),
    }
}

#[tokio::test]
async fn test_request_ride_creates_requested_ride() {
    let (repository, manager) = setup();

    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();
    let ride = manager.get_ride(ride_id).await.unwrap();

    assert_eq!(ride.status, RideStatus::Requested);
    assert_eq!(ride.rider_id, 1);
    assert_eq!(ride.driver_id, None);
    assert_eq!(ride.end_time, None);
    assert_eq!((ride.pickup.latitude, ride.pickup.longitude), (0.0, 0.0));
    assert_eq!((ride.dropoff.latitude, ride.dropoff.longitude), (1.0, 1.0));
    assert_ne!(ride.pickup.location_id, ride.dropoff.location_id);
    assert_eq!(repository.ride_count(), 1);
    assert_eq!(repository.location_count(), 2);
}

#[tokio::test]
async fn test_request_ride_is_atomic() {
    for step in [WriteStep::Location, WriteStep::Ride, WriteStep::RideParticipants] {
        let (repository, manager) = setup();
        repository.fail_next_write(step);

        let err = manager.request_ride(ride_request(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Store, "step {}", step);
        assert_eq!(repository.ride_count(), 0, "step {}", step);
        assert_eq!(repository.location_count(), 0, "step {}", step);
    }
}

#[tokio::test]
async fn test_request_ride_rejects_invalid_input() {
    let (repository, manager) = setup();

    let mut request = ride_request(1);
    request.pickup_lat = f64::NAN;
    let err = manager.request_ride(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = manager.request_ride(ride_request(0)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(repository.ride_count(), 0);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let (_, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();

    let accepted = manager.accept_ride(accept(ride_id, 10)).await.unwrap();
    assert_eq!(accepted.status, RideStatus::Accepted);
    assert_eq!(manager.get_ride(ride_id).await.unwrap().driver_id, Some(10));

    let completed = manager.complete_ride(complete(ride_id)).await.unwrap();
    assert_eq!(completed.status, RideStatus::Completed);
    let end_time = completed.end_time.expect("end_time set on completion");
    assert!(end_time >= completed.start_time);

    let ride = manager.get_ride(ride_id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Completed);
    assert_eq!(ride.end_time, Some(end_time));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_have_exactly_one_winner() {
    let (repository, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();

    let guard = repository.lock_ride(ride_id).await.unwrap();
    let attempts: Vec<_> = (1..=50)
        .map(|driver_id| {
            let manager = manager.clone();
            tokio::spawn(async move {
                (driver_id, manager.accept_ride(accept(ride_id, driver_id)).await)
            })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(100)).await;
    // Con el lock retenido nadie puede haber terminado
    assert!(attempts.iter().all(|attempt| !attempt.is_finished()));
    drop(guard);

    let results: Vec<_> = join_all(attempts)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let winners: Vec<i64> = results
        .iter()
        .filter(|(_, result)| result.is_ok())
        .map(|(driver_id, _)| *driver_id)
        .collect();
    assert_eq!(winners.len(), 1);

    for (_, result) in results.iter().filter(|(_, result)| result.is_err()) {
        let err = result.as_ref().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Ride not found or already accepted");
    }

    let ride = manager.get_ride(ride_id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Accepted);
    assert_eq!(ride.driver_id, Some(winners[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_scenario_two_drivers_then_double_complete() {
    let (repository, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();
    assert_eq!(manager.get_ride(ride_id).await.unwrap().status, RideStatus::Requested);

    let spawn_accept = |driver_id| {
        let manager = manager.clone();
        tokio::spawn(async move { manager.accept_ride(accept(ride_id, driver_id)).await })
    };
    // Ambos intentos quedan en cola tras el lock y compiten al liberarlo
    let guard = repository.lock_ride(ride_id).await.unwrap();
    let (first, second) = (spawn_accept(10), spawn_accept(20));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!first.is_finished() && !second.is_finished());
    drop(guard);
    let (first, second) = (first.await.unwrap(), second.await.unwrap());
    let winner = match (&first, &second) {
        (Ok(_), Err(_)) => 10,
        (Err(_), Ok(_)) => 20,
        other => panic!("expected exactly one winner, got {:?}", other),
    };

    let ride = manager.get_ride(ride_id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Accepted);
    assert_eq!(ride.driver_id, Some(winner));

    manager.complete_ride(complete(ride_id)).await.unwrap();
    let ride = manager.get_ride(ride_id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Completed);
    assert!(ride.end_time.is_some());

    let err = manager.complete_ride(complete(ride_id)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.to_string(), "Ride not found or cannot be completed");
}

#[tokio::test]
async fn test_accept_requires_requested_status() {
    let (_, manager) = setup();

    // Inexistente
    let err = manager.accept_ride(accept(404, 10)).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict { ride_id: 404, .. }));

    // Ya aceptado
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();
    manager.accept_ride(accept(ride_id, 10)).await.unwrap();
    let err = manager.accept_ride(accept(ride_id, 20)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(manager.get_ride(ride_id).await.unwrap().driver_id, Some(10));

    // Completado
    manager.complete_ride(complete(ride_id)).await.unwrap();
    let err = manager.accept_ride(accept(ride_id, 30)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let ride = manager.get_ride(ride_id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Completed);
    assert_eq!(ride.driver_id, Some(10));
}

#[tokio::test]
async fn test_complete_requires_accepted_status() {
    let (_, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();

    let err = manager.complete_ride(complete(ride_id)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);

    let ride = manager.get_ride(ride_id).await.unwrap();
    assert_eq!(ride.status, RideStatus::Requested);
    assert_eq!(ride.end_time, None);

    let err = manager.complete_ride(complete(777)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[tokio::test]
async fn test_lock_held_elsewhere_times_out_without_changes() {
    let repository = Arc::new(InMemoryRideRepository::new(Duration::from_millis(100)));
    let manager = RideLifecycleManager::new(repository.clone());
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();

    let guard = repository.lock_ride(ride_id).await.unwrap();
    let err = manager.accept_ride(accept(ride_id, 10)).await.unwrap_err();
    assert!(matches!(err, AppError::LockTimeout { .. }));
    assert_eq!(err.kind(), ErrorKind::Store);
    drop(guard);

    assert_eq!(manager.get_ride(ride_id).await.unwrap().status, RideStatus::Requested);
    manager.accept_ride(accept(ride_id, 10)).await.unwrap();
}

#[tokio::test]
async fn test_waiter_proceeds_after_holder_releases() {
    let (repository, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();

    let guard = repository.lock_ride(ride_id).await.unwrap();
    let waiter = {
        let manager = manager.clone();
        tokio::spawn(async move { manager.accept_ride(accept(ride_id, 10)).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(manager.get_ride(ride_id).await.unwrap().status, RideStatus::Requested);

    drop(guard);
    let ride = waiter.await.unwrap().unwrap();
    assert_eq!(ride.status, RideStatus::Accepted);
}

#[tokio::test]
async fn test_feedback_allowed_at_any_status_and_not_unique() {
    let (repository, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();

    let first = manager.provide_feedback(feedback(ride_id)).await.unwrap();
    let second = manager.provide_feedback(feedback(ride_id)).await.unwrap();
    assert_ne!(first, second);

    let stored = manager.list_feedback(ride_id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].feedback_id, first);
    assert_eq!(stored[0].rider_rating, 5);
    assert_eq!(stored[1].driver_comments, "Punctual rider");
    assert_eq!(repository.feedback_count(), 2);
}

#[tokio::test]
async fn test_feedback_validation_and_unknown_ride() {
    let (repository, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();

    let mut request = feedback(ride_id);
    request.rider_rating = 6;
    let err = manager.provide_feedback(request).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = manager.provide_feedback(feedback(999)).await.unwrap_err();
    assert!(matches!(err, AppError::UnknownRide { ride_id: 999 }));

    assert_eq!(repository.feedback_count(), 0);
}

#[tokio::test]
async fn test_feedback_is_atomic() {
    let (repository, manager) = setup();
    let ride_id = manager.request_ride(ride_request(1)).await.unwrap();
    repository.fail_next_write(WriteStep::RideFeedback);

    let err = manager.provide_feedback(feedback(ride_id)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Store);
    assert_eq!(repository.feedback_count(), 0);
    assert!(manager.list_feedback(ride_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reads_on_unknown_ride() {
    let (_, manager) = setup();

    let err = manager.get_ride(42).await.unwrap_err();
    assert!(matches!(err, AppError::UnknownRide { ride_id: 42 }));

    let err = manager.list_feedback(42).await.unwrap_err();
    assert!(matches!(err, AppError::UnknownRide { ride_id: 42 }));

    let err = manager.get_ride(0).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}
