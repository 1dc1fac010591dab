use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::{IntoResponse, Response},
    routing::{get, post, MethodRouter},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dto::{
    AcceptRideRequest, ApiResponse, CompleteRideRequest, FeedbackCreated, FeedbackListResponse,
    LegacyEndpointQuery, ProvideFeedbackRequest, RequestRideRequest, RideCreated, RideResponse,
    RideTransitioned,
};
use crate::models::{Ride, RideId, RideTransition};
use crate::state::AppState;
use crate::utils::errors::{AppError, AppResult};

pub fn create_ride_router() -> Router<AppState> {
    Router::new()
        .route("/request", post(request_ride))
        .route("/accept", post(accept_ride))
        .route("/complete", post(complete_ride))
        .route("/feedback", post(provide_feedback))
        .route("/:ride_id", get(get_ride))
        .route("/:ride_id/feedback", get(list_feedback))
}

/// Dispatcher compatible con el cliente antiguo: `POST /api?endpoint=<operación>`
pub fn legacy_api_route() -> MethodRouter<AppState> {
    post(legacy_dispatch).fallback(invalid_method)
}

async fn request_ride(
    State(state): State<AppState>,
    payload: Result<Json<RequestRideRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<RideCreated>>> {
    let Json(request) = payload?;
    let ride_id = state.rides.request_ride(request).await?;
    Ok(Json(ApiResponse::success(RideCreated { ride_id })))
}

async fn accept_ride(
    State(state): State<AppState>,
    payload: Result<Json<AcceptRideRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<RideTransitioned>>> {
    let Json(request) = payload?;
    let ride = state.rides.accept_ride(request).await?;
    Ok(Json(transitioned(ride, RideTransition::Accept)))
}

async fn complete_ride(
    State(state): State<AppState>,
    payload: Result<Json<CompleteRideRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<RideTransitioned>>> {
    let Json(request) = payload?;
    let ride = state.rides.complete_ride(request).await?;
    Ok(Json(transitioned(ride, RideTransition::Complete)))
}

async fn provide_feedback(
    State(state): State<AppState>,
    payload: Result<Json<ProvideFeedbackRequest>, JsonRejection>,
) -> AppResult<Json<ApiResponse<FeedbackCreated>>> {
    let Json(request) = payload?;
    let feedback_id = state.rides.provide_feedback(request).await?;
    Ok(Json(ApiResponse::success_with_message(
        FeedbackCreated { feedback_id },
        "Feedback provided",
    )))
}

async fn get_ride(
    State(state): State<AppState>,
    ride_id: Result<Path<RideId>, PathRejection>,
) -> AppResult<Json<ApiResponse<RideResponse>>> {
    let Path(ride_id) = ride_id?;
    let ride = state.rides.get_ride(ride_id).await?;
    Ok(Json(ApiResponse::success(RideResponse { ride })))
}

async fn list_feedback(
    State(state): State<AppState>,
    ride_id: Result<Path<RideId>, PathRejection>,
) -> AppResult<Json<ApiResponse<FeedbackListResponse>>> {
    let Path(ride_id) = ride_id?;
    let feedback = state.rides.list_feedback(ride_id).await?;
    Ok(Json(ApiResponse::success(FeedbackListResponse { feedback })))
}

async fn legacy_dispatch(
    State(state): State<AppState>,
    query: Result<Query<LegacyEndpointQuery>, QueryRejection>,
    payload: Result<Json<Value>, JsonRejection>,
) -> AppResult<Response> {
    let Query(query) = query?;
    let Json(body) = payload?;

    let response = match query.endpoint.as_deref() {
        Some("request_ride") => {
            let ride_id = state.rides.request_ride(parse_body(body)?).await?;
            Json(ApiResponse::success(RideCreated { ride_id })).into_response()
        }
        Some("accept_ride") => {
            let ride = state.rides.accept_ride(parse_body(body)?).await?;
            Json(transitioned(ride, RideTransition::Accept)).into_response()
        }
        Some("complete_ride") => {
            let ride = state.rides.complete_ride(parse_body(body)?).await?;
            Json(transitioned(ride, RideTransition::Complete)).into_response()
        }
        Some("provide_feedback") => {
            let feedback_id = state.rides.provide_feedback(parse_body(body)?).await?;
            Json(ApiResponse::success_with_message(
                FeedbackCreated { feedback_id },
                "Feedback provided",
            ))
            .into_response()
        }
        Some(other) => {
            return Err(AppError::MalformedRequest(format!("unknown endpoint '{}'", other)));
        }
        None => {
            return Err(AppError::MalformedRequest("missing endpoint parameter".to_string()));
        }
    };

    Ok(response)
}

async fn invalid_method() -> AppError {
    AppError::InvalidMethod
}

fn parse_body<T: DeserializeOwned>(body: Value) -> AppResult<T> {
    serde_json::from_value(body).map_err(|e| AppError::MalformedRequest(e.to_string()))
}

fn transitioned(ride: Ride, transition: RideTransition) -> ApiResponse<RideTransitioned> {
    ApiResponse::success_with_message(
        RideTransitioned {
            ride_id: ride.ride_id,
            ride_status: ride.status,
        },
        transition.success_message(),
    )
}
