use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use crate::{
    auth::{self, CallerId},
    error::AppError,
    models::{
        ride::{RideDraft, RideFilter, RidePatch},
        user::PublicUser,
    },
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_ride).get(list_rides))
        .route("/history", get(my_history))
        .route("/user/:user_id", get(user_rides))
        .route("/:id", get(get_ride).patch(update_ride))
        .route("/:id/cancel", put(cancel_ride))
        .route("/:id/join", post(join_ride))
        .route("/:id/leave", post(leave_ride))
        .route("/:id/passengers", get(list_passengers))
        .route("/:id/passengers/:passenger_id", get(passenger_detail))
}

async fn create_ride(
    State(state): State<AppState>,
    caller: CallerId,
    Json(draft): Json<RideDraft>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.engine.create(draft, caller.as_str()).await?;
    Ok((StatusCode::CREATED, Json(ride)))
}

async fn list_rides(
    State(state): State<AppState>,
    Query(filter): Query<RideFilter>,
) -> Result<impl IntoResponse, AppError> {
    let rides = state.queries.list(&filter).await?;
    Ok(Json(rides))
}

async fn my_history(
    State(state): State<AppState>,
    caller: CallerId,
) -> Result<impl IntoResponse, AppError> {
    let history = state.queries.history(caller.as_str()).await?;
    Ok(Json(history))
}

async fn user_rides(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rides = state.queries.list_by_creator(&user_id).await?;
    Ok(Json(rides))
}

async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.queries.get(&ride_id).await?;
    Ok(Json(ride))
}

async fn update_ride(
    State(state): State<AppState>,
    caller: CallerId,
    Path(ride_id): Path<String>,
    Json(patch): Json<RidePatch>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.engine.update(&ride_id, caller.as_str(), patch).await?;
    Ok(Json(ride))
}

async fn cancel_ride(
    State(state): State<AppState>,
    caller: CallerId,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.engine.cancel(&ride_id, caller.as_str()).await?;
    Ok(Json(ride))
}

async fn join_ride(
    State(state): State<AppState>,
    caller: CallerId,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.engine.join(&ride_id, caller.as_str()).await?;
    Ok(Json(ride))
}

async fn leave_ride(
    State(state): State<AppState>,
    caller: CallerId,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.engine.leave(&ride_id, caller.as_str()).await?;
    Ok(Json(ride))
}

/// Creator-only roster, public profiles only.
async fn list_passengers(
    State(state): State<AppState>,
    caller: CallerId,
    Path(ride_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.queries.get(&ride_id).await?;
    auth::require_owner(&ride, caller.as_str())?;
    auth::require_driver_ride(&ride)?;

    let mut passengers: Vec<PublicUser> = Vec::with_capacity(ride.passengers.len());
    for user_id in &ride.passengers {
        passengers.push(state.directory.get(user_id).await?.to_public());
    }
    Ok(Json(passengers))
}

/// Creator-only passenger profile including contact details.
async fn passenger_detail(
    State(state): State<AppState>,
    caller: CallerId,
    Path((ride_id, passenger_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let ride = state.queries.get(&ride_id).await?;
    auth::require_owner(&ride, caller.as_str())?;
    auth::require_driver_ride(&ride)?;

    if !ride.has_passenger(&passenger_id) {
        return Err(AppError::not_found("Passenger not found in this ride"));
    }
    let passenger = state.directory.get(&passenger_id).await?;
    Ok(Json(passenger.to_authorized()))
}
