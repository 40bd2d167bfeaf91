use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    error::AppError,
    models::{ride::Ride, user::User},
};

pub const CALLER_HEADER: &str = "x-user-id";

/// Identity of the authenticated caller. Authentication itself happens
/// upstream; by the time a request reaches this service the verified user id
/// travels in the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct CallerId(pub String);

impl CallerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CALLER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| CallerId(value.to_string()))
            .ok_or_else(|| AppError::authorization("Missing caller identity"))
    }
}

pub fn require_owner(ride: &Ride, user_id: &str) -> Result<(), AppError> {
    if ride.is_created_by(user_id) {
        Ok(())
    } else {
        Err(AppError::authorization(
            "Only the ride creator may perform this action",
        ))
    }
}

pub fn require_driver_capability(user: &User) -> Result<(), AppError> {
    if user.is_driver() {
        Ok(())
    } else {
        Err(AppError::authorization(
            "You must have a driver license and vehicle matricule to create a DRIVER ride",
        ))
    }
}

/// Passenger rosters are only meaningful for driver rides.
pub fn require_driver_ride(ride: &Ride) -> Result<(), AppError> {
    match ride.kind {
        crate::models::ride::RideKind::Driver => Ok(()),
        crate::models::ride::RideKind::PassengerDemand => Err(AppError::authorization(
            "Passenger details are only available for DRIVER rides",
        )),
    }
}
