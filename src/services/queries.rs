use std::sync::Arc;

use serde::Serialize;

use crate::{
    clock::Clock,
    error::AppError,
    models::ride::{Ride, RideFilter, RideStatus},
    services::repo::RideRepository,
};

/// Completed-only ride history for a user.
#[derive(Debug, Clone, Serialize)]
pub struct RideHistory {
    pub hosted: Vec<Ride>,
    pub joined: Vec<Ride>,
}

/// Read side: single-ride retrieval, public listing and history. Reads of
/// overdue unbooked rides flip them to expired on the way out (lazy
/// expiry), so no background sweep is needed.
#[derive(Clone)]
pub struct RideQueryService {
    repo: RideRepository,
    clock: Arc<dyn Clock>,
}

impl RideQueryService {
    pub fn new(repo: RideRepository, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    pub async fn get(&self, ride_id: &str) -> Result<Ride, AppError> {
        let ride = self.repo.fetch_required(ride_id).await?;
        self.maybe_expire(ride).await
    }

    /// Public listing. Every candidate passes the lazy expiry check first;
    /// expired rides never appear in public results.
    pub async fn list(&self, filter: &RideFilter) -> Result<Vec<Ride>, AppError> {
        let candidates = self.repo.list(filter).await?;
        let mut rides = Vec::with_capacity(candidates.len());
        for ride in candidates {
            let ride = self.maybe_expire(ride).await?;
            if ride.status != RideStatus::Expired {
                rides.push(ride);
            }
        }
        Ok(rides)
    }

    pub async fn list_by_creator(&self, user_id: &str) -> Result<Vec<Ride>, AppError> {
        self.repo.list_by_creator(user_id).await
    }

    pub async fn list_by_participant(&self, user_id: &str) -> Result<Vec<Ride>, AppError> {
        self.repo.list_by_participant(user_id).await
    }

    pub async fn history(&self, user_id: &str) -> Result<RideHistory, AppError> {
        let hosted = self
            .repo
            .list_by_creator(user_id)
            .await?
            .into_iter()
            .filter(|ride| ride.status == RideStatus::Completed)
            .collect();
        let joined = self
            .repo
            .list_by_participant(user_id)
            .await?
            .into_iter()
            .filter(|ride| ride.status == RideStatus::Completed)
            .collect();
        Ok(RideHistory { hosted, joined })
    }

    /// Conditional active -> expired transition at read time. The statement
    /// re-checks status and roster emptiness, so a join landing first keeps
    /// the ride active and this read simply observes it.
    async fn maybe_expire(&self, ride: Ride) -> Result<Ride, AppError> {
        let overdue = ride.status == RideStatus::Active
            && ride.passengers.is_empty()
            && self.clock.now() > ride.scheduled_instant();
        if !overdue {
            return Ok(ride);
        }
        self.repo.try_expire(&ride.id, self.clock.now()).await?;
        self.repo.fetch_required(&ride.id).await
    }
}
