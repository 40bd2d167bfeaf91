use std::sync::Arc;

use uuid::Uuid;

use crate::{
    auth,
    clock::Clock,
    error::AppError,
    models::{
        ride::{parse_schedule_time, Ride, RideDraft, RideKind, RidePatch, RideStatus},
        seats,
    },
    services::{
        directory::UserDirectory,
        notify::{NotificationHook, RideEvent},
        repo::RideRepository,
    },
};

/// The ride lifecycle state machine: creation, join, leave, cancel and
/// owner updates (including completion). Every mutation goes through the
/// repository's conditional statements; this type owns the business rules
/// and the error classification.
#[derive(Clone)]
pub struct RideLifecycleEngine {
    repo: RideRepository,
    directory: UserDirectory,
    clock: Arc<dyn Clock>,
    notifier: Arc<dyn NotificationHook>,
}

impl RideLifecycleEngine {
    pub fn new(
        repo: RideRepository,
        directory: UserDirectory,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn NotificationHook>,
    ) -> Self {
        Self {
            repo,
            directory,
            clock,
            notifier,
        }
    }

    pub async fn create(&self, draft: RideDraft, creator_id: &str) -> Result<Ride, AppError> {
        let departure = required_text(&draft.departure, "departure")?;
        let destination = required_text(&draft.destination, "destination")?;
        if parse_schedule_time(&draft.scheduled_time).is_none() {
            return Err(AppError::validation(
                "Invalid scheduled_time, expected HH:MM",
            ));
        }

        let (original_seats, available_seats, needed_seats) = match draft.kind {
            RideKind::Driver => {
                let capacity = draft.available_seats.ok_or_else(|| {
                    AppError::validation("Missing required field: available_seats for DRIVER ride")
                })?;
                if !(1..=seats::MAX_SEATS).contains(&capacity) {
                    return Err(AppError::validation(format!(
                        "available_seats must be between 1 and {}",
                        seats::MAX_SEATS
                    )));
                }
                if draft.needed_seats.is_some() {
                    return Err(AppError::validation(
                        "needed_seats is not valid for a DRIVER ride",
                    ));
                }
                (Some(capacity), Some(capacity), None)
            }
            RideKind::PassengerDemand => {
                let needed = draft.needed_seats.ok_or_else(|| {
                    AppError::validation(
                        "Missing required field: needed_seats for PASSENGER_DEMAND ride",
                    )
                })?;
                if needed < 1 {
                    return Err(AppError::validation("needed_seats must be at least 1"));
                }
                if draft.available_seats.is_some() {
                    return Err(AppError::validation(
                        "available_seats is not valid for a PASSENGER_DEMAND ride",
                    ));
                }
                (None, None, Some(needed))
            }
        };

        let creator = self.directory.get(creator_id).await?;

        let price = match draft.kind {
            RideKind::Driver => {
                auth::require_driver_capability(&creator)?;
                let price = draft
                    .price
                    .ok_or_else(|| AppError::validation("Price is required for DRIVER rides"))?;
                if price < 0.0 {
                    return Err(AppError::validation("Price cannot be negative"));
                }
                Some(price)
            }
            RideKind::PassengerDemand => {
                if draft.price.is_some() {
                    return Err(AppError::validation(
                        "Price is not valid for a PASSENGER_DEMAND ride",
                    ));
                }
                None
            }
        };

        let now = self.clock.now();
        let ride = Ride {
            id: Uuid::new_v4().to_string(),
            creator_id: creator.id,
            kind: draft.kind,
            status: RideStatus::Active,
            departure,
            destination,
            scheduled_date: draft.scheduled_date,
            scheduled_time: draft.scheduled_time,
            price,
            original_seats,
            available_seats,
            needed_seats,
            passengers: Vec::new(),
            description: draft
                .description
                .map(|d| d.trim().to_string())
                .unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        debug_assert!(seats::check_invariants(&ride).is_ok());

        self.repo.insert(&ride).await?;
        Ok(ride)
    }

    pub async fn join(&self, ride_id: &str, user_id: &str) -> Result<Ride, AppError> {
        self.directory.get(user_id).await?;
        let ride = self.repo.fetch_required(ride_id).await?;
        if let Some(rejection) = join_rejection(&ride, user_id) {
            return Err(rejection);
        }

        let now = self.clock.now();
        if !self.repo.try_join(ride_id, user_id, now).await? {
            // Lost a race between the read and the conditional update.
            let fresh = self.repo.fetch_required(ride_id).await?;
            return Err(join_rejection(&fresh, user_id)
                .unwrap_or_else(|| AppError::conflict("No available seats for this ride")));
        }

        self.notifier.emit(RideEvent::PassengerJoined {
            ride_id: ride_id.to_string(),
            user_id: user_id.to_string(),
        });
        self.repo.fetch_required(ride_id).await
    }

    pub async fn leave(&self, ride_id: &str, user_id: &str) -> Result<Ride, AppError> {
        let ride = self.repo.fetch_required(ride_id).await?;
        if let Some(rejection) = self.leave_rejection(&ride, user_id) {
            return Err(rejection);
        }

        let now = self.clock.now();
        if !self.repo.try_leave(ride_id, user_id, now).await? {
            let fresh = self.repo.fetch_required(ride_id).await?;
            return Err(self
                .leave_rejection(&fresh, user_id)
                .unwrap_or_else(|| AppError::conflict("You are not a passenger in this ride")));
        }

        self.notifier.emit(RideEvent::PassengerLeft {
            ride_id: ride_id.to_string(),
            user_id: user_id.to_string(),
        });
        self.repo.fetch_required(ride_id).await
    }

    pub async fn cancel(&self, ride_id: &str, user_id: &str) -> Result<Ride, AppError> {
        let ride = self.repo.fetch_required(ride_id).await?;
        auth::require_owner(&ride, user_id)?;

        // Retrying a cancel must be harmless.
        if ride.status == RideStatus::Cancelled {
            return Ok(ride);
        }
        if ride.status != RideStatus::Active {
            return Err(AppError::state(format!(
                "Cannot cancel a {} ride",
                ride.status
            )));
        }

        let now = self.clock.now();
        if !self.repo.try_cancel(ride_id, now).await? {
            let fresh = self.repo.fetch_required(ride_id).await?;
            if fresh.status == RideStatus::Cancelled {
                return Ok(fresh);
            }
            return Err(AppError::state(format!(
                "Cannot cancel a {} ride",
                fresh.status
            )));
        }

        self.notifier.emit(RideEvent::RideCancelled {
            ride_id: ride_id.to_string(),
            passengers: ride.passengers.clone(),
        });
        self.repo.fetch_required(ride_id).await
    }

    pub async fn update(
        &self,
        ride_id: &str,
        user_id: &str,
        patch: RidePatch,
    ) -> Result<Ride, AppError> {
        let ride = self.repo.fetch_required(ride_id).await?;
        auth::require_owner(&ride, user_id)?;

        if patch.is_empty() {
            return Err(AppError::validation("Invalid updates"));
        }
        if ride.status.is_terminal() {
            return Err(AppError::state(format!(
                "Cannot update a {} ride",
                ride.status
            )));
        }

        let mut updated = ride.clone();

        if let Some(target) = patch.status {
            if target != RideStatus::Completed {
                return Err(AppError::state(format!(
                    "Cannot change ride status to {target}"
                )));
            }
            if ride.kind == RideKind::Driver {
                if self.clock.now() < ride.scheduled_instant() {
                    return Err(AppError::state(
                        "Cannot mark a ride as done before its scheduled date and time",
                    ));
                }
                if ride.passengers.is_empty() {
                    return Err(AppError::state(
                        "Cannot complete a ride with no passengers; cancel it instead",
                    ));
                }
            }
            updated.status = RideStatus::Completed;
        }

        if let Some(departure) = &patch.departure {
            let departure = required_text(departure, "departure")?;
            if departure != ride.departure && !ride.passengers.is_empty() {
                return Err(AppError::conflict(
                    "Cannot change the route once passengers have joined",
                ));
            }
            updated.departure = departure;
        }
        if let Some(destination) = &patch.destination {
            let destination = required_text(destination, "destination")?;
            if destination != ride.destination && !ride.passengers.is_empty() {
                return Err(AppError::conflict(
                    "Cannot change the route once passengers have joined",
                ));
            }
            updated.destination = destination;
        }

        if let Some(date) = patch.scheduled_date {
            updated.scheduled_date = date;
        }
        if let Some(time) = patch.scheduled_time {
            if parse_schedule_time(&time).is_none() {
                return Err(AppError::validation(
                    "Invalid scheduled_time, expected HH:MM",
                ));
            }
            updated.scheduled_time = time;
        }

        match ride.kind {
            RideKind::Driver => {
                if patch.needed_seats.is_some() {
                    return Err(AppError::validation(
                        "needed_seats is not valid for a DRIVER ride",
                    ));
                }
                if let Some(available) = patch.available_seats {
                    // Range-check before deriving capacity; the sum below
                    // must not be reachable with out-of-range input.
                    if !(0..=seats::MAX_SEATS).contains(&available) {
                        return Err(AppError::validation(format!(
                            "available_seats must be between 0 and {}",
                            seats::MAX_SEATS
                        )));
                    }
                    // Capacity is re-derived so booked passengers keep
                    // their seats accounted for.
                    let original = available + ride.passengers.len() as i64;
                    if original > seats::MAX_SEATS {
                        return Err(AppError::validation(format!(
                            "available_seats must leave total capacity between 0 and {}",
                            seats::MAX_SEATS
                        )));
                    }
                    updated.available_seats = Some(available);
                    updated.original_seats = Some(original);
                }
                if let Some(price) = patch.price {
                    if price < 0.0 {
                        return Err(AppError::validation("Price cannot be negative"));
                    }
                    updated.price = Some(price);
                }
            }
            RideKind::PassengerDemand => {
                if patch.available_seats.is_some() {
                    return Err(AppError::validation(
                        "available_seats is not valid for a PASSENGER_DEMAND ride",
                    ));
                }
                if patch.price.is_some() {
                    return Err(AppError::validation(
                        "Price is not valid for a PASSENGER_DEMAND ride",
                    ));
                }
                if let Some(needed) = patch.needed_seats {
                    if needed < 1 {
                        return Err(AppError::validation("needed_seats must be at least 1"));
                    }
                    updated.needed_seats = Some(needed);
                }
            }
        }

        if let Some(description) = patch.description {
            updated.description = description.trim().to_string();
        }

        updated.updated_at = self.clock.now();
        debug_assert!(seats::check_invariants(&updated).is_ok());

        if !self.repo.save_owner_update(&updated).await? {
            let fresh = self.repo.fetch_required(ride_id).await?;
            return Err(AppError::state(format!(
                "Cannot update a {} ride",
                fresh.status
            )));
        }
        self.repo.fetch_required(ride_id).await
    }

    fn leave_rejection(&self, ride: &Ride, user_id: &str) -> Option<AppError> {
        if ride.status != RideStatus::Active {
            Some(AppError::state("Cannot leave a ride that is not active"))
        } else if self.clock.now() > ride.scheduled_instant() {
            Some(AppError::state("Cannot leave a past ride"))
        } else if !ride.has_passenger(user_id) {
            Some(AppError::conflict("You are not a passenger in this ride"))
        } else {
            None
        }
    }
}

fn join_rejection(ride: &Ride, user_id: &str) -> Option<AppError> {
    if ride.status != RideStatus::Active {
        Some(AppError::state(format!(
            "Cannot join a {} ride",
            ride.status
        )))
    } else if ride.is_created_by(user_id) {
        Some(AppError::conflict("You cannot join your own ride"))
    } else if ride.has_passenger(user_id) {
        Some(AppError::conflict("You have already joined this ride"))
    } else if !seats::can_accommodate(ride) {
        Some(AppError::conflict("No available seats for this ride"))
    } else {
        None
    }
}

fn required_text(value: &str, field: &str) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(AppError::validation(format!(
            "Missing required field: {field}"
        )))
    } else {
        Ok(trimmed.to_string())
    }
}
