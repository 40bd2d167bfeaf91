use crate::error::AppError;
use crate::models::ride::{Ride, RideKind};

/// Upper bound on seats a single ride may offer.
pub const MAX_SEATS: i64 = 50;

/// Pure seat arithmetic over a ride. Functions take the ride by value and
/// return the next logical state; the engine decides what gets persisted.

pub fn can_accommodate(ride: &Ride) -> bool {
    match ride.kind {
        RideKind::Driver => ride.available_seats.unwrap_or(0) > 0,
        RideKind::PassengerDemand => true,
    }
}

/// In-memory mirror of the guarded decrement the repository performs as a
/// conditional UPDATE. Kept pure so the arithmetic is testable without a
/// database; the persisted path goes through `RideRepository::try_join`.
pub fn reserve(mut ride: Ride) -> Result<Ride, AppError> {
    if ride.kind == RideKind::Driver {
        let available = ride.available_seats.unwrap_or(0);
        if available <= 0 {
            return Err(AppError::conflict("No available seats for this ride"));
        }
        ride.available_seats = Some(available - 1);
    }
    Ok(ride)
}

/// In-memory mirror of the clamped increment in `RideRepository::try_leave`,
/// testable without a database.
pub fn release(mut ride: Ride) -> Ride {
    if ride.kind == RideKind::Driver {
        let original = ride.original_seats.unwrap_or(0);
        let available = ride.available_seats.unwrap_or(0);
        // Clamp against prior corruption; a healthy ride never hits the cap.
        ride.available_seats = Some((available + 1).min(original));
    }
    ride
}

/// Structural invariants that must hold for every ride at rest.
pub fn check_invariants(ride: &Ride) -> Result<(), String> {
    match ride.kind {
        RideKind::Driver => {
            let original = ride
                .original_seats
                .ok_or("driver ride without original_seats")?;
            let available = ride
                .available_seats
                .ok_or("driver ride without available_seats")?;
            if available < 0 || available > original {
                return Err(format!(
                    "available_seats {available} outside 0..={original}"
                ));
            }
            if original - available != ride.passengers.len() as i64 {
                return Err(format!(
                    "seat consumption {} does not match passenger count {}",
                    original - available,
                    ride.passengers.len()
                ));
            }
            if ride.price.is_none() {
                return Err("driver ride without price".into());
            }
        }
        RideKind::PassengerDemand => {
            if ride.price.is_some() {
                return Err("demand ride with price".into());
            }
        }
    }
    if ride.has_passenger(&ride.creator_id) {
        return Err("creator present in passenger roster".into());
    }
    let mut seen = std::collections::HashSet::new();
    for p in &ride.passengers {
        if !seen.insert(p) {
            return Err(format!("duplicate passenger {p}"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ride::RideStatus;
    use chrono::{NaiveDate, Utc};

    fn driver_ride(original: i64, available: i64, passengers: &[&str]) -> Ride {
        Ride {
            id: "ride-1".into(),
            creator_id: "driver-1".into(),
            kind: RideKind::Driver,
            status: RideStatus::Active,
            departure: "Tunis".into(),
            destination: "Sfax".into(),
            scheduled_date: NaiveDate::from_ymd_opt(2030, 6, 1).unwrap(),
            scheduled_time: "08:30".into(),
            price: Some(15.0),
            original_seats: Some(original),
            available_seats: Some(available),
            needed_seats: None,
            passengers: passengers.iter().map(|p| p.to_string()).collect(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn reserve_decrements_until_full() {
        let ride = driver_ride(2, 2, &[]);
        let ride = reserve(ride).unwrap();
        assert_eq!(ride.available_seats, Some(1));
        let ride = reserve(ride).unwrap();
        assert_eq!(ride.available_seats, Some(0));
        let err = reserve(ride).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn release_clamps_to_original() {
        let ride = driver_ride(3, 2, &["p1"]);
        let ride = release(ride);
        assert_eq!(ride.available_seats, Some(3));
        // Already at capacity: a second release must not exceed it.
        let ride = release(ride);
        assert_eq!(ride.available_seats, Some(3));
    }

    #[test]
    fn demand_rides_always_accommodate() {
        let mut ride = driver_ride(1, 0, &["p1"]);
        assert!(!can_accommodate(&ride));
        ride.kind = RideKind::PassengerDemand;
        ride.price = None;
        ride.original_seats = None;
        ride.available_seats = None;
        assert!(can_accommodate(&ride));
    }

    #[test]
    fn invariants_catch_overbooking_and_mismatch() {
        assert!(check_invariants(&driver_ride(2, 1, &["p1"])).is_ok());
        assert!(check_invariants(&driver_ride(2, 3, &[])).is_err());
        assert!(check_invariants(&driver_ride(2, 1, &[])).is_err());
        assert!(check_invariants(&driver_ride(2, 0, &["p1", "p1"])).is_err());

        let mut own = driver_ride(2, 1, &["driver-1"]);
        own.passengers = vec!["driver-1".into()];
        assert!(check_invariants(&own).is_err());
    }
}
