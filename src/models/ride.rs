use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RideKind {
    #[serde(rename = "DRIVER")]
    Driver,
    #[serde(rename = "PASSENGER_DEMAND")]
    PassengerDemand,
}

impl RideKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideKind::Driver => "DRIVER",
            RideKind::PassengerDemand => "PASSENGER_DEMAND",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "DRIVER" => Some(RideKind::Driver),
            "PASSENGER_DEMAND" => Some(RideKind::PassengerDemand),
            _ => None,
        }
    }
}

impl fmt::Display for RideKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RideStatus {
    #[serde(rename = "active")]
    Active,
    #[serde(rename = "completed")]
    Completed,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "expired")]
    Expired,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Active => "active",
            RideStatus::Completed => "completed",
            RideStatus::Cancelled => "cancelled",
            RideStatus::Expired => "expired",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(RideStatus::Active),
            "completed" => Some(RideStatus::Completed),
            "cancelled" => Some(RideStatus::Cancelled),
            "expired" => Some(RideStatus::Expired),
            _ => None,
        }
    }

    /// Terminal states are the system's soft-delete mechanism; nothing but
    /// `updated_at` may change once one is reached.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RideStatus::Active)
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ride offer (DRIVER) or trip request (PASSENGER_DEMAND) together with
/// its passenger roster.
#[derive(Debug, Clone, Serialize)]
pub struct Ride {
    pub id: String,
    pub creator_id: String,
    pub kind: RideKind,
    pub status: RideStatus,
    pub departure: String,
    pub destination: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    pub price: Option<f64>,
    pub original_seats: Option<i64>,
    pub available_seats: Option<i64>,
    pub needed_seats: Option<i64>,
    pub passengers: Vec<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ride {
    /// Scheduled date and time combined into a single UTC instant.
    pub fn scheduled_instant(&self) -> DateTime<Utc> {
        let time = parse_schedule_time(&self.scheduled_time).unwrap_or_default();
        Utc.from_utc_datetime(&self.scheduled_date.and_time(time))
    }

    pub fn has_passenger(&self, user_id: &str) -> bool {
        self.passengers.iter().any(|p| p == user_id)
    }

    pub fn is_created_by(&self, user_id: &str) -> bool {
        self.creator_id == user_id
    }
}

pub fn parse_schedule_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}

/// Input for ride creation.
#[derive(Debug, Clone, Deserialize)]
pub struct RideDraft {
    pub kind: RideKind,
    pub departure: String,
    pub destination: String,
    pub scheduled_date: NaiveDate,
    pub scheduled_time: String,
    pub available_seats: Option<i64>,
    pub needed_seats: Option<i64>,
    pub price: Option<f64>,
    pub description: Option<String>,
}

/// Closed update set for `update`. Unknown keys are rejected wholesale at
/// the boundary instead of being filtered field by field.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RidePatch {
    pub scheduled_date: Option<NaiveDate>,
    pub scheduled_time: Option<String>,
    pub departure: Option<String>,
    pub destination: Option<String>,
    pub available_seats: Option<i64>,
    pub needed_seats: Option<i64>,
    pub price: Option<f64>,
    pub description: Option<String>,
    pub status: Option<RideStatus>,
}

impl RidePatch {
    pub fn is_empty(&self) -> bool {
        self.scheduled_date.is_none()
            && self.scheduled_time.is_none()
            && self.departure.is_none()
            && self.destination.is_none()
            && self.available_seats.is_none()
            && self.needed_seats.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.status.is_none()
    }
}

/// Public listing filter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RideFilter {
    pub kind: Option<RideKind>,
    pub departure: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn schedule_time_accepts_minutes_and_seconds() {
        assert_eq!(parse_schedule_time("08:30").unwrap().hour(), 8);
        assert_eq!(parse_schedule_time("23:59:10").unwrap().minute(), 59);
        assert!(parse_schedule_time("25:00").is_none());
        assert!(parse_schedule_time("soonish").is_none());
    }

    #[test]
    fn patch_rejects_unknown_keys() {
        let err = serde_json::from_str::<RidePatch>(r#"{"creator_id": "someone-else"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!RideStatus::Active.is_terminal());
        assert!(RideStatus::Completed.is_terminal());
        assert!(RideStatus::Cancelled.is_terminal());
        assert!(RideStatus::Expired.is_terminal());
    }
}
