use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, QueryBuilder, Row};

use crate::{
    db::DbPool,
    error::AppError,
    models::ride::{Ride, RideFilter, RideKind, RideStatus},
};

/// Durable ride storage. All SQL lives here; the lifecycle engine never
/// touches the pool directly. Join, leave and expiry are conditional
/// statements whose guard sits inside the UPDATE itself, so a lost race
/// shows up as zero affected rows instead of a lost update.
#[derive(Clone)]
pub struct RideRepository {
    pool: DbPool,
}

impl RideRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, ride: &Ride) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO rides (id, creator_id, kind, status, departure, destination, \
             scheduled_date, scheduled_time, price, original_seats, available_seats, \
             needed_seats, description, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&ride.id)
        .bind(&ride.creator_id)
        .bind(ride.kind.as_str())
        .bind(ride.status.as_str())
        .bind(&ride.departure)
        .bind(&ride.destination)
        .bind(ride.scheduled_date)
        .bind(&ride.scheduled_time)
        .bind(ride.price)
        .bind(ride.original_seats)
        .bind(ride.available_seats)
        .bind(ride.needed_seats)
        .bind(&ride.description)
        .bind(ride.created_at)
        .bind(ride.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn fetch(&self, ride_id: &str) -> Result<Option<Ride>, AppError> {
        let row = sqlx::query("SELECT * FROM rides WHERE id = ?1")
            .bind(ride_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let mut ride = map_ride(&row)?;
                ride.passengers = self.passenger_ids(ride_id).await?;
                Ok(Some(ride))
            }
            None => Ok(None),
        }
    }

    pub async fn fetch_required(&self, ride_id: &str) -> Result<Ride, AppError> {
        self.fetch(ride_id)
            .await?
            .ok_or_else(|| AppError::not_found("Ride not found"))
    }

    pub async fn passenger_ids(&self, ride_id: &str) -> Result<Vec<String>, AppError> {
        let rows = sqlx::query(
            "SELECT user_id FROM ride_passengers WHERE ride_id = ?1 ORDER BY joined_at",
        )
        .bind(ride_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|row| row.get::<String, _>("user_id"))
            .collect())
    }

    pub async fn list(&self, filter: &RideFilter) -> Result<Vec<Ride>, AppError> {
        let mut qb: QueryBuilder<sqlx::Sqlite> =
            QueryBuilder::new("SELECT * FROM rides WHERE 1 = 1");
        if let Some(kind) = &filter.kind {
            qb.push(" AND kind = ").push_bind(kind.as_str());
        }
        if let Some(departure) = &filter.departure {
            qb.push(" AND LOWER(departure) LIKE ")
                .push_bind(format!("%{}%", departure.to_lowercase()));
        }
        if let Some(destination) = &filter.destination {
            qb.push(" AND LOWER(destination) LIKE ")
                .push_bind(format!("%{}%", destination.to_lowercase()));
        }
        if let Some(date) = &filter.date {
            qb.push(" AND scheduled_date = ").push_bind(*date);
        }
        qb.push(" ORDER BY created_at DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;
        self.hydrate(rows).await
    }

    pub async fn list_by_creator(&self, user_id: &str) -> Result<Vec<Ride>, AppError> {
        let rows = sqlx::query("SELECT * FROM rides WHERE creator_id = ?1 ORDER BY created_at DESC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(rows).await
    }

    pub async fn list_by_participant(&self, user_id: &str) -> Result<Vec<Ride>, AppError> {
        let rows = sqlx::query(
            "SELECT r.* FROM rides r \
             JOIN ride_passengers rp ON rp.ride_id = r.id \
             WHERE rp.user_id = ?1 ORDER BY r.created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        self.hydrate(rows).await
    }

    /// Seat reservation and roster insert as one transaction. The UPDATE
    /// re-checks every precondition, so of two joins racing for the last
    /// seat exactly one sees an affected row. Returns false for the loser;
    /// the caller re-reads to classify why.
    pub async fn try_join(
        &self,
        ride_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query(
            "UPDATE rides SET \
                available_seats = CASE WHEN kind = 'DRIVER' \
                    THEN available_seats - 1 ELSE available_seats END, \
                updated_at = ?3 \
             WHERE id = ?1 AND status = 'active' AND creator_id <> ?2 \
               AND (kind <> 'DRIVER' OR available_seats > 0) \
               AND NOT EXISTS (SELECT 1 FROM ride_passengers \
                               WHERE ride_id = ?1 AND user_id = ?2)",
        )
        .bind(ride_id)
        .bind(user_id)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("INSERT INTO ride_passengers (ride_id, user_id, joined_at) VALUES (?1, ?2, ?3)")
            .bind(ride_id)
            .bind(user_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Roster removal and seat release as one transaction. The DELETE only
    /// fires while the ride is still active; the released seat is clamped
    /// to the original capacity.
    pub async fn try_leave(
        &self,
        ride_id: &str,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let removed = sqlx::query(
            "DELETE FROM ride_passengers \
             WHERE ride_id = ?1 AND user_id = ?2 \
               AND EXISTS (SELECT 1 FROM rides WHERE id = ?1 AND status = 'active')",
        )
        .bind(ride_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if removed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query(
            "UPDATE rides SET \
                available_seats = CASE WHEN kind = 'DRIVER' \
                    THEN MIN(available_seats + 1, original_seats) \
                    ELSE available_seats END, \
                updated_at = ?2 \
             WHERE id = ?1",
        )
        .bind(ride_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    /// Conditional active -> expired flip. The emptiness check sits in the
    /// statement so a join that lands first wins and the ride stays active.
    pub async fn try_expire(&self, ride_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let updated = sqlx::query(
            "UPDATE rides SET status = 'expired', updated_at = ?2 \
             WHERE id = ?1 AND status = 'active' \
               AND NOT EXISTS (SELECT 1 FROM ride_passengers WHERE ride_id = ?1)",
        )
        .bind(ride_id)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    /// Conditional active -> cancelled flip for the owner path.
    pub async fn try_cancel(&self, ride_id: &str, now: DateTime<Utc>) -> Result<bool, AppError> {
        let updated = sqlx::query(
            "UPDATE rides SET status = 'cancelled', updated_at = ?2 \
             WHERE id = ?1 AND status = 'active'",
        )
        .bind(ride_id)
        .bind(now)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    /// Persists an owner edit. The `status = 'active'` guard keeps a
    /// concurrent cancel or expiry from being silently overwritten.
    pub async fn save_owner_update(&self, ride: &Ride) -> Result<bool, AppError> {
        let updated = sqlx::query(
            "UPDATE rides SET departure = ?2, destination = ?3, scheduled_date = ?4, \
                scheduled_time = ?5, price = ?6, original_seats = ?7, available_seats = ?8, \
                needed_seats = ?9, description = ?10, status = ?11, updated_at = ?12 \
             WHERE id = ?1 AND status = 'active'",
        )
        .bind(&ride.id)
        .bind(&ride.departure)
        .bind(&ride.destination)
        .bind(ride.scheduled_date)
        .bind(&ride.scheduled_time)
        .bind(ride.price)
        .bind(ride.original_seats)
        .bind(ride.available_seats)
        .bind(ride.needed_seats)
        .bind(&ride.description)
        .bind(ride.status.as_str())
        .bind(ride.updated_at)
        .execute(&self.pool)
        .await?
        .rows_affected();
        Ok(updated == 1)
    }

    async fn hydrate(&self, rows: Vec<SqliteRow>) -> Result<Vec<Ride>, AppError> {
        let mut rides = Vec::with_capacity(rows.len());
        for row in rows {
            let mut ride = map_ride(&row)?;
            ride.passengers = self.passenger_ids(&ride.id).await?;
            rides.push(ride);
        }
        Ok(rides)
    }
}

fn map_ride(row: &SqliteRow) -> Result<Ride, AppError> {
    let kind_raw: String = row.try_get("kind").map_err(AppError::from)?;
    let kind = RideKind::parse(&kind_raw)
        .ok_or_else(|| AppError::Other(anyhow!("unknown ride kind in storage: {kind_raw}")))?;
    let status_raw: String = row.try_get("status").map_err(AppError::from)?;
    let status = RideStatus::parse(&status_raw)
        .ok_or_else(|| AppError::Other(anyhow!("unknown ride status in storage: {status_raw}")))?;

    Ok(Ride {
        id: row.try_get("id")?,
        creator_id: row.try_get("creator_id")?,
        kind,
        status,
        departure: row.try_get("departure")?,
        destination: row.try_get("destination")?,
        scheduled_date: row.try_get("scheduled_date")?,
        scheduled_time: row.try_get("scheduled_time")?,
        price: row.try_get("price")?,
        original_seats: row.try_get("original_seats")?,
        available_seats: row.try_get("available_seats")?,
        needed_seats: row.try_get("needed_seats")?,
        passengers: Vec::new(),
        description: row.try_get("description")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}
