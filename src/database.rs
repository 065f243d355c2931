use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database connection failed: {0}")]
    ConnectionFailed(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BookingRecord {
    pub id: Uuid,
    pub space_id: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub vehicle_plate: String,
    pub arrival_at: String,
    pub departure_at: String,
    pub notes: String,
    pub requires_ev: bool,
    pub submitted_at: DateTime<Utc>,
}

/// Booking request payload; arrival/departure arrive as opaque local-time
/// strings chosen in the booking form and are stored as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    #[serde(default)]
    pub space_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub vehicle_plate: String,
    #[serde(default)]
    pub arrival: String,
    #[serde(default)]
    pub departure: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub requires_ev: Option<bool>,
}

impl CreateBooking {
    /// Names of required fields that are absent or blank, in request order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let required = [
            ("spaceId", &self.space_id),
            ("fullName", &self.full_name),
            ("email", &self.email),
            ("phone", &self.phone),
            ("vehiclePlate", &self.vehicle_plate),
            ("arrival", &self.arrival),
            ("departure", &self.departure),
        ];
        required
            .into_iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| name)
            .collect()
    }
}

pub struct BookingStore {
    pool: SqlitePool,
}

impl BookingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init_tables(&self) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS booking_requests (
                id TEXT PRIMARY KEY,
                space_id TEXT NOT NULL,
                full_name TEXT NOT NULL,
                email TEXT NOT NULL,
                phone TEXT NOT NULL,
                vehicle_plate TEXT NOT NULL,
                arrival_at TEXT NOT NULL,
                departure_at TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                requires_ev INTEGER NOT NULL DEFAULT 0,
                submitted_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_booking_requests_space_id ON booking_requests(space_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn create_booking(
        &self,
        booking: CreateBooking,
    ) -> Result<BookingRecord, DatabaseError> {
        let id = Uuid::new_v4();
        let now = Utc::now();

        let result = sqlx::query_as::<_, BookingRecord>(
            r#"
            INSERT INTO booking_requests (
                id, space_id, full_name, email, phone, vehicle_plate,
                arrival_at, departure_at, notes, requires_ev, submitted_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(booking.space_id)
        .bind(booking.full_name)
        .bind(booking.email)
        .bind(booking.phone)
        .bind(booking.vehicle_plate)
        .bind(booking.arrival)
        .bind(booking.departure)
        .bind(booking.notes.unwrap_or_default())
        .bind(booking.requires_ev.unwrap_or(false))
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(result)
    }

    pub async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
