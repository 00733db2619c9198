//! SQL implementation of the appointment store
//!
//! Dates, times and timestamps are stored as ISO text so the same statements
//! work through the `Any` driver on every backend.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use sqlx::any::AnyRow;
use sqlx::{Row, ValueRef};
use studio_common::{
    Appointment, AppointmentStatus, AppointmentStore, NewAppointment, ServiceType, StudioError,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbError;
use crate::DbClient;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

const SELECT_COLUMNS: &str = "SELECT id, appointment_date, appointment_time, service_type, notes, status, \
     client_name, client_email, client_phone, client_company, external_event_id, created_at \
     FROM appointments";

#[derive(Debug, Clone)]
pub struct SqlAppointmentRepository {
    db_client: DbClient,
}

impl SqlAppointmentRepository {
    pub fn new(db_client: DbClient) -> Self {
        Self { db_client }
    }

    /// Creates the `appointments` table and its unique event-id index.
    pub async fn init_schema(&self) -> Result<(), DbError> {
        debug!("Initializing appointment schema");

        self.db_client
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS appointments (
                    id TEXT PRIMARY KEY,
                    appointment_date TEXT NOT NULL,
                    appointment_time TEXT NOT NULL,
                    service_type TEXT NOT NULL,
                    notes TEXT,
                    status TEXT NOT NULL DEFAULT 'scheduled',
                    client_name TEXT NOT NULL,
                    client_email TEXT NOT NULL DEFAULT '',
                    client_phone TEXT,
                    client_company TEXT,
                    external_event_id TEXT,
                    sync_claim TEXT,
                    sync_claimed_at TEXT,
                    created_at TEXT NOT NULL
                )
                "#,
            )
            .await?;
        self.db_client
            .execute(
                "CREATE UNIQUE INDEX IF NOT EXISTS appointments_external_event_id \
                 ON appointments (external_event_id)",
            )
            .await?;

        info!("Appointment schema initialized successfully");
        Ok(())
    }

    async fn insert_row(
        &self,
        appointment: &Appointment,
        on_conflict_do_nothing: bool,
    ) -> Result<u64, DbError> {
        let mut query = String::from(
            "INSERT INTO appointments (id, appointment_date, appointment_time, service_type, notes, \
             status, client_name, client_email, client_phone, client_company, external_event_id, \
             created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        );
        if on_conflict_do_nothing {
            query.push_str(" ON CONFLICT DO NOTHING");
        }

        let result = sqlx::query(&query)
            .bind(appointment.id.clone())
            .bind(appointment.appointment_date.format(DATE_FORMAT).to_string())
            .bind(appointment.appointment_time.format(TIME_FORMAT).to_string())
            .bind(appointment.service_type.as_code())
            .bind(appointment.notes.clone())
            .bind(appointment.status.as_str())
            .bind(appointment.client_name.clone())
            .bind(appointment.client_email.clone())
            .bind(appointment.client_phone.clone())
            .bind(appointment.client_company.clone())
            .bind(appointment.external_event_id.clone())
            .bind(appointment.created_at.to_rfc3339())
            .execute(self.db_client.pool())
            .await
            .map_err(DbError::from_query)?;
        Ok(result.rows_affected())
    }
}

/// Fixed-width UTC timestamps so claim times compare as text.
fn claim_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn column(row: &AnyRow, name: &str) -> Result<String, DbError> {
    row.try_get::<String, _>(name)
        .map_err(|e| DbError::RowMappingError(format!("{}: {}", name, e)))
}

/// The `Any` driver refuses to decode NULL into `Option<String>`, so NULL is checked first.
pub(crate) fn optional_column(row: &AnyRow, name: &str) -> Result<Option<String>, DbError> {
    let raw = row
        .try_get_raw(name)
        .map_err(|e| DbError::RowMappingError(format!("{}: {}", name, e)))?;
    if raw.is_null() {
        return Ok(None);
    }
    column(row, name).map(Some)
}

/// Accepts both `HH:MM:SS` and the `HH:MM` form older rows may carry.
fn parse_time(value: &str) -> Result<NaiveTime, DbError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .map_err(|e| DbError::RowMappingError(format!("appointment_time '{}': {}", value, e)))
}

fn row_to_appointment(row: &AnyRow) -> Result<Appointment, DbError> {
    let date = column(row, "appointment_date")?;
    let time = column(row, "appointment_time")?;
    let service = column(row, "service_type")?;
    let status = column(row, "status")?;
    let created_at = column(row, "created_at")?;

    Ok(Appointment {
        id: column(row, "id")?,
        appointment_date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
            .map_err(|e| DbError::RowMappingError(format!("appointment_date '{}': {}", date, e)))?,
        appointment_time: parse_time(&time)?,
        service_type: service
            .parse::<ServiceType>()
            .map_err(DbError::RowMappingError)?,
        client_name: column(row, "client_name")?,
        client_email: column(row, "client_email")?,
        client_phone: optional_column(row, "client_phone")?,
        client_company: optional_column(row, "client_company")?,
        notes: optional_column(row, "notes")?,
        status: status
            .parse::<AppointmentStatus>()
            .map_err(DbError::RowMappingError)?,
        external_event_id: optional_column(row, "external_event_id")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| DbError::RowMappingError(format!("created_at '{}': {}", created_at, e)))?,
    })
}

#[async_trait]
impl AppointmentStore for SqlAppointmentRepository {
    async fn insert(&self, new: NewAppointment) -> Result<Appointment, StudioError> {
        let appointment = new.into_appointment(Uuid::new_v4().to_string(), None, Utc::now());
        self.insert_row(&appointment, false).await?;
        debug!("Inserted appointment {}", appointment.id);
        Ok(appointment)
    }

    async fn get(&self, id: &str) -> Result<Option<Appointment>, StudioError> {
        let query = format!("{} WHERE id = $1", SELECT_COLUMNS);
        let row = sqlx::query(&query)
            .bind(id.to_string())
            .fetch_optional(self.db_client.pool())
            .await
            .map_err(DbError::from_query)?;

        Ok(row.as_ref().map(row_to_appointment).transpose()?)
    }

    async fn list(&self, status: Option<AppointmentStatus>) -> Result<Vec<Appointment>, StudioError> {
        let rows = match status {
            Some(status) => {
                let query = format!(
                    "{} WHERE status = $1 ORDER BY appointment_date, appointment_time",
                    SELECT_COLUMNS
                );
                sqlx::query(&query)
                    .bind(status.as_str())
                    .fetch_all(self.db_client.pool())
                    .await
            }
            None => {
                let query = format!("{} ORDER BY appointment_date, appointment_time", SELECT_COLUMNS);
                sqlx::query(&query).fetch_all(self.db_client.pool()).await
            }
        }
        .map_err(DbError::from_query)?;

        let mut appointments = Vec::with_capacity(rows.len());
        for row in &rows {
            match row_to_appointment(row) {
                Ok(appointment) => appointments.push(appointment),
                // One corrupt row should not hide the whole dashboard
                Err(e) => warn!("Skipping unreadable appointment row: {}", e),
            }
        }
        Ok(appointments)
    }

    async fn try_claim(
        &self,
        id: &str,
        claim: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<bool, StudioError> {
        let result = sqlx::query(
            "UPDATE appointments SET sync_claim = $1, sync_claimed_at = $2 \
             WHERE id = $3 AND external_event_id IS NULL \
             AND (sync_claim IS NULL OR sync_claimed_at IS NULL OR sync_claimed_at < $4)",
        )
        .bind(claim.to_string())
        .bind(claim_timestamp(now))
        .bind(id.to_string())
        .bind(claim_timestamp(now - ttl))
        .execute(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release_claim(&self, id: &str, claim: &str) -> Result<(), StudioError> {
        sqlx::query(
            "UPDATE appointments SET sync_claim = NULL, sync_claimed_at = NULL \
             WHERE id = $1 AND sync_claim = $2",
        )
        .bind(id.to_string())
        .bind(claim.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;
        Ok(())
    }

    async fn attach_event_id(&self, id: &str, event_id: &str) -> Result<(), StudioError> {
        sqlx::query(
            "UPDATE appointments SET external_event_id = $1, sync_claim = NULL, \
             sync_claimed_at = NULL WHERE id = $2",
        )
        .bind(event_id.to_string())
        .bind(id.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;

        debug!("Linked appointment {} to event {}", id, event_id);
        Ok(())
    }

    async fn insert_imported(
        &self,
        new: NewAppointment,
        external_event_id: &str,
    ) -> Result<bool, StudioError> {
        let appointment = new.into_appointment(
            Uuid::new_v4().to_string(),
            Some(external_event_id.to_string()),
            Utc::now(),
        );
        let inserted = self.insert_row(&appointment, true).await?;
        Ok(inserted == 1)
    }

    async fn mark_cancelled(&self, id: &str) -> Result<bool, StudioError> {
        let result = sqlx::query(
            "UPDATE appointments SET status = 'cancelled' WHERE id = $1 AND status = 'scheduled'",
        )
        .bind(id.to_string())
        .execute(self.db_client.pool())
        .await
        .map_err(DbError::from_query)?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete(&self, id: &str) -> Result<bool, StudioError> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id.to_string())
            .execute(self.db_client.pool())
            .await
            .map_err(DbError::from_query)?;

        Ok(result.rows_affected() > 0)
    }
}
