use chrono::{DateTime, NaiveDateTime, Utc};
use futures_util::FutureExt;
use sqlx::PgPool;
use uuid::Uuid;

use super::{RecordStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    Credentials, DoseEntry, NewDose, NewProgressReport, NewSymptom, NewUser, ProgressReport,
    Severity, SymptomEntry, User,
};

const DOSE_COLUMNS: &str =
    "id, user_id, medication_name, dose_amount, dose_unit, dose_date, dose_time, notes, created_at";
const SYMPTOM_COLUMNS: &str =
    "id, user_id, dose_log_id, symptoms, severity, notes, logged_at, created_at";
const REPORT_COLUMNS: &str =
    "id, user_id, report_date, weight, blood_pressure, glucose_level, notes, created_at";
const USER_COLUMNS: &str = "id, email, full_name, onboarding_completed, created_at";

/// Postgres-backed record store. Tables are described in `schema.sql`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SymptomRow {
    id: Uuid,
    user_id: Uuid,
    dose_log_id: Option<Uuid>,
    symptoms: Vec<String>,
    severity: String,
    notes: Option<String>,
    logged_at: NaiveDateTime,
    created_at: DateTime<Utc>,
}

impl TryFrom<SymptomRow> for SymptomEntry {
    type Error = StoreError;

    fn try_from(row: SymptomRow) -> Result<Self, Self::Error> {
        let severity: Severity = row.severity.parse().map_err(StoreError::Backend)?;
        Ok(SymptomEntry {
            id: row.id,
            user_id: row.user_id,
            dose_log_id: row.dose_log_id,
            symptoms: row.symptoms,
            severity,
            notes: row.notes,
            logged_at: row.logged_at,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    id: Uuid,
    email: String,
    full_name: String,
    onboarding_completed: bool,
    created_at: DateTime<Utc>,
    password_hash: String,
}

fn db_error(e: sqlx::Error) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        tracing::error!("❌ DB query failed: {}", db_err.message());

        if let Some(code) = db_err.code() {
            tracing::info!("ℹ️ SQLSTATE code: {}", code);
        }

        if let Some(constraint) = db_err.constraint() {
            tracing::info!("🔒 Constraint violated: {}", constraint);
        }

        let message = db_err.message().to_string();
        if db_err.is_unique_violation() {
            return StoreError::Conflict(message);
        }
        if db_err.is_check_violation() || db_err.is_foreign_key_violation() {
            return StoreError::Rejected(message);
        }
        return StoreError::Backend(message);
    }

    tracing::error!("❌ Unknown DB error: {}", e);
    StoreError::Backend(e.to_string())
}

impl RecordStore for PgStore {
    fn create_dose(&self, dose: NewDose) -> StoreResult<'_, DoseEntry> {
        async move {
            sqlx::query_as::<_, DoseEntry>(&format!(
                "INSERT INTO dose_logs (user_id, medication_name, dose_amount, dose_unit, dose_date, dose_time, notes)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)
                 RETURNING {DOSE_COLUMNS}"
            ))
            .bind(dose.user_id)
            .bind(dose.medication_name)
            .bind(dose.dose_amount)
            .bind(dose.dose_unit)
            .bind(dose.dose_date)
            .bind(dose.dose_time)
            .bind(dose.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
        }
        .boxed()
    }

    fn list_doses(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<DoseEntry>> {
        async move {
            sqlx::query_as::<_, DoseEntry>(&format!(
                "SELECT {DOSE_COLUMNS}
                 FROM dose_logs
                 WHERE user_id = $1
                 ORDER BY dose_date DESC, dose_time DESC
                 LIMIT $2"
            ))
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
        }
        .boxed()
    }

    fn delete_dose(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()> {
        async move {
            sqlx::query("DELETE FROM dose_logs WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(db_error)
        }
        .boxed()
    }

    fn count_doses(&self, user_id: Uuid) -> StoreResult<'_, i64> {
        async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dose_logs WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)
        }
        .boxed()
    }

    fn create_symptom(&self, symptom: NewSymptom) -> StoreResult<'_, SymptomEntry> {
        async move {
            let dose_log_id = symptom.dose_log_id;

            // The foreign key only proves the dose exists; ownership is checked here.
            let row = sqlx::query_as::<_, SymptomRow>(&format!(
                "INSERT INTO symptom_logs (user_id, dose_log_id, symptoms, severity, notes, logged_at)
                 SELECT $1, $2, $3, $4, $5, $6
                 WHERE $2::uuid IS NULL
                    OR EXISTS (SELECT 1 FROM dose_logs WHERE id = $2 AND user_id = $1)
                 RETURNING {SYMPTOM_COLUMNS}"
            ))
            .bind(symptom.user_id)
            .bind(dose_log_id)
            .bind(symptom.symptoms)
            .bind(symptom.severity.as_str())
            .bind(symptom.notes)
            .bind(symptom.logged_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

            match (row, dose_log_id) {
                (Some(row), _) => SymptomEntry::try_from(row),
                (None, Some(id)) => Err(StoreError::unknown_dose(id)),
                (None, None) => Err(StoreError::Backend("symptom insert returned no row".into())),
            }
        }
        .boxed()
    }

    fn list_symptoms(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<SymptomEntry>> {
        async move {
            let rows = sqlx::query_as::<_, SymptomRow>(&format!(
                "SELECT {SYMPTOM_COLUMNS}
                 FROM symptom_logs
                 WHERE user_id = $1
                 ORDER BY logged_at DESC
                 LIMIT $2"
            ))
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

            rows.into_iter().map(SymptomEntry::try_from).collect()
        }
        .boxed()
    }

    fn delete_symptom(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()> {
        async move {
            sqlx::query("DELETE FROM symptom_logs WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(db_error)
        }
        .boxed()
    }

    fn count_symptoms(&self, user_id: Uuid) -> StoreResult<'_, i64> {
        async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM symptom_logs WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)
        }
        .boxed()
    }

    fn create_report(&self, report: NewProgressReport) -> StoreResult<'_, ProgressReport> {
        async move {
            sqlx::query_as::<_, ProgressReport>(&format!(
                "INSERT INTO progress_reports (user_id, report_date, weight, blood_pressure, glucose_level, notes)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING {REPORT_COLUMNS}"
            ))
            .bind(report.user_id)
            .bind(report.report_date)
            .bind(report.weight)
            .bind(report.blood_pressure)
            .bind(report.glucose_level)
            .bind(report.notes)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
        }
        .boxed()
    }

    fn list_reports(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<ProgressReport>> {
        async move {
            sqlx::query_as::<_, ProgressReport>(&format!(
                "SELECT {REPORT_COLUMNS}
                 FROM progress_reports
                 WHERE user_id = $1
                 ORDER BY report_date DESC, created_at DESC
                 LIMIT $2"
            ))
            .bind(user_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
        }
        .boxed()
    }

    fn delete_report(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()> {
        async move {
            sqlx::query("DELETE FROM progress_reports WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(db_error)
        }
        .boxed()
    }

    fn count_reports(&self, user_id: Uuid) -> StoreResult<'_, i64> {
        async move {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM progress_reports WHERE user_id = $1")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)
        }
        .boxed()
    }

    fn create_user(&self, user: NewUser) -> StoreResult<'_, User> {
        async move {
            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users (email, full_name, password_hash)
                 VALUES ($1, $2, $3)
                 RETURNING {USER_COLUMNS}"
            ))
            .bind(user.email)
            .bind(user.full_name)
            .bind(user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
        }
        .boxed()
    }

    fn find_user(&self, id: Uuid) -> StoreResult<'_, Option<User>> {
        async move {
            sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)
        }
        .boxed()
    }

    fn find_credentials(&self, email: String) -> StoreResult<'_, Option<Credentials>> {
        async move {
            let row = sqlx::query_as::<_, CredentialsRow>(&format!(
                "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"
            ))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

            Ok(row.map(|r| Credentials {
                user: User {
                    id: r.id,
                    email: r.email,
                    full_name: r.full_name,
                    onboarding_completed: r.onboarding_completed,
                    created_at: r.created_at,
                },
                password_hash: r.password_hash,
            }))
        }
        .boxed()
    }

    fn set_onboarding_completed(&self, id: Uuid, completed: bool) -> StoreResult<'_, ()> {
        async move {
            sqlx::query("UPDATE users SET onboarding_completed = $2 WHERE id = $1")
                .bind(id)
                .bind(completed)
                .execute(&self.pool)
                .await
                .map(|_| ())
                .map_err(db_error)
        }
        .boxed()
    }

    fn set_reset_token(
        &self,
        id: Uuid,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<'_, ()> {
        async move {
            sqlx::query(
                "UPDATE users SET reset_token = $2, reset_token_expires_at = $3 WHERE id = $1",
            )
            .bind(id)
            .bind(token)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(db_error)
        }
        .boxed()
    }

    fn reset_password(
        &self,
        token: Uuid,
        now: DateTime<Utc>,
        password_hash: String,
    ) -> StoreResult<'_, Option<Uuid>> {
        async move {
            sqlx::query_scalar::<_, Uuid>(
                "UPDATE users
                 SET password_hash = $3, reset_token = NULL, reset_token_expires_at = NULL
                 WHERE reset_token = $1 AND reset_token_expires_at > $2
                 RETURNING id",
            )
            .bind(token)
            .bind(now)
            .bind(password_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
        }
        .boxed()
    }
}
