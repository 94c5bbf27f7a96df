//! Record store boundary. Every call resolves to a typed `Result`, so callers
//! never see an untyped backend response.

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    Credentials, DoseEntry, NewDose, NewProgressReport, NewSymptom, NewUser, ProgressReport,
    SymptomEntry, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<'a, T> = BoxFuture<'a, Result<T, StoreError>>;

/// Collections are scoped by user id. Deletes match on both id and owner and
/// succeed when nothing matched.
pub trait RecordStore: Send + Sync {
    // dose_logs, ordered dose_date DESC, dose_time DESC
    fn create_dose(&self, dose: NewDose) -> StoreResult<'_, DoseEntry>;
    fn list_doses(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<DoseEntry>>;
    fn delete_dose(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()>;
    fn count_doses(&self, user_id: Uuid) -> StoreResult<'_, i64>;

    // symptom_logs, ordered logged_at DESC
    fn create_symptom(&self, symptom: NewSymptom) -> StoreResult<'_, SymptomEntry>;
    fn list_symptoms(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<SymptomEntry>>;
    fn delete_symptom(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()>;
    fn count_symptoms(&self, user_id: Uuid) -> StoreResult<'_, i64>;

    // progress_reports, ordered report_date DESC
    fn create_report(&self, report: NewProgressReport) -> StoreResult<'_, ProgressReport>;
    fn list_reports(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<ProgressReport>>;
    fn delete_report(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()>;
    fn count_reports(&self, user_id: Uuid) -> StoreResult<'_, i64>;

    // users
    fn create_user(&self, user: NewUser) -> StoreResult<'_, User>;
    fn find_user(&self, id: Uuid) -> StoreResult<'_, Option<User>>;
    fn find_credentials(&self, email: String) -> StoreResult<'_, Option<Credentials>>;
    fn set_onboarding_completed(&self, id: Uuid, completed: bool) -> StoreResult<'_, ()>;
    fn set_reset_token(
        &self,
        id: Uuid,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<'_, ()>;
    /// Swaps the password hash if `token` is live at `now`, clearing it.
    /// Returns the owning user id, or `None` for an unknown or expired token.
    fn reset_password(
        &self,
        token: Uuid,
        now: DateTime<Utc>,
        password_hash: String,
    ) -> StoreResult<'_, Option<Uuid>>;
}
