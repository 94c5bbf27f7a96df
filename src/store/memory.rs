use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RecordStore, StoreResult};
use crate::error::StoreError;
use crate::models::{
    Credentials, DoseEntry, NewDose, NewProgressReport, NewSymptom, NewUser, ProgressReport,
    SymptomEntry, User,
};

struct UserRecord {
    user: User,
    password_hash: String,
    reset_token: Option<(Uuid, DateTime<Utc>)>,
}

#[derive(Default)]
struct Tables {
    doses: Vec<DoseEntry>,
    symptoms: Vec<SymptomEntry>,
    reports: Vec<ProgressReport>,
    users: Vec<UserRecord>,
}

/// Process-local store for development runs and tests. Contents are lost on
/// restart.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn recent<T: Clone, K: Ord>(
    rows: &[T],
    user_id: Uuid,
    owner: impl Fn(&T) -> Uuid,
    key: impl Fn(&T) -> K,
    limit: i64,
) -> Vec<T> {
    let mut out: Vec<T> = rows.iter().filter(|r| owner(r) == user_id).cloned().collect();
    out.sort_by_key(|r| Reverse(key(r)));
    out.truncate(usize::try_from(limit).unwrap_or(0));
    out
}

impl RecordStore for MemoryStore {
    fn create_dose(&self, dose: NewDose) -> StoreResult<'_, DoseEntry> {
        async move {
            let entry = DoseEntry {
                id: Uuid::new_v4(),
                user_id: dose.user_id,
                medication_name: dose.medication_name,
                dose_amount: dose.dose_amount,
                dose_unit: dose.dose_unit,
                dose_date: dose.dose_date,
                dose_time: dose.dose_time,
                notes: dose.notes,
                created_at: Utc::now(),
            };
            self.tables.write().await.doses.push(entry.clone());
            Ok(entry)
        }
        .boxed()
    }

    fn list_doses(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<DoseEntry>> {
        async move {
            let tables = self.tables.read().await;
            Ok(recent(
                &tables.doses,
                user_id,
                |d| d.user_id,
                |d| (d.dose_date, d.dose_time),
                limit,
            ))
        }
        .boxed()
    }

    fn delete_dose(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()> {
        async move {
            let mut tables = self.tables.write().await;
            let before = tables.doses.len();
            tables.doses.retain(|d| !(d.id == id && d.user_id == user_id));

            // ON DELETE SET NULL
            if tables.doses.len() != before {
                for symptom in tables.symptoms.iter_mut().filter(|s| s.dose_log_id == Some(id)) {
                    symptom.dose_log_id = None;
                }
            }
            Ok(())
        }
        .boxed()
    }

    fn count_doses(&self, user_id: Uuid) -> StoreResult<'_, i64> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables.doses.iter().filter(|d| d.user_id == user_id).count() as i64)
        }
        .boxed()
    }

    fn create_symptom(&self, symptom: NewSymptom) -> StoreResult<'_, SymptomEntry> {
        async move {
            let mut tables = self.tables.write().await;

            if let Some(dose_log_id) = symptom.dose_log_id {
                let owned = tables
                    .doses
                    .iter()
                    .any(|d| d.id == dose_log_id && d.user_id == symptom.user_id);
                if !owned {
                    return Err(StoreError::unknown_dose(dose_log_id));
                }
            }

            let entry = SymptomEntry {
                id: Uuid::new_v4(),
                user_id: symptom.user_id,
                dose_log_id: symptom.dose_log_id,
                symptoms: symptom.symptoms,
                severity: symptom.severity,
                notes: symptom.notes,
                logged_at: symptom.logged_at,
                created_at: Utc::now(),
            };
            tables.symptoms.push(entry.clone());
            Ok(entry)
        }
        .boxed()
    }

    fn list_symptoms(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<SymptomEntry>> {
        async move {
            let tables = self.tables.read().await;
            Ok(recent(&tables.symptoms, user_id, |s| s.user_id, |s| s.logged_at, limit))
        }
        .boxed()
    }

    fn delete_symptom(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()> {
        async move {
            self.tables
                .write()
                .await
                .symptoms
                .retain(|s| !(s.id == id && s.user_id == user_id));
            Ok(())
        }
        .boxed()
    }

    fn count_symptoms(&self, user_id: Uuid) -> StoreResult<'_, i64> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables.symptoms.iter().filter(|s| s.user_id == user_id).count() as i64)
        }
        .boxed()
    }

    fn create_report(&self, report: NewProgressReport) -> StoreResult<'_, ProgressReport> {
        async move {
            let entry = ProgressReport {
                id: Uuid::new_v4(),
                user_id: report.user_id,
                report_date: report.report_date,
                weight: report.weight,
                blood_pressure: report.blood_pressure,
                glucose_level: report.glucose_level,
                notes: report.notes,
                created_at: Utc::now(),
            };
            self.tables.write().await.reports.push(entry.clone());
            Ok(entry)
        }
        .boxed()
    }

    fn list_reports(&self, user_id: Uuid, limit: i64) -> StoreResult<'_, Vec<ProgressReport>> {
        async move {
            let tables = self.tables.read().await;
            Ok(recent(
                &tables.reports,
                user_id,
                |r| r.user_id,
                |r| (r.report_date, r.created_at),
                limit,
            ))
        }
        .boxed()
    }

    fn delete_report(&self, user_id: Uuid, id: Uuid) -> StoreResult<'_, ()> {
        async move {
            self.tables
                .write()
                .await
                .reports
                .retain(|r| !(r.id == id && r.user_id == user_id));
            Ok(())
        }
        .boxed()
    }

    fn count_reports(&self, user_id: Uuid) -> StoreResult<'_, i64> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables.reports.iter().filter(|r| r.user_id == user_id).count() as i64)
        }
        .boxed()
    }

    fn create_user(&self, user: NewUser) -> StoreResult<'_, User> {
        async move {
            let mut tables = self.tables.write().await;
            if tables.users.iter().any(|u| u.user.email == user.email) {
                return Err(StoreError::Conflict(format!(
                    "an account for {} already exists",
                    user.email
                )));
            }

            let created = User {
                id: Uuid::new_v4(),
                email: user.email,
                full_name: user.full_name,
                onboarding_completed: false,
                created_at: Utc::now(),
            };
            tables.users.push(UserRecord {
                user: created.clone(),
                password_hash: user.password_hash,
                reset_token: None,
            });
            Ok(created)
        }
        .boxed()
    }

    fn find_user(&self, id: Uuid) -> StoreResult<'_, Option<User>> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables.users.iter().find(|u| u.user.id == id).map(|u| u.user.clone()))
        }
        .boxed()
    }

    fn find_credentials(&self, email: String) -> StoreResult<'_, Option<Credentials>> {
        async move {
            let tables = self.tables.read().await;
            Ok(tables
                .users
                .iter()
                .find(|u| u.user.email == email)
                .map(|u| Credentials {
                    user: u.user.clone(),
                    password_hash: u.password_hash.clone(),
                }))
        }
        .boxed()
    }

    fn set_onboarding_completed(&self, id: Uuid, completed: bool) -> StoreResult<'_, ()> {
        async move {
            let mut tables = self.tables.write().await;
            if let Some(record) = tables.users.iter_mut().find(|u| u.user.id == id) {
                record.user.onboarding_completed = completed;
            }
            Ok(())
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
            let mut tables = self.tables.write().await;
            if let Some(record) = tables.users.iter_mut().find(|u| u.user.id == id) {
                record.reset_token = Some((token, expires_at));
            }
            Ok(())
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
            let mut tables = self.tables.write().await;
            let record = tables
                .users
                .iter_mut()
                .find(|u| matches!(u.reset_token, Some((t, expires)) if t == token && expires > now));

            Ok(record.map(|r| {
                r.password_hash = password_hash;
                r.reset_token = None;
                r.user.id
            }))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveTime};

    fn dose(user_id: Uuid, date: (i32, u32, u32), time: (u32, u32)) -> NewDose {
        NewDose {
            user_id,
            medication_name: "Ozempic".into(),
            dose_amount: 0.5,
            dose_unit: "mg".into(),
            dose_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            dose_time: NaiveTime::from_hms_opt(time.0, time.1, 0).unwrap(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn doses_list_most_recent_first_and_respect_limit() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        store.create_dose(dose(user, (2024, 5, 1), (9, 0))).await.unwrap();
        store.create_dose(dose(user, (2024, 5, 2), (8, 0))).await.unwrap();
        store.create_dose(dose(user, (2024, 5, 2), (21, 30))).await.unwrap();
        store.create_dose(dose(Uuid::new_v4(), (2024, 6, 1), (8, 0))).await.unwrap();

        let listed = store.list_doses(user, 2).await.unwrap();
        let keys: Vec<_> = listed.iter().map(|d| (d.dose_date.to_string(), d.dose_time.to_string())).collect();
        assert_eq!(
            keys,
            vec![
                ("2024-05-02".to_string(), "21:30:00".to_string()),
                ("2024-05-02".to_string(), "08:00:00".to_string()),
            ]
        );
        assert_eq!(store.count_doses(user).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn delete_is_scoped_to_owner_and_idempotent() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let created = store.create_dose(dose(owner, (2024, 5, 1), (9, 0))).await.unwrap();

        store.delete_dose(Uuid::new_v4(), created.id).await.unwrap();
        assert_eq!(store.count_doses(owner).await.unwrap(), 1);

        store.delete_dose(owner, created.id).await.unwrap();
        store.delete_dose(owner, created.id).await.unwrap();
        assert_eq!(store.count_doses(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        let new_user = || NewUser {
            email: "ana@example.com".into(),
            full_name: "Ana".into(),
            password_hash: "hash".into(),
        };
        store.create_user(new_user()).await.unwrap();
        assert!(matches!(
            store.create_user(new_user()).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn reset_token_is_single_use_and_expires() {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                email: "ana@example.com".into(),
                full_name: "Ana".into(),
                password_hash: "old".into(),
            })
            .await
            .unwrap();

        let now = Utc::now();
        let token = Uuid::new_v4();
        store.set_reset_token(user.id, token, now + Duration::hours(1)).await.unwrap();

        assert_eq!(store.reset_password(token, now + Duration::hours(2), "x".into()).await.unwrap(), None);
        assert_eq!(store.reset_password(token, now, "new".into()).await.unwrap(), Some(user.id));
        assert_eq!(store.reset_password(token, now, "again".into()).await.unwrap(), None);

        let creds = store.find_credentials("ana@example.com".into()).await.unwrap().unwrap();
        assert_eq!(creds.password_hash, "new");
    }

    #[tokio::test]
    async fn symptom_linked_to_foreign_dose_is_rejected() {
        let store = MemoryStore::new();
        let other = store.create_dose(dose(Uuid::new_v4(), (2024, 5, 1), (9, 0))).await.unwrap();
        let result = store
            .create_symptom(NewSymptom {
                user_id: Uuid::new_v4(),
                dose_log_id: Some(other.id),
                symptoms: vec!["Nausea".into()],
                severity: Default::default(),
                notes: None,
                logged_at: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap().and_hms_opt(10, 0, 0).unwrap(),
            })
            .await;
        assert!(
            matches!(&result, Err(StoreError::Rejected(m)) if *m == format!("dose {} does not exist", other.id))
        );
    }
}
