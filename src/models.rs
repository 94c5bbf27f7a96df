use serde::{ Serialize, Deserialize };
use uuid::Uuid;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, DateTime, Timelike, Utc};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DoseEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub medication_name: String,
    pub dose_amount: f64,
    pub dose_unit: String,
    pub dose_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub dose_time: NaiveTime,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDose {
    pub user_id: Uuid,
    pub medication_name: String,
    pub dose_amount: f64,
    pub dose_unit: String,
    pub dose_date: NaiveDate,
    pub dose_time: NaiveTime,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Severity::Low),
            "medium" => Ok(Severity::Medium),
            "high" => Ok(Severity::High),
            other => Err(format!("unknown severity '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub dose_log_id: Option<Uuid>,
    pub symptoms: Vec<String>,
    pub severity: Severity,
    pub notes: Option<String>,
    pub logged_at: NaiveDateTime,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSymptom {
    pub user_id: Uuid,
    pub dose_log_id: Option<Uuid>,
    pub symptoms: Vec<String>,
    pub severity: Severity,
    pub notes: Option<String>,
    pub logged_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProgressReport {
    pub id: Uuid,
    pub user_id: Uuid,
    pub report_date: NaiveDate,
    pub weight: Option<f64>,
    pub blood_pressure: Option<String>,
    pub glucose_level: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProgressReport {
    pub user_id: Uuid,
    pub report_date: NaiveDate,
    pub weight: Option<f64>,
    pub blood_pressure: Option<String>,
    pub glucose_level: Option<f64>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

/// A user together with the stored Argon2 hash. Never serialised.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
}

/// Screen the client should open after authenticating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    Onboarding,
    Dashboard,
}

impl Screen {
    pub fn for_user(user: &User) -> Self {
        if user.onboarding_completed {
            Screen::Dashboard
        } else {
            Screen::Onboarding
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub total_doses: i64,
    pub last_dose: Option<NaiveDate>,
    pub symptoms_logged: i64,
    pub reports_created: i64,
}

/// Labels as stored by existing records; matched verbatim, never translated.
pub const COMMON_SYMPTOMS: [&str; 10] = [
    "Náusea",
    "Vômito",
    "Diarreia",
    "Constipação",
    "Dor abdominal",
    "Fadiga",
    "Tontura",
    "Dor de cabeça",
    "Perda de apetite",
    "Refluxo",
];

/// Drops seconds and sub-seconds; never rounds.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// `HH:MM` wire format for times of day. Accepts `HH:MM:SS` on input.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        let raw = raw.trim();
        NaiveTime::parse_from_str(raw, FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
    }

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::NaiveTime;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            time: &Option<NaiveTime>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match time {
                Some(t) => super::serialize(t, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<NaiveTime>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                Some(raw) => super::parse(&raw).map(Some).map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}
