//! Request bodies for dose, symptom and progress-report submission, and the
//! checks that run on them before anything reaches the store.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{hhmm, truncate_to_minute, NewDose, NewProgressReport, NewSymptom, Severity};

const DEFAULT_MEDICATION: &str = "Ozempic";
const DEFAULT_UNIT: &str = "mg";

/// A numeric field as typed into a form: a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum NumberInput {
    Number(f64),
    Text(String),
}

impl NumberInput {
    pub fn parse(&self, field: &str) -> Result<f64, ValidationError> {
        let value = match self {
            NumberInput::Number(n) => *n,
            NumberInput::Text(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::new(format!("{field} must be a number")))?,
        };

        if value.is_finite() {
            Ok(value)
        } else {
            Err(ValidationError::new(format!("{field} must be a finite number")))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DoseForm {
    pub medication_name: Option<String>,
    pub dose_amount: NumberInput,
    pub dose_unit: Option<String>,
    pub dose_date: Option<NaiveDate>,
    #[serde(default, with = "hhmm::option")]
    pub dose_time: Option<NaiveTime>,
    pub notes: Option<String>,
}

impl DoseForm {
    pub fn validate(self, user_id: Uuid, now: NaiveDateTime) -> Result<NewDose, ValidationError> {
        let dose_amount = self.dose_amount.parse("dose_amount")?;

        Ok(NewDose {
            user_id,
            medication_name: text_or(self.medication_name, DEFAULT_MEDICATION),
            dose_amount,
            dose_unit: text_or(self.dose_unit, DEFAULT_UNIT),
            dose_date: self.dose_date.unwrap_or(now.date()),
            dose_time: truncate_to_minute(self.dose_time.unwrap_or(now.time())),
            notes: non_blank(self.notes),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SymptomForm {
    #[serde(default)]
    pub symptoms: Vec<String>,
    #[serde(default)]
    pub severity: Severity,
    pub notes: Option<String>,
    pub logged_at: Option<NaiveDateTime>,
    pub dose_log_id: Option<Uuid>,
}

impl SymptomForm {
    pub fn validate(self, user_id: Uuid, now: NaiveDateTime) -> Result<NewSymptom, ValidationError> {
        let mut symptoms: Vec<String> = Vec::with_capacity(self.symptoms.len());
        for label in self.symptoms {
            let label = label.trim();
            if !label.is_empty() && !symptoms.iter().any(|s| s == label) {
                symptoms.push(label.to_string());
            }
        }

        if symptoms.is_empty() {
            return Err(ValidationError::new("select at least one symptom"));
        }

        Ok(NewSymptom {
            user_id,
            dose_log_id: self.dose_log_id,
            symptoms,
            severity: self.severity,
            notes: non_blank(self.notes),
            logged_at: self.logged_at.unwrap_or(now),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ReportForm {
    pub report_date: Option<NaiveDate>,
    pub weight: Option<NumberInput>,
    pub blood_pressure: Option<String>,
    pub glucose_level: Option<NumberInput>,
    pub notes: Option<String>,
}

impl ReportForm {
    pub fn validate(self, user_id: Uuid, today: NaiveDate) -> Result<NewProgressReport, ValidationError> {
        Ok(NewProgressReport {
            user_id,
            report_date: self.report_date.unwrap_or(today),
            weight: self.weight.map(|w| w.parse("weight")).transpose()?,
            blood_pressure: non_blank(self.blood_pressure),
            glucose_level: self.glucose_level.map(|g| g.parse("glucose_level")).transpose()?,
            notes: non_blank(self.notes),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn text_or(value: Option<String>, default: &str) -> String {
    non_blank(value).unwrap_or_else(|| default.to_string())
}
