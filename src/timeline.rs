//! Merges recent dose and symptom entries into one display timeline.
//!
//! Both sources are normalised to [`TimelineEvent`] and ordered by
//! `(date, time)` descending. A missing time compares as `00:00` but is never
//! written back. Events sharing the same date and time have no defined
//! relative order.

use std::future::Future;

use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, StoreError};
use crate::models::{hhmm, truncate_to_minute, DoseEntry, SymptomEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Dose,
    Symptom,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TimelineEntry {
    Dose(DoseEntry),
    Symptom(SymptomEntry),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub id: Uuid,
    pub kind: EventKind,
    pub date: NaiveDate,
    #[serde(with = "hhmm::option")]
    pub time: Option<NaiveTime>,
    #[serde(rename = "data")]
    pub entry: TimelineEntry,
}

impl TimelineEvent {
    fn sort_key(&self) -> (NaiveDate, NaiveTime) {
        (self.date, self.time.unwrap_or_default())
    }
}

impl From<DoseEntry> for TimelineEvent {
    fn from(dose: DoseEntry) -> Self {
        TimelineEvent {
            id: dose.id,
            kind: EventKind::Dose,
            date: dose.dose_date,
            time: Some(dose.dose_time),
            entry: TimelineEntry::Dose(dose),
        }
    }
}

impl From<SymptomEntry> for TimelineEvent {
    fn from(symptom: SymptomEntry) -> Self {
        TimelineEvent {
            id: symptom.id,
            kind: EventKind::Symptom,
            date: symptom.logged_at.date(),
            time: Some(truncate_to_minute(symptom.logged_at.time())),
            entry: TimelineEntry::Symptom(symptom),
        }
    }
}

/// Orders events most recent first. Stable, so events with equal keys keep
/// whatever order they arrived in.
pub fn sort_events(events: &mut [TimelineEvent]) {
    events.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
}

pub fn merge(doses: Vec<DoseEntry>, symptoms: Vec<SymptomEntry>) -> Vec<TimelineEvent> {
    let mut events: Vec<TimelineEvent> = doses
        .into_iter()
        .map(TimelineEvent::from)
        .chain(symptoms.into_iter().map(TimelineEvent::from))
        .collect();

    sort_events(&mut events);
    events
}

/// Runs both fetches concurrently and merges only when both succeed. Either
/// failure collapses into a single [`AppError::AggregateFetch`].
pub async fn load<D, S>(doses: D, symptoms: S) -> Result<Vec<TimelineEvent>, AppError>
where
    D: Future<Output = Result<Vec<DoseEntry>, StoreError>>,
    S: Future<Output = Result<Vec<SymptomEntry>, StoreError>>,
{
    let (doses, symptoms) = tokio::try_join!(doses, symptoms).map_err(|e| {
        tracing::error!("❌ Timeline fetch failed: {}", e);
        AppError::AggregateFetch
    })?;

    Ok(merge(doses, symptoms))
}
