use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{LessonId, wire};

/// Last known watch state of one lesson.
///
/// `completed == true` always reads back as 100 percent, no matter what the
/// backend sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    #[serde(default, alias = "isCompleted", deserialize_with = "wire::flag")]
    completed: bool,
    #[serde(default, deserialize_with = "wire::seconds")]
    watched_sec: u64,
    #[serde(default, deserialize_with = "wire::seconds")]
    last_position: u64,
    #[serde(default, deserialize_with = "wire::optional_percentage")]
    percentage: Option<f64>,
    #[serde(
        default,
        alias = "lastWatchedAt",
        deserialize_with = "wire::optional_timestamp"
    )]
    updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    pub fn new(completed: bool, watched_sec: u64, last_position: u64, percentage: f64) -> Self {
        let record = Self {
            completed,
            watched_sec,
            last_position,
            percentage: Some(percentage.clamp(0.0, 100.0)),
            updated_at: Some(Utc::now()),
        };
        record.reconciled(None)
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn watched_sec(&self) -> u64 {
        self.watched_sec
    }

    pub fn last_position(&self) -> u64 {
        self.last_position
    }

    pub fn percentage(&self) -> f64 {
        if self.completed {
            100.0
        } else {
            self.percentage.unwrap_or(0.0)
        }
    }

    pub fn updated_at(&self) -> Option<&DateTime<Utc>> {
        self.updated_at.as_ref()
    }

    /// Restores the record invariants against the lesson's declared duration
    /// (0 or `None` when unknown): completion forces 100%, a missing
    /// percentage is derived from watched time, positions are clamped.
    pub fn reconciled(mut self, duration_sec: Option<u64>) -> Self {
        let duration = duration_sec.filter(|d| *d > 0);

        if let Some(duration) = duration {
            self.last_position = self.last_position.min(duration);
            if self.percentage.is_none() {
                self.percentage = Some(watched_percentage(self.watched_sec, duration));
            }
        }

        if self.completed {
            self.percentage = Some(100.0);
        }

        self
    }

    /// Applies a position checkpoint taken locally. Completion never regresses.
    pub fn checkpoint(&self, position: u64, duration_sec: Option<u64>) -> Self {
        let duration = duration_sec.filter(|d| *d > 0);
        let position = duration.map_or(position, |d| position.min(d));
        let percentage = match duration {
            Some(d) => Some(watched_percentage(position, d)),
            None => self.percentage,
        };

        Self {
            completed: self.completed,
            watched_sec: position,
            last_position: position,
            percentage,
            updated_at: Some(Utc::now()),
        }
        .reconciled(duration)
    }

    pub fn completed_at(duration_sec: u64) -> Self {
        Self {
            completed: true,
            watched_sec: duration_sec,
            last_position: duration_sec,
            percentage: Some(100.0),
            updated_at: Some(Utc::now()),
        }
    }
}

fn watched_percentage(watched: u64, duration: u64) -> f64 {
    (watched as f64 / duration as f64 * 100.0).clamp(0.0, 100.0)
}

/// One row of the `lessons` array inside a course progress snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonProgressEntry {
    #[serde(alias = "id")]
    lesson_id: LessonId,
    #[serde(flatten)]
    record: ProgressRecord,
}

impl LessonProgressEntry {
    pub fn new(lesson_id: LessonId, record: ProgressRecord) -> Self {
        Self { lesson_id, record }
    }

    pub fn lesson_id(&self) -> &LessonId {
        &self.lesson_id
    }

    pub fn record(&self) -> &ProgressRecord {
        &self.record
    }

    pub fn completed(&self) -> bool {
        self.record.completed()
    }
}

/// Body of `POST student/lessons/{id}/progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchProgress {
    pub watched_sec: u64,
    pub last_position: u64,
    pub completed: bool,
}

impl WatchProgress {
    pub fn at(position: u64) -> Self {
        Self {
            watched_sec: position,
            last_position: position,
            completed: false,
        }
    }

    pub fn finished(duration_sec: u64) -> Self {
        Self {
            watched_sec: duration_sec,
            last_position: duration_sec,
            completed: true,
        }
    }
}
