use serde::{Deserialize, Serialize};

use crate::model::{
    CourseId,
    entity::{Lesson, LessonProgressEntry, ProgressRecord},
    wire,
};

/// Server-derived summary of a user's completion across a course.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgressSnapshot {
    #[serde(
        default,
        alias = "percentage",
        deserialize_with = "wire::optional_percentage"
    )]
    progress_percentage: Option<f64>,
    #[serde(default, deserialize_with = "wire::optional_seconds")]
    completed_lessons: Option<u64>,
    #[serde(default, deserialize_with = "wire::optional_seconds")]
    total_lessons: Option<u64>,
    #[serde(default, deserialize_with = "wire::lenient_list")]
    lessons: Vec<LessonProgressEntry>,
}

impl CourseProgressSnapshot {
    pub fn new(
        progress_percentage: Option<f64>,
        completed_lessons: Option<u64>,
        total_lessons: Option<u64>,
        lessons: Vec<LessonProgressEntry>,
    ) -> Self {
        Self {
            progress_percentage: progress_percentage.map(|p| p.clamp(0.0, 100.0)),
            completed_lessons,
            total_lessons,
            lessons,
        }
    }

    pub fn with_percentage(percentage: f64) -> Self {
        Self::new(Some(percentage), None, None, Vec::new())
    }

    pub fn progress_percentage(&self) -> Option<f64> {
        self.progress_percentage
    }

    pub(crate) fn set_progress_percentage(&mut self, percentage: f64) {
        self.progress_percentage = Some(percentage.clamp(0.0, 100.0));
    }

    /// Explicit counter when the backend sent one, otherwise counted from `lessons`.
    pub fn completed_lessons(&self) -> u64 {
        self.completed_lessons
            .unwrap_or_else(|| self.lessons.iter().filter(|l| l.completed()).count() as u64)
    }

    pub fn total_lessons(&self) -> u64 {
        self.total_lessons.unwrap_or(self.lessons.len() as u64)
    }

    pub(crate) fn lesson_counters(&self) -> Option<(u64, u64)> {
        Some((self.completed_lessons?, self.total_lessons?))
    }

    pub fn lessons(&self) -> &[LessonProgressEntry] {
        &self.lessons
    }
}

/// A course the student is enrolled in, as listed by `student/courses`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrolledCourse {
    #[serde(alias = "_id")]
    id: CourseId,
    #[serde(default)]
    title: String,
    #[serde(default, deserialize_with = "wire::optional_percentage")]
    progress: Option<f64>,
}

impl EnrolledCourse {
    pub fn new<S: Into<String>>(id: CourseId, title: S, progress: Option<f64>) -> Self {
        Self {
            id,
            title: title.into(),
            progress,
        }
    }

    pub fn id(&self) -> &CourseId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Course-level percentage as last reported on the enrollment, if any.
    pub fn progress(&self) -> Option<f64> {
        self.progress
    }
}

/// A lesson with its playable video reference and the saved progress for it.
#[derive(Debug, Clone, PartialEq)]
pub struct LessonDetail {
    lesson: Lesson,
    progress: Option<ProgressRecord>,
}

impl LessonDetail {
    pub fn new(lesson: Lesson, progress: Option<ProgressRecord>) -> Self {
        let duration = lesson.duration_sec();
        Self {
            progress: progress.map(|p| p.reconciled(Some(duration))),
            lesson,
        }
    }

    pub fn lesson(&self) -> &Lesson {
        &self.lesson
    }

    pub fn progress(&self) -> Option<&ProgressRecord> {
        self.progress.as_ref()
    }

    pub fn into_parts(self) -> (Lesson, Option<ProgressRecord>) {
        (self.lesson, self.progress)
    }
}
