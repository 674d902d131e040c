use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{
    api::ApiError,
    model::{CourseId, LessonId},
    player::SessionStatus,
};

/// What the session reports back to its host. Failures that the session
/// swallows to keep playback going show up here as well as in the log.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChanged(SessionStatus),
    CourseLoaded {
        course_id: CourseId,
        lessons: usize,
    },
    CheckpointSaved {
        lesson_id: LessonId,
        watched_sec: u64,
        completed: bool,
    },
    FlushFailed {
        lesson_id: LessonId,
        watched_sec: u64,
        error: Arc<ApiError>,
    },
    LessonCompleted {
        lesson_id: LessonId,
    },
    DetailFailed {
        lesson_id: LessonId,
        error: Arc<ApiError>,
    },
    StaleDetailDiscarded {
        lesson_id: LessonId,
    },
    CourseProgressUpdated {
        course_id: CourseId,
        percentage: f64,
    },
    CourseProgressFailed {
        course_id: CourseId,
        error: Arc<ApiError>,
    },
}

pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;
