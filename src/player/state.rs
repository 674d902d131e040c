use uuid::Uuid;

use crate::{
    api::VideoSource,
    model::{LessonId, entity::Lesson},
    player::PlaybackTracker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Waiting for the player's first metadata event to seek to `position`.
    Resuming { position: u64 },
    Playing,
}

/// Every state the lesson player can be in. Only `Ready` owns a tracker, so
/// samples can never be attributed to a lesson that is not loaded.
#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    /// The course has no modules, or none of them has a lesson.
    NoContent,
    Selecting {
        lesson_id: LessonId,
    },
    /// Waiting for the lesson detail. `error` is set when the last fetch
    /// failed; the state stays here until the caller retries or switches.
    DetailLoading {
        lesson_id: LessonId,
        load_id: Uuid,
        error: Option<String>,
    },
    Ready {
        lesson: Lesson,
        load_id: Uuid,
        video: VideoSource,
        phase: PlaybackPhase,
        tracker: PlaybackTracker,
    },
    Switching {
        from: LessonId,
        to: LessonId,
    },
}

/// Payload-free view of [`SessionState`], published on the event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    NoContent,
    Selecting,
    DetailLoading,
    DetailFailed,
    Resuming,
    Playing,
    VideoUnavailable,
    Switching,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        match self {
            Self::Idle => SessionStatus::Idle,
            Self::NoContent => SessionStatus::NoContent,
            Self::Selecting { .. } => SessionStatus::Selecting,
            Self::DetailLoading { error: None, .. } => SessionStatus::DetailLoading,
            Self::DetailLoading { error: Some(_), .. } => SessionStatus::DetailFailed,
            Self::Ready {
                video: VideoSource::Unavailable,
                ..
            } => SessionStatus::VideoUnavailable,
            Self::Ready {
                phase: PlaybackPhase::Resuming { .. },
                ..
            } => SessionStatus::Resuming,
            Self::Ready {
                phase: PlaybackPhase::Playing,
                ..
            } => SessionStatus::Playing,
            Self::Switching { .. } => SessionStatus::Switching,
        }
    }

    /// The lesson this state is about, if any.
    pub fn lesson_id(&self) -> Option<&LessonId> {
        match self {
            Self::Idle | Self::NoContent => None,
            Self::Selecting { lesson_id } | Self::DetailLoading { lesson_id, .. } => Some(lesson_id),
            Self::Ready { lesson, .. } => Some(lesson.id()),
            Self::Switching { to, .. } => Some(to),
        }
    }
}
