use thiserror::Error;

use crate::{api::ApiError, model::LessonId};

pub type SessionResult<T> = std::result::Result<T, SessionError>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("UnknownLesson: {0} is not part of this course")]
    UnknownLesson(LessonId),
    #[error("NothingToRetry: no failed lesson detail fetch")]
    NothingToRetry,
    #[error("ApiError - {0}")]
    ApiError(#[from] ApiError),
}
