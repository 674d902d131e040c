//! The REST collaborator the progress engine talks to.

mod error;
pub use error::{ApiError, ApiResult};

mod http;
pub use http::{DEFAULT_REQUEST_TIMEOUT, HttpLearningApi};

mod video;
pub use video::{VideoSource, resolve_video};

use crate::model::{
    CourseId, LessonId,
    entity::{CourseProgressSnapshot, EnrolledCourse, LessonDetail, Module, WatchProgress},
};

#[async_trait::async_trait]
pub trait LearningApi: Send + Sync {
    /// `GET student/lessons/{id}`: the lesson with its video reference and saved progress.
    async fn lesson_detail(&self, lesson_id: &LessonId) -> ApiResult<LessonDetail>;

    /// `POST student/lessons/{id}/progress`
    async fn log_watch_progress(
        &self,
        lesson_id: &LessonId,
        progress: WatchProgress,
    ) -> ApiResult<()>;

    /// `GET student/courses/{id}/progress`
    async fn course_progress(&self, course_id: &CourseId) -> ApiResult<CourseProgressSnapshot>;

    /// `GET student/courses/{id}/modules`. Modules may or may not embed lessons.
    async fn course_modules(&self, course_id: &CourseId) -> ApiResult<Vec<Module>>;

    /// `GET student/courses`
    async fn enrolled_courses(&self) -> ApiResult<Vec<EnrolledCourse>>;

    /// `GET student/courses/{id}`
    async fn course_details(&self, course_id: &CourseId) -> ApiResult<EnrolledCourse>;
}
