mod lesson;
pub use lesson::Lesson;

mod module;
pub use module::Module;

mod user_progress;
pub use user_progress::{LessonProgressEntry, ProgressRecord, WatchProgress};

mod course;
pub use course::{CourseProgressSnapshot, EnrolledCourse, LessonDetail};
