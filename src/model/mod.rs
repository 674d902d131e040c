mod ids;
pub use ids::{CourseId, LessonId, ModuleId};

pub mod entity;
pub mod normalize;

mod wire;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Lesson,
    LessonProgress,
    Module,
    Course,
    CourseProgress,
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lesson => write!(f, "lesson"),
            Self::LessonProgress => write!(f, "lesson progress"),
            Self::Module => write!(f, "module"),
            Self::Course => write!(f, "course"),
            Self::CourseProgress => write!(f, "course progress"),
        }
    }
}
