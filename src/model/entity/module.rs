use serde::{Deserialize, Serialize};

use crate::model::{LessonId, ModuleId, entity::Lesson, wire};

/// A course module. Lesson order is kept exactly as the backend sent it; it
/// drives default selection and "next lesson".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    #[serde(alias = "_id")]
    id: ModuleId,
    #[serde(default)]
    title: String,
    #[serde(
        default,
        alias = "order",
        alias = "position",
        deserialize_with = "wire::seconds"
    )]
    order_index: u64,
    #[serde(default, deserialize_with = "wire::lenient_list")]
    lessons: Vec<Lesson>,
}

impl Module {
    pub fn new<S: Into<String>>(id: ModuleId, title: S, order_index: u64, lessons: Vec<Lesson>) -> Self {
        Self {
            id,
            title: title.into(),
            order_index,
            lessons,
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> u64 {
        self.order_index
    }

    pub fn lessons(&self) -> &[Lesson] {
        &self.lessons
    }

    pub fn lesson(&self, id: &LessonId) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.id() == id)
    }

    pub(crate) fn lesson_mut(&mut self, id: &LessonId) -> Option<&mut Lesson> {
        self.lessons.iter_mut().find(|l| l.id() == id)
    }
}
