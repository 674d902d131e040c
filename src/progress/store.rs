use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use tokio::sync::watch;

use crate::{
    model::{
        CourseId, LessonId,
        entity::{CourseProgressSnapshot, EnrolledCourse, ProgressRecord},
    },
    progress::{derive_course_percentage, snapshot_percentage},
};

/// Most recently known progress per lesson and per course.
///
/// Lives for one login session: build it at startup, share it behind an
/// `Arc`, call [`ProgressStore::clear`] at logout. Every upsert bumps a
/// revision that views can watch to refresh completion badges.
#[derive(Debug)]
pub struct ProgressStore {
    lessons: RwLock<HashMap<LessonId, ProgressRecord>>,
    courses: RwLock<HashMap<CourseId, CourseProgressSnapshot>>,
    revision: watch::Sender<u64>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Default for ProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressStore {
    pub fn new() -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            lessons: RwLock::new(HashMap::new()),
            courses: RwLock::new(HashMap::new()),
            revision,
        }
    }

    /// Replaces whatever was stored for `lesson_id`.
    pub fn upsert_lesson_progress(&self, lesson_id: LessonId, record: ProgressRecord) {
        tracing::trace!(%lesson_id, completed = record.completed(), "lesson progress upsert");
        write(&self.lessons).insert(lesson_id, record.reconciled(None));
        self.bump();
    }

    /// Replaces the stored snapshot for `course_id`.
    pub fn upsert_course_progress(&self, course_id: CourseId, snapshot: CourseProgressSnapshot) {
        write(&self.courses).insert(course_id, snapshot);
        self.bump();
    }

    /// Stores the snapshot and refreshes every lesson record it carries. This
    /// is where server truth overwrites local optimistic state. A snapshot
    /// with no usable percentage keeps the one previously known.
    pub fn apply_course_snapshot(&self, course_id: CourseId, mut snapshot: CourseProgressSnapshot) {
        if snapshot_percentage(&snapshot).is_none() {
            let known = read(&self.courses)
                .get(&course_id)
                .and_then(snapshot_percentage);
            if let Some(known) = known {
                tracing::debug!(%course_id, known, "course snapshot without percentage");
                snapshot.set_progress_percentage(known);
            }
        }

        {
            let mut lessons = write(&self.lessons);
            for entry in snapshot.lessons() {
                lessons.insert(entry.lesson_id().clone(), entry.record().clone().reconciled(None));
            }
        }
        self.upsert_course_progress(course_id, snapshot);
    }

    pub fn lesson_progress(&self, lesson_id: &LessonId) -> Option<ProgressRecord> {
        read(&self.lessons).get(lesson_id).cloned()
    }

    pub fn is_completed(&self, lesson_id: &LessonId) -> bool {
        read(&self.lessons)
            .get(lesson_id)
            .is_some_and(ProgressRecord::completed)
    }

    pub fn course_progress(&self, course_id: &CourseId) -> Option<CourseProgressSnapshot> {
        read(&self.courses).get(course_id).cloned()
    }

    pub fn course_percentage(&self, course_id: &CourseId, fallback: Option<&EnrolledCourse>) -> f64 {
        let courses = read(&self.courses);
        derive_course_percentage(courses.get(course_id), fallback)
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn clear(&self) {
        write(&self.lessons).clear();
        write(&self.courses).clear();
        self.bump();
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }
}
