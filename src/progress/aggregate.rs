use crate::model::entity::{CourseProgressSnapshot, EnrolledCourse};

/// Course completion percentage, used by every view that shows one.
///
/// In order of preference: the percentage the backend put on the snapshot,
/// the share of completed lessons in the snapshot, the percentage last seen
/// on the enrollment record, and finally zero.
pub fn derive_course_percentage(
    snapshot: Option<&CourseProgressSnapshot>,
    fallback: Option<&EnrolledCourse>,
) -> f64 {
    snapshot
        .and_then(snapshot_percentage)
        .or_else(|| fallback.and_then(EnrolledCourse::progress))
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

/// What the snapshot alone can tell, without any fallback.
pub fn snapshot_percentage(snapshot: &CourseProgressSnapshot) -> Option<f64> {
    if let Some(percentage) = snapshot.progress_percentage() {
        return Some(percentage.clamp(0.0, 100.0));
    }

    let lessons = snapshot.lessons();
    if !lessons.is_empty() {
        let completed = lessons.iter().filter(|l| l.completed()).count();
        return Some(ratio(completed as u64, lessons.len() as u64));
    }

    snapshot
        .lesson_counters()
        .filter(|(_, total)| *total > 0)
        .map(|(completed, total)| ratio(completed, total))
}

fn ratio(completed: u64, total: u64) -> f64 {
    (completed as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
}
