//! Boundary normalization of backend bodies.
//!
//! Endpoints are not consistent about wrapping: a list may arrive bare or
//! inside an object, a detail may arrive bare or under a named key. Missing
//! pieces become empty collections or zero progress.

use serde_json::Value;

use crate::model::{
    entity::{CourseProgressSnapshot, EnrolledCourse, Lesson, LessonDetail, Module, ProgressRecord},
    wire,
};

fn is_falsy(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false))
}

/// Strips the `{ success, data }` envelope. Bodies without a usable `data`
/// field are returned unchanged.
pub fn unwrap_envelope(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) if !is_falsy(&data) => data,
            Some(data) => {
                map.insert("data".to_string(), data);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

/// `data` or `data[key]`, whichever is the list.
fn list_under(data: Value, key: &str) -> Value {
    match data {
        Value::Array(_) => data,
        Value::Object(mut map) => map.remove(key).unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

/// `data[key]` when it is an object, otherwise `data` itself.
fn object_under(data: Value, key: &str) -> Value {
    match data {
        Value::Object(mut map) => match map.remove(key) {
            Some(inner @ Value::Object(_)) => inner,
            Some(other) => {
                map.insert(key.to_string(), other);
                Value::Object(map)
            }
            None => Value::Object(map),
        },
        other => other,
    }
}

pub fn modules(data: Value) -> Vec<Module> {
    wire::parse_list(list_under(data, "modules"))
}

pub fn courses(data: Value) -> Vec<EnrolledCourse> {
    wire::parse_list(list_under(data, "courses"))
}

pub fn course(data: Value) -> serde_json::Result<EnrolledCourse> {
    serde_json::from_value(object_under(data, "course"))
}

pub fn lesson_detail(data: Value) -> serde_json::Result<LessonDetail> {
    let progress = data
        .get("progress")
        .filter(|p| p.is_object())
        .cloned()
        .and_then(|p| match serde_json::from_value::<ProgressRecord>(p) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("ignoring malformed lesson progress: {e}");
                None
            }
        });

    let lesson: Lesson = serde_json::from_value(object_under(data, "lesson"))?;
    Ok(LessonDetail::new(lesson, progress))
}

/// Never fails: an unreadable snapshot is an empty one.
pub fn course_progress(data: Value) -> CourseProgressSnapshot {
    if let Some(percentage) = data.get("progress").and_then(Value::as_f64) {
        return CourseProgressSnapshot::with_percentage(percentage);
    }

    match serde_json::from_value(object_under(data, "progress")) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::warn!("unreadable course progress, treating as empty: {e}");
            CourseProgressSnapshot::default()
        }
    }
}
