#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use lesson_tracker::{
    api::{ApiError, ApiResult, LearningApi},
    model::{
        CourseId, LessonId, ModuleId, ResourceType,
        entity::{
            CourseProgressSnapshot, EnrolledCourse, Lesson, LessonDetail, Module, WatchProgress,
        },
    },
    player::{LessonSession, SessionEvent, SessionEvents, SessionSettings},
    progress::ProgressStore,
};
use serde_json::{Value, json};
use tokio::{net::TcpListener, sync::Notify};
use url::Url;

/// Everything the session asked the backend for, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    LessonDetail(String),
    LogProgress(String, WatchProgress),
    CourseProgress(String),
    CourseModules(String),
    EnrolledCourses,
    CourseDetails(String),
}

#[derive(Default)]
pub struct MockApi {
    modules: Vec<Module>,
    details: HashMap<String, LessonDetail>,
    course_progress: Mutex<CourseProgressSnapshot>,
    calls: Mutex<Vec<Call>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    fail_details: AtomicBool,
    fail_flushes: AtomicBool,
    stall_next_flush: AtomicBool,
    enrollment_progress: Option<f64>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_modules(mut self, modules: Vec<Module>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_detail(mut self, detail: LessonDetail) -> Self {
        self.details
            .insert(detail.lesson().id().to_string(), detail);
        self
    }

    pub fn with_course_progress(self, snapshot: CourseProgressSnapshot) -> Self {
        self.set_course_progress(snapshot);
        self
    }

    pub fn set_course_progress(&self, snapshot: CourseProgressSnapshot) {
        *self.course_progress.lock().unwrap() = snapshot;
    }

    /// Holds `lesson_detail(lesson_id)` until the returned handle is notified.
    pub fn gate(&self, lesson_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(lesson_id.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn fail_details(&self, fail: bool) {
        self.fail_details.store(fail, Ordering::SeqCst);
    }

    pub fn fail_flushes(&self, fail: bool) {
        self.fail_flushes.store(fail, Ordering::SeqCst);
    }

    /// The next progress post never completes.
    pub fn stall_next_flush(&self) {
        self.stall_next_flush.store(true, Ordering::SeqCst);
    }

    pub fn with_enrollment_progress(mut self, progress: f64) -> Self {
        self.enrollment_progress = Some(progress);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn progress_calls(&self) -> Vec<(String, WatchProgress)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::LogProgress(id, progress) => Some((id, progress)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl LearningApi for MockApi {
    async fn lesson_detail(&self, lesson_id: &LessonId) -> ApiResult<LessonDetail> {
        self.record(Call::LessonDetail(lesson_id.to_string()));

        let gate = self.gates.lock().unwrap().get(lesson_id.as_str()).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_details.load(Ordering::SeqCst) {
            return Err(ApiError::unavailable(ResourceType::Lesson, "backend down"));
        }

        self.details
            .get(lesson_id.as_str())
            .cloned()
            .ok_or_else(|| ApiError::unavailable(ResourceType::Lesson, "no such lesson"))
    }

    async fn log_watch_progress(
        &self,
        lesson_id: &LessonId,
        progress: WatchProgress,
    ) -> ApiResult<()> {
        self.record(Call::LogProgress(lesson_id.to_string(), progress));

        if self.stall_next_flush.swap(false, Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }

        if self.fail_flushes.load(Ordering::SeqCst) {
            return Err(ApiError::unavailable(ResourceType::LessonProgress, "backend down"));
        }
        Ok(())
    }

    async fn course_progress(&self, course_id: &CourseId) -> ApiResult<CourseProgressSnapshot> {
        self.record(Call::CourseProgress(course_id.to_string()));
        Ok(self.course_progress.lock().unwrap().clone())
    }

    async fn course_modules(&self, course_id: &CourseId) -> ApiResult<Vec<Module>> {
        self.record(Call::CourseModules(course_id.to_string()));
        Ok(self.modules.clone())
    }

    async fn enrolled_courses(&self) -> ApiResult<Vec<EnrolledCourse>> {
        self.record(Call::EnrolledCourses);
        Ok(Vec::new())
    }

    async fn course_details(&self, course_id: &CourseId) -> ApiResult<EnrolledCourse> {
        self.record(Call::CourseDetails(course_id.to_string()));
        Ok(EnrolledCourse::new(
            course_id.clone(),
            "Mock course",
            self.enrollment_progress,
        ))
    }
}

pub fn lesson(id: &str, order: u64, duration: u64) -> Lesson {
    Lesson::new(LessonId::from(id), format!("Lesson {id}"), order, duration)
}

pub fn module(id: &str, order: u64, lessons: Vec<Lesson>) -> Module {
    Module::new(ModuleId::from(id), format!("Module {id}"), order, lessons)
}

pub fn settings() -> SessionSettings {
    SessionSettings::new(
        Url::parse("https://videos.example.com/").unwrap(),
        Duration::from_secs(5),
    )
}

pub fn new_session(
    api: &Arc<MockApi>,
    store: &Arc<ProgressStore>,
) -> (LessonSession<MockApi>, SessionEvents) {
    LessonSession::new(
        CourseId::from("course-1"),
        Arc::clone(api),
        Arc::clone(store),
        settings(),
    )
}

/// Lets spawned calls run, then feeds their results back into the session.
pub async fn settle(session: &mut LessonSession<MockApi>) {
    for _ in 0..4 {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        session.process_pending();
    }
}

pub fn drain(events: &mut SessionEvents) -> Vec<SessionEvent> {
    let mut drained = Vec::new();
    while let Ok(event) = events.try_recv() {
        drained.push(event);
    }
    drained
}

/// Requests seen by [`spawn_backend`], as `METHOD path`.
#[derive(Debug, Clone, Default)]
pub struct BackendLog {
    pub requests: Arc<Mutex<Vec<String>>>,
    pub bodies: Arc<Mutex<Vec<Value>>>,
    pub auth: Arc<Mutex<Vec<Option<String>>>>,
}

impl BackendLog {
    fn push(&self, line: String, headers: &HeaderMap) {
        self.requests.lock().unwrap().push(line);
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        self.auth.lock().unwrap().push(auth);
    }
}

async fn lesson_handler(
    State(log): State<BackendLog>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    log.push(format!("GET /api/student/lessons/{id}"), &headers);

    if id == "missing" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"success": false, "message": "Lesson not found"})),
        );
    }

    (
        StatusCode::OK,
        Json(json!({
            "success": true,
            "data": {
                "lesson": {
                    "_id": id,
                    "title": "Ownership",
                    "order": 2,
                    "duration": "600",
                    "videoUrl": "courses/rust/ownership.mp4"
                },
                "progress": {
                    "isCompleted": false,
                    "watchedSec": 120,
                    "lastPosition": 118.6
                }
            }
        })),
    )
}

async fn progress_handler(
    State(log): State<BackendLog>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    log.push(format!("POST /api/student/lessons/{id}/progress"), &headers);
    log.bodies.lock().unwrap().push(body);

    if id == "slow" {
        tokio::time::sleep(Duration::from_secs(5)).await;
    }
    Json(json!({"success": true}))
}

async fn modules_handler(
    State(log): State<BackendLog>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    log.push(format!("GET /api/student/courses/{id}/modules"), &headers);

    let modules = json!([
        {
            "_id": "m2",
            "title": "Borrowing",
            "orderIndex": 1,
            "lessons": [{"id": 21, "title": "References", "durationSec": 300}]
        },
        {"id": "m3", "title": "Empty", "orderIndex": 2}
    ]);

    // one course wraps its list, the other does not
    if id == "wrapped" {
        Json(json!({"success": true, "data": {"modules": modules}}))
    } else {
        Json(json!({"success": true, "data": modules}))
    }
}

async fn course_progress_handler(
    State(log): State<BackendLog>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    log.push(format!("GET /api/student/courses/{id}/progress"), &headers);

    if id == "numeric" {
        return Json(json!({"success": true, "data": {"progress": 42}}));
    }

    Json(json!({
        "success": true,
        "data": {
            "progress": {
                "completedLessons": 3,
                "totalLessons": 4,
                "lessons": [
                    {"lessonId": "a", "completed": true},
                    {"lessonId": "b", "isCompleted": 1, "watchedSec": 40},
                    {"lessonId": "c", "completed": "true"},
                    {"lessonId": "d", "completed": false, "lastPosition": 12}
                ]
            }
        }
    }))
}

async fn courses_handler(State(log): State<BackendLog>, headers: HeaderMap) -> impl IntoResponse {
    log.push("GET /api/student/courses".to_string(), &headers);
    Json(json!({
        "success": true,
        "data": {
            "courses": [
                {"_id": "rust", "title": "Rust", "progress": 35.5},
                {"id": "go", "title": "Go"}
            ]
        }
    }))
}

async fn course_handler(
    State(log): State<BackendLog>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    log.push(format!("GET /api/student/courses/{id}"), &headers);
    Json(json!({"success": true, "data": {"course": {"_id": id, "title": "Rust", "progress": 80}}}))
}

/// Serves a fake learning portal on a random local port. Returns the api
/// base url and the request log.
pub async fn spawn_backend() -> (Url, BackendLog) {
    let log = BackendLog::default();

    let app = Router::new()
        .route("/api/student/lessons/{id}", get(lesson_handler))
        .route("/api/student/lessons/{id}/progress", post(progress_handler))
        .route("/api/student/courses", get(courses_handler))
        .route("/api/student/courses/{id}", get(course_handler))
        .route("/api/student/courses/{id}/modules", get(modules_handler))
        .route("/api/student/courses/{id}/progress", get(course_progress_handler))
        .with_state(log.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = Url::parse(&format!("http://{addr}/api/")).unwrap();
    (base, log)
}
