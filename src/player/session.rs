use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use url::Url;
use uuid::Uuid;

use crate::{
    Config, ConfigResult,
    api::{ApiError, ApiResult, LearningApi, resolve_video},
    error::log_error,
    model::{
        CourseId, LessonId,
        entity::{
            CourseProgressSnapshot, EnrolledCourse, Lesson, LessonDetail, Module, ProgressRecord,
        },
    },
    player::{
        Flush, PlaybackPhase, PlaybackTracker, SessionError, SessionEvent, SessionEvents,
        SessionResult, SessionState,
    },
    progress::ProgressStore,
};

#[derive(Debug, Clone)]
pub struct SessionSettings {
    storage_base: Url,
    checkpoint_interval: Duration,
}

impl SessionSettings {
    pub fn new(storage_base: Url, checkpoint_interval: Duration) -> Self {
        Self {
            storage_base,
            checkpoint_interval,
        }
    }

    pub fn from_config(config: &Config) -> ConfigResult<Self> {
        Ok(Self::new(
            config.storage().video_base_url()?,
            config.tracker().checkpoint_interval(),
        ))
    }

    pub fn storage_base(&self) -> &Url {
        &self.storage_base
    }

    pub fn checkpoint_interval(&self) -> Duration {
        self.checkpoint_interval
    }
}

/// Results of spawned network calls, fed back into the session.
#[derive(Debug)]
enum Inbound {
    Detail {
        lesson_id: LessonId,
        load_id: Uuid,
        result: ApiResult<LessonDetail>,
    },
    Flushed {
        lesson_id: LessonId,
        load_id: Uuid,
        flush: Flush,
        result: ApiResult<()>,
    },
    CourseProgress {
        result: ApiResult<CourseProgressSnapshot>,
    },
}

/// Drives lesson selection and playback progress for one course.
///
/// Network calls never block the caller: they run as spawned tasks and their
/// results come back through [`LessonSession::process_next`] or
/// [`LessonSession::process_pending`], which the host calls from its event
/// loop. Must be used inside a tokio runtime.
pub struct LessonSession<A> {
    course_id: CourseId,
    api: Arc<A>,
    store: Arc<ProgressStore>,
    settings: SessionSettings,
    modules: Vec<Module>,
    enrollment: Option<EnrolledCourse>,
    state: SessionState,
    inbox_tx: mpsc::UnboundedSender<Inbound>,
    inbox_rx: mpsc::UnboundedReceiver<Inbound>,
    events: mpsc::UnboundedSender<SessionEvent>,
    cancel: CancellationToken,
}

impl<A> std::fmt::Debug for LessonSession<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LessonSession")
            .field("course_id", &self.course_id)
            .field("state", &self.state.status())
            .field("modules", &self.modules.len())
            .finish()
    }
}

impl<A: LearningApi + 'static> LessonSession<A> {
    pub fn new(
        course_id: CourseId,
        api: Arc<A>,
        store: Arc<ProgressStore>,
        settings: SessionSettings,
    ) -> (Self, SessionEvents) {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (events, events_rx) = mpsc::unbounded_channel();

        let session = Self {
            course_id,
            api,
            store,
            settings,
            modules: Vec::new(),
            enrollment: None,
            state: SessionState::Idle,
            inbox_tx,
            inbox_rx,
            events,
            cancel: CancellationToken::new(),
        };

        (session, events_rx)
    }

    pub fn course_id(&self) -> &CourseId {
        &self.course_id
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> crate::player::SessionStatus {
        self.state.status()
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn store(&self) -> &Arc<ProgressStore> {
        &self.store
    }

    /// The enrollment record fetched by [`LessonSession::load_course`].
    pub fn enrollment(&self) -> Option<&EnrolledCourse> {
        self.enrollment.as_ref()
    }

    pub fn course_percentage(&self) -> f64 {
        self.store
            .course_percentage(&self.course_id, self.enrollment.as_ref())
    }

    /// The lesson being played, once its detail is in.
    pub fn active_lesson(&self) -> Option<&Lesson> {
        match &self.state {
            SessionState::Ready { lesson, .. } => Some(lesson),
            _ => None,
        }
    }

    pub fn video(&self) -> Option<&crate::api::VideoSource> {
        match &self.state {
            SessionState::Ready { video, .. } => Some(video),
            _ => None,
        }
    }

    fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons().iter())
    }

    fn find_lesson(&self, lesson_id: &LessonId) -> Option<&Lesson> {
        self.lessons().find(|l| l.id() == lesson_id)
    }

    /// The lesson after the active one, crossing module boundaries.
    pub fn next_lesson(&self) -> Option<&Lesson> {
        let current = self.state.lesson_id()?;
        self.lessons()
            .skip_while(|l| l.id() != current)
            .nth(1)
    }

    fn emit(&self, event: SessionEvent) {
        // nobody listening is fine
        let _ = self.events.send(event);
    }

    fn transition(&mut self, next: SessionState) {
        let (from, to) = (self.state.status(), next.status());
        tracing::debug!(course_id = %self.course_id, ?from, ?to, "session transition");
        self.state = next;
        self.emit(SessionEvent::StateChanged(to));
    }

    /// Fetches modules, course progress and the enrollment record, seeds the
    /// store, then selects the default lesson.
    #[tracing::instrument(skip(self), fields(course_id = %self.course_id))]
    pub async fn load_course(&mut self) -> SessionResult<()> {
        let (modules, progress, enrollment) = tokio::join!(
            self.api.course_modules(&self.course_id),
            self.api.course_progress(&self.course_id),
            self.api.course_details(&self.course_id),
        );

        match enrollment {
            Ok(course) => self.enrollment = Some(course),
            Err(e) => tracing::warn!("enrollment fetch failed, no percentage fallback: {e}"),
        }

        match progress {
            Ok(snapshot) => self.apply_course_progress(snapshot),
            Err(e) => self.course_progress_failed(e),
        }

        let modules = modules.inspect_err(log_error)?;
        self.set_modules(modules);
        Ok(())
    }

    /// Replaces the course outline. When nothing is selected yet this picks
    /// the first lesson of the first module that has one.
    pub fn set_modules(&mut self, modules: Vec<Module>) {
        self.modules = modules;
        let lessons = self.lessons().count();
        self.emit(SessionEvent::CourseLoaded {
            course_id: self.course_id.clone(),
            lessons,
        });

        if !matches!(self.state, SessionState::Idle | SessionState::NoContent) {
            return;
        }

        let first = self.lessons().next().cloned();
        match first {
            Some(lesson) => self.begin_load(lesson),
            None => self.transition(SessionState::NoContent),
        }
    }

    /// Selects `lesson_id`. Re-selecting the current lesson does nothing;
    /// selecting another one flushes the abandoned position first.
    #[tracing::instrument(skip(self), fields(course_id = %self.course_id))]
    pub fn select_lesson(&mut self, lesson_id: &LessonId) -> SessionResult<()> {
        if self.state.lesson_id() == Some(lesson_id) {
            tracing::debug!(%lesson_id, "already active");
            return Ok(());
        }

        let lesson = self
            .find_lesson(lesson_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownLesson(lesson_id.clone()))?;

        if let Some(from) = self.state.lesson_id().cloned() {
            self.flush_abandoned();
            self.transition(SessionState::Switching {
                from,
                to: lesson_id.clone(),
            });
        }

        self.begin_load(lesson);
        Ok(())
    }

    /// Moves to the next lesson, or to `Idle` after the last one.
    pub fn advance(&mut self) -> SessionResult<Option<LessonId>> {
        match self.next_lesson().map(|l| l.id().clone()) {
            Some(next) => {
                self.select_lesson(&next)?;
                Ok(Some(next))
            }
            None => {
                self.flush_abandoned();
                self.transition(SessionState::Idle);
                Ok(None)
            }
        }
    }

    /// Re-issues a lesson detail fetch that failed.
    pub fn retry_detail(&mut self) -> SessionResult<()> {
        let SessionState::DetailLoading {
            lesson_id,
            error: Some(_),
            ..
        } = &self.state
        else {
            return Err(SessionError::NothingToRetry);
        };

        let lesson_id = lesson_id.clone();
        let load_id = Uuid::new_v4();
        self.transition(SessionState::DetailLoading {
            lesson_id: lesson_id.clone(),
            load_id,
            error: None,
        });
        self.spawn_detail(lesson_id, load_id);
        Ok(())
    }

    fn begin_load(&mut self, lesson: Lesson) {
        self.transition(SessionState::Selecting {
            lesson_id: lesson.id().clone(),
        });

        let load_id = Uuid::new_v4();
        if lesson.has_video() {
            let saved = self.store.lesson_progress(lesson.id());
            self.enter_ready(lesson, saved, load_id);
            return;
        }

        let lesson_id = lesson.id().clone();
        self.transition(SessionState::DetailLoading {
            lesson_id: lesson_id.clone(),
            load_id,
            error: None,
        });
        self.spawn_detail(lesson_id, load_id);
    }

    fn enter_ready(&mut self, lesson: Lesson, saved: Option<ProgressRecord>, load_id: Uuid) {
        let duration = lesson.duration_sec();
        // finished lessons replay from the start
        let resume_from = saved
            .filter(|p| !p.completed())
            .map(|p| p.last_position())
            .map(|p| if duration > 0 { p.min(duration) } else { p })
            .unwrap_or(0);

        let video = resolve_video(lesson.video_reference(), self.settings.storage_base());
        if !video.is_available() {
            tracing::warn!(lesson_id = %lesson.id(), "lesson has no playable video");
        }

        let phase = if resume_from > 0 {
            PlaybackPhase::Resuming {
                position: resume_from,
            }
        } else {
            PlaybackPhase::Playing
        };

        let tracker = PlaybackTracker::new(self.settings.checkpoint_interval(), duration, resume_from);
        self.transition(SessionState::Ready {
            lesson,
            load_id,
            video,
            phase,
            tracker,
        });
    }

    /// The player loaded metadata for the current lesson. Returns the
    /// position to seek to the first time per lesson load, `None` afterwards.
    pub fn on_loaded_metadata(&mut self) -> Option<u64> {
        let SessionState::Ready { phase, .. } = &mut self.state else {
            return None;
        };

        let PlaybackPhase::Resuming { position } = *phase else {
            return None;
        };

        *phase = PlaybackPhase::Playing;
        tracing::debug!(position, "resuming playback");
        self.emit(SessionEvent::StateChanged(self.state.status()));
        Some(position)
    }

    /// Time-update sample from the player.
    pub fn on_time_update(&mut self, current_time: f64, total_duration: f64) {
        let SessionState::Ready {
            lesson,
            load_id,
            phase: PlaybackPhase::Playing,
            tracker,
            ..
        } = &mut self.state
        else {
            // samples before the resume seek would report the wrong position
            return;
        };

        let Some(flush) = tracker.on_time_update(current_time, total_duration) else {
            return;
        };

        let (lesson_id, load_id, duration) = (lesson.id().clone(), *load_id, tracker.duration());
        self.record_checkpoint(&lesson_id, flush, duration);
        self.spawn_flush(lesson_id, load_id, flush, false);
    }

    /// The video played to its end.
    pub fn on_ended(&mut self) {
        let SessionState::Ready {
            lesson,
            load_id,
            tracker,
            ..
        } = &mut self.state
        else {
            return;
        };

        let flush = tracker.on_ended();
        let (lesson_id, load_id) = (lesson.id().clone(), *load_id);

        self.store
            .upsert_lesson_progress(lesson_id.clone(), ProgressRecord::completed_at(flush.position));
        self.emit(SessionEvent::LessonCompleted {
            lesson_id: lesson_id.clone(),
        });
        self.spawn_flush(lesson_id, load_id, flush, true);
    }

    /// Stops background fetches and flushes what is left. Flushes already in
    /// flight are allowed to finish.
    pub fn shutdown(&mut self) {
        self.flush_abandoned();
        self.cancel.cancel();
        self.transition(SessionState::Idle);
    }

    fn flush_abandoned(&mut self) {
        let SessionState::Ready {
            lesson,
            load_id,
            tracker,
            ..
        } = &mut self.state
        else {
            return;
        };

        let Some(flush) = tracker.take_pending() else {
            return;
        };

        let (lesson_id, load_id, duration) = (lesson.id().clone(), *load_id, tracker.duration());
        tracing::debug!(%lesson_id, position = flush.position, "flushing abandoned lesson");
        self.record_checkpoint(&lesson_id, flush, duration);
        self.spawn_flush(lesson_id, load_id, flush, false);
    }

    fn record_checkpoint(&self, lesson_id: &LessonId, flush: Flush, duration: Option<u64>) {
        let record = self
            .store
            .lesson_progress(lesson_id)
            .unwrap_or_default()
            .checkpoint(flush.position, duration);
        self.store.upsert_lesson_progress(lesson_id.clone(), record);
    }

    fn spawn_detail(&self, lesson_id: LessonId, load_id: Uuid) {
        let api = Arc::clone(&self.api);
        let inbox = self.inbox_tx.clone();
        let cancel = self.cancel.child_token();

        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = api.lesson_detail(&lesson_id) => result,
            };
            let _ = inbox.send(Inbound::Detail {
                lesson_id,
                load_id,
                result,
            });
        });
    }

    fn spawn_flush(&self, lesson_id: LessonId, load_id: Uuid, flush: Flush, refresh_course: bool) {
        let api = Arc::clone(&self.api);
        let inbox = self.inbox_tx.clone();
        let cancel = self.cancel.child_token();
        let course_id = self.course_id.clone();

        tokio::spawn(async move {
            let result = api
                .log_watch_progress(&lesson_id, flush.watch_progress())
                .await;
            let _ = inbox.send(Inbound::Flushed {
                lesson_id,
                load_id,
                flush,
                result,
            });

            if !refresh_course {
                return;
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => return,
                result = api.course_progress(&course_id) => result,
            };
            let _ = inbox.send(Inbound::CourseProgress { result });
        });
    }

    /// Waits for the next background result and applies it. Returns `false`
    /// once the session has been shut down.
    pub async fn process_next(&mut self) -> bool {
        let message = tokio::select! {
            _ = self.cancel.cancelled() => None,
            message = self.inbox_rx.recv() => message,
        };

        match message {
            Some(message) => {
                self.handle(message);
                true
            }
            None => false,
        }
    }

    /// Applies every background result that is already available.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.inbox_rx.try_recv() {
            self.handle(message);
            handled += 1;
        }
        handled
    }

    fn handle(&mut self, message: Inbound) {
        match message {
            Inbound::Detail {
                lesson_id,
                load_id,
                result,
            } => self.apply_detail(lesson_id, load_id, result),
            Inbound::Flushed {
                lesson_id,
                load_id,
                flush,
                result,
            } => self.apply_flush(lesson_id, load_id, flush, result),
            Inbound::CourseProgress { result } => match result {
                Ok(snapshot) => self.apply_course_progress(snapshot),
                Err(e) => self.course_progress_failed(e),
            },
        }
    }

    fn apply_detail(&mut self, lesson_id: LessonId, load_id: Uuid, result: ApiResult<LessonDetail>) {
        let current = matches!(
            &self.state,
            SessionState::DetailLoading { lesson_id: id, load_id: current, .. }
                if *id == lesson_id && *current == load_id
        );

        if !current {
            tracing::debug!(%lesson_id, "discarding stale lesson detail");
            self.emit(SessionEvent::StaleDetailDiscarded { lesson_id });
            return;
        }

        let detail = match result {
            Ok(detail) => detail,
            Err(e) => {
                log_error(&e);
                self.transition(SessionState::DetailLoading {
                    lesson_id: lesson_id.clone(),
                    load_id,
                    error: Some(e.to_string()),
                });
                self.emit(SessionEvent::DetailFailed {
                    lesson_id,
                    error: Arc::new(e),
                });
                return;
            }
        };

        let (fetched, progress) = detail.into_parts();
        let mut lesson = self
            .find_lesson(&lesson_id)
            .cloned()
            .unwrap_or_else(|| fetched.clone());
        lesson.merge_detail(fetched);

        // cache the resolved reference so re-selecting skips the fetch
        if let Some(listed) = self.modules.iter_mut().find_map(|m| m.lesson_mut(&lesson_id)) {
            listed.merge_detail(lesson.clone());
        }

        if let Some(record) = &progress {
            self.store.upsert_lesson_progress(lesson_id.clone(), record.clone());
        }
        let saved = progress.or_else(|| self.store.lesson_progress(&lesson_id));
        self.enter_ready(lesson, saved, load_id);
    }

    fn apply_flush(&mut self, lesson_id: LessonId, load_id: Uuid, flush: Flush, result: ApiResult<()>) {
        let succeeded = result.is_ok();

        match result {
            Ok(()) => self.emit(SessionEvent::CheckpointSaved {
                lesson_id,
                watched_sec: flush.position,
                completed: flush.completed,
            }),
            Err(e) => {
                tracing::warn!(%lesson_id, position = flush.position, "progress flush failed: {e}");
                self.emit(SessionEvent::FlushFailed {
                    lesson_id,
                    watched_sec: flush.position,
                    error: Arc::new(e),
                });
            }
        }

        if let SessionState::Ready {
            load_id: current,
            tracker,
            ..
        } = &mut self.state
        {
            if *current == load_id {
                tracker.acknowledge(flush, succeeded);
            }
        }
    }

    fn apply_course_progress(&mut self, snapshot: CourseProgressSnapshot) {
        self.store.apply_course_snapshot(self.course_id.clone(), snapshot);
        let percentage = self.course_percentage();
        self.emit(SessionEvent::CourseProgressUpdated {
            course_id: self.course_id.clone(),
            percentage,
        });
    }

    fn course_progress_failed(&mut self, error: ApiError) {
        tracing::warn!(course_id = %self.course_id, "course progress fetch failed: {error}");
        self.emit(SessionEvent::CourseProgressFailed {
            course_id: self.course_id.clone(),
            error: Arc::new(error),
        });
    }
}
