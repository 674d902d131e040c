use std::sync::Arc;

use crate::{
    api::{HttpLearningApi, LearningApi},
    error::AppResult,
    model::CourseId,
    player::{LessonSession, SessionEvents, SessionSettings},
    progress::ProgressStore,
};

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod api;
pub mod error;
pub mod model;
pub mod player;
pub mod progress;

static APPLICATION_NAME: &str = "lesson-tracker";

/// Builds a session for `course_id` talking to the backend named in the
/// config file. `use_local` prefers `./config.toml` over the user config dir.
#[tracing::instrument(skip(store))]
pub async fn build_session(
    course_id: CourseId,
    store: Arc<ProgressStore>,
    use_local: bool,
) -> AppResult<(LessonSession<HttpLearningApi>, SessionEvents)> {
    let config = Config::get_or_init(use_local).await?;
    let api = Arc::new(HttpLearningApi::from_config(config)?);
    build_session_with_api(course_id, api, store, config)
}

pub fn build_session_with_api<A: LearningApi + 'static>(
    course_id: CourseId,
    api: Arc<A>,
    store: Arc<ProgressStore>,
    config: &Config,
) -> AppResult<(LessonSession<A>, SessionEvents)> {
    let settings = SessionSettings::from_config(config)?;
    Ok(LessonSession::new(course_id, api, store, settings))
}

/// Installs the global subscriber. Reads `RUST_LOG` from the environment
/// or a `.env` file. Calling it twice is harmless.
pub fn init_tracing() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    let installed = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .try_init();

    if installed.is_ok() {
        tracing::debug!("tracing initialized.");
    }
}
