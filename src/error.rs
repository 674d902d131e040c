use thiserror::Error;
use tracing::error;
use tracing_error::SpanTrace;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
    #[error("api error: {0}")]
    ApiError(#[from] crate::api::ApiError),
    #[error("session error: {0}")]
    SessionError(#[from] crate::player::SessionError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

pub fn log_error<E: std::error::Error + std::fmt::Display>(error: &E) {
    let span = SpanTrace::capture();
    error!("{}\n{}", error, span);
}
