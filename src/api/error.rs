use reqwest::StatusCode;
use thiserror::Error;

use crate::model::ResourceType;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("RequestFailed: {resource_type}. Error: {error}")]
    RequestFailed {
        resource_type: ResourceType,
        error: reqwest::Error,
    },

    #[error("UnexpectedStatus: {resource_type} answered {status}. Message: {message}")]
    UnexpectedStatus {
        resource_type: ResourceType,
        status: StatusCode,
        message: String,
    },

    #[error("MalformedBody: {resource_type}. Error: {error}")]
    MalformedBody {
        resource_type: ResourceType,
        error: serde_json::Error,
    },

    #[error("Unavailable: {resource_type}. Reason: {reason}")]
    Unavailable {
        resource_type: ResourceType,
        reason: String,
    },

    #[error("InvalidUrl: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn request_failed(r#type: ResourceType, error: reqwest::Error) -> Self {
        Self::RequestFailed {
            resource_type: r#type,
            error,
        }
    }

    pub fn unexpected_status<S: Into<String>>(
        r#type: ResourceType,
        status: StatusCode,
        message: S,
    ) -> Self {
        Self::UnexpectedStatus {
            resource_type: r#type,
            status,
            message: message.into(),
        }
    }

    pub fn malformed_body(r#type: ResourceType, error: serde_json::Error) -> Self {
        Self::MalformedBody {
            resource_type: r#type,
            error,
        }
    }

    pub fn unavailable<S: Into<String>>(r#type: ResourceType, reason: S) -> Self {
        Self::Unavailable {
            resource_type: r#type,
            reason: reason.into(),
        }
    }

    pub fn resource_type(&self) -> Option<ResourceType> {
        match self {
            Self::RequestFailed { resource_type, .. }
            | Self::UnexpectedStatus { resource_type, .. }
            | Self::MalformedBody { resource_type, .. }
            | Self::Unavailable { resource_type, .. } => Some(*resource_type),
            Self::InvalidUrl(_) => None,
        }
    }

    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            Self::RequestFailed { error, .. } => error.status(),
            _ => None,
        }
    }

    /// Whether trying again later could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RequestFailed { .. } | Self::Unavailable { .. } => true,
            Self::UnexpectedStatus { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::MalformedBody { .. } | Self::InvalidUrl(_) => false,
        }
    }
}
