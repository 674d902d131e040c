use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::{
    Config,
    api::{ApiError, ApiResult, LearningApi},
    error::AppResult,
    model::{
        CourseId, LessonId, ResourceType,
        entity::{CourseProgressSnapshot, EnrolledCourse, LessonDetail, Module, WatchProgress},
        normalize,
    },
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest` implementation of [`LearningApi`]. Cloning is cheap, the
/// underlying client is reference counted.
#[derive(Debug, Clone)]
pub struct HttpLearningApi {
    client: Client,
    base_url: Url,
    bearer: Option<String>,
}

impl HttpLearningApi {
    pub fn new(base_url: Url) -> ApiResult<Self> {
        Self::with_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// `timeout` bounds each whole request, so a stalled call still ends in
    /// an error the session can settle.
    pub fn with_timeout(base_url: Url, timeout: Duration) -> ApiResult<Self> {
        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::request_failed(ResourceType::Course, e))?;

        Ok(Self {
            client,
            base_url,
            bearer: None,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        let api = config.api();
        Ok(Self::with_timeout(api.base_url()?, api.request_timeout())?)
    }

    /// Session token issued by the portal's auth flow.
    pub fn with_bearer_token<S: Into<String>>(mut self, token: S) -> Self {
        self.bearer = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get(&self, r#type: ResourceType, segments: &[&str]) -> ApiResult<Value> {
        let url = self.endpoint(segments)?;
        tracing::trace!("GET {url}");

        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| ApiError::request_failed(r#type, e))?;

        Self::read_data(r#type, response).await
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        r#type: ResourceType,
        segments: &[&str],
        body: &B,
    ) -> ApiResult<Value> {
        let url = self.endpoint(segments)?;
        tracing::trace!("POST {url}");

        let response = self
            .authorize(self.client.post(url).json(body))
            .send()
            .await
            .map_err(|e| ApiError::request_failed(r#type, e))?;

        Self::read_data(r#type, response).await
    }

    /// Checks the status and returns the unwrapped `data` of the body. Error
    /// bodies carry a human readable `message`.
    async fn read_data(r#type: ResourceType, response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::request_failed(r#type, e))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(String::from))
                .unwrap_or_else(|| String::from_utf8_lossy(&bytes).into_owned());
            return Err(ApiError::unexpected_status(r#type, status, message));
        }

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        let body: Value =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::malformed_body(r#type, e))?;
        Ok(normalize::unwrap_envelope(body))
    }
}

#[async_trait::async_trait]
impl LearningApi for HttpLearningApi {
    #[tracing::instrument(skip(self))]
    async fn lesson_detail(&self, lesson_id: &LessonId) -> ApiResult<LessonDetail> {
        let data = self
            .get(ResourceType::Lesson, &["student", "lessons", lesson_id.as_str()])
            .await?;
        normalize::lesson_detail(data).map_err(|e| ApiError::malformed_body(ResourceType::Lesson, e))
    }

    #[tracing::instrument(skip(self))]
    async fn log_watch_progress(
        &self,
        lesson_id: &LessonId,
        progress: WatchProgress,
    ) -> ApiResult<()> {
        self.post(
            ResourceType::LessonProgress,
            &["student", "lessons", lesson_id.as_str(), "progress"],
            &progress,
        )
        .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn course_progress(&self, course_id: &CourseId) -> ApiResult<CourseProgressSnapshot> {
        let data = self
            .get(
                ResourceType::CourseProgress,
                &["student", "courses", course_id.as_str(), "progress"],
            )
            .await?;
        Ok(normalize::course_progress(data))
    }

    #[tracing::instrument(skip(self))]
    async fn course_modules(&self, course_id: &CourseId) -> ApiResult<Vec<Module>> {
        let data = self
            .get(
                ResourceType::Module,
                &["student", "courses", course_id.as_str(), "modules"],
            )
            .await?;
        Ok(normalize::modules(data))
    }

    #[tracing::instrument(skip(self))]
    async fn enrolled_courses(&self) -> ApiResult<Vec<EnrolledCourse>> {
        let data = self.get(ResourceType::Course, &["student", "courses"]).await?;
        Ok(normalize::courses(data))
    }

    #[tracing::instrument(skip(self))]
    async fn course_details(&self, course_id: &CourseId) -> ApiResult<EnrolledCourse> {
        let data = self
            .get(ResourceType::Course, &["student", "courses", course_id.as_str()])
            .await?;
        normalize::course(data).map_err(|e| ApiError::malformed_body(ResourceType::Course, e))
    }
}
