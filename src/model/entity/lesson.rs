use serde::{Deserialize, Serialize};

use crate::model::{LessonId, wire};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    #[serde(alias = "_id")]
    id: LessonId,
    #[serde(default)]
    title: String,
    #[serde(
        default,
        alias = "order",
        alias = "position",
        deserialize_with = "wire::seconds"
    )]
    order_index: u64,
    #[serde(default, alias = "duration", deserialize_with = "wire::seconds")]
    duration_sec: u64,
    #[serde(
        default,
        alias = "video",
        alias = "videoKey",
        skip_serializing_if = "Option::is_none"
    )]
    video_url: Option<String>,
}

impl Lesson {
    pub fn new<S: Into<String>>(id: LessonId, title: S, order_index: u64, duration_sec: u64) -> Self {
        Self {
            id,
            title: title.into(),
            order_index,
            duration_sec,
            video_url: None,
        }
    }

    pub fn with_video<S: Into<String>>(mut self, video: S) -> Self {
        self.video_url = Some(video.into());
        self
    }

    pub fn id(&self) -> &LessonId {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn order_index(&self) -> u64 {
        self.order_index
    }

    pub fn duration_sec(&self) -> u64 {
        self.duration_sec
    }

    /// The raw video reference: either an absolute url or a storage key.
    pub fn video_reference(&self) -> Option<&str> {
        self.video_url
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    pub fn has_video(&self) -> bool {
        self.video_reference().is_some()
    }

    /// Folds a freshly fetched copy of the same lesson into this one. Fields
    /// the detail leaves empty keep what the module listing already had.
    pub fn merge_detail(&mut self, detail: Lesson) {
        let has_video = detail.has_video();
        if !detail.title.is_empty() {
            self.title = detail.title;
        }
        if detail.duration_sec > 0 {
            self.duration_sec = detail.duration_sec;
        }
        if has_video {
            self.video_url = detail.video_url;
        }
    }
}
