use url::Url;

/// What the player should show for a lesson's video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    Stream(Url),
    /// No usable reference. Distinct from "still loading".
    Unavailable,
}

impl VideoSource {
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Stream(url) => Some(url),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Stream(_))
    }
}

/// Absolute http(s) references are used as is; anything else is a storage
/// key under `storage_base`.
pub fn resolve_video(reference: Option<&str>, storage_base: &Url) -> VideoSource {
    let Some(reference) = reference.map(str::trim).filter(|r| !r.is_empty()) else {
        return VideoSource::Unavailable;
    };

    if let Ok(url) = Url::parse(reference) {
        if matches!(url.scheme(), "http" | "https") {
            return VideoSource::Stream(url);
        }
    }

    // "./" keeps a key like `video:intro.mp4` from parsing as its own scheme
    let key = format!("./{}", reference.trim_start_matches('/'));
    match storage_base.join(&key) {
        Ok(url) => VideoSource::Stream(url),
        Err(e) => {
            tracing::warn!("unable to resolve video key `{reference}`: {e}");
            VideoSource::Unavailable
        }
    }
}
