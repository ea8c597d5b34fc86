//! Domain library for the video collection.
//!
//! Holds the domain types, the repository port, and the error taxonomy. Keep
//! adapters and IO concerns out of this crate: HTTP lives in `api-server`,
//! SQL lives in `sqlite-adapter`.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Maximum length of a video name, in characters.
pub const MAX_NAME_CHARS: usize = 200;
/// Maximum length of a raw video URL, in characters.
pub const MAX_URL_CHARS: usize = 400;
/// Number of note characters shown by `Video`'s `Display` impl.
const NOTES_PREVIEW_CHARS: usize = 200;

/// Canonical identifier taken from the `v` parameter of a watch URL.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VideoId(String);

impl VideoId {
    pub fn new<S: Into<String>>(s: S) -> Result<Self, CoreError> {
        let val = s.into();
        if val.is_empty() {
            return Err(CoreError::InvalidInput("video id is empty".into()));
        }
        Ok(Self(val))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for VideoId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Surrogate key assigned by the repository when a video is first stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VideoKey(i64);

impl VideoKey {
    pub fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Display for VideoKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VideoKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(VideoKey)
            .map_err(|_| CoreError::InvalidInput(format!("bad video key: {s}")))
    }
}

/// Caller input for adding or editing a video.
///
/// Has no `video_id` field: the id is always derived from `url`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVideo {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewVideo {
    pub fn new(name: impl Into<String>, url: impl Into<String>, notes: Option<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            notes,
        }
    }
}

/// A validated record ready to be inserted; the key is assigned by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VideoDraft {
    pub name: String,
    pub url: String,
    pub notes: Option<String>,
    pub video_id: VideoId,
}

impl VideoDraft {
    /// Attach a freshly assigned key.
    pub fn into_video(self, id: VideoKey) -> Video {
        Video {
            id,
            name: self.name,
            url: self.url,
            notes: self.notes,
            video_id: self.video_id,
        }
    }
}

/// Stored video entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Video {
    pub id: VideoKey,
    pub name: String,
    /// Raw link as the user entered it.
    pub url: String,
    pub notes: Option<String>,
    pub video_id: VideoId,
}

impl Display for Video {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let notes: String = self
            .notes
            .as_deref()
            .unwrap_or("")
            .chars()
            .take(NOTES_PREVIEW_CHARS)
            .collect();
        write!(
            f,
            "ID: {}, Name: {}, URL: {}, Video ID: {}, Notes: {}",
            self.id, self.name, self.url, self.video_id, notes
        )
    }
}

/// Filter for list queries. `search` is already trimmed and non-blank.
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    pub search: Option<String>,
}

impl ListOptions {
    /// Build options from raw user input; blank terms mean "everything".
    pub fn from_term(term: Option<&str>) -> Self {
        let search = term
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        Self { search }
    }
}

/// Case folding used for both name search and name ordering.
///
/// Adapters must route through this so every backend agrees on matching and
/// ordering.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Whether `name` contains `term`, ignoring case.
pub fn name_matches(name: &str, term: &str) -> bool {
    fold_name(name).contains(&fold_name(term))
}

/// Repository port for persisting and loading videos.
///
/// Implementations enforce uniqueness of `video_id` atomically: of two
/// concurrent inserts with the same id exactly one succeeds and the other
/// returns `CoreError::DuplicateVideo`.
pub trait VideoRepository: Send + Sync {
    /// Store a new video and return it with its assigned key.
    fn insert(&self, draft: VideoDraft) -> Result<Video, CoreError>;
    /// Overwrite an existing video (matched by key).
    fn update(&self, video: &Video) -> Result<(), CoreError>;
    fn get(&self, id: VideoKey) -> Result<Option<Video>, CoreError>;
    /// Videos whose name matches `options.search`, ordered by folded name with
    /// ties kept in insertion (key) order.
    fn list(&self, options: &ListOptions) -> Result<Vec<Video>, CoreError>;
    fn count(&self) -> Result<usize, CoreError>;
}

/// The validation step that rejected a URL.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UrlRejection {
    Unparseable,
    Scheme,
    Host,
    Path,
    EmptyQuery,
    MalformedQuery,
    MissingVideoParam,
}

impl UrlRejection {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrlRejection::Unparseable => "not a parseable url",
            UrlRejection::Scheme => "scheme must be https",
            UrlRejection::Host => "host must be www.youtube.com",
            UrlRejection::Path => "path must be /watch",
            UrlRejection::EmptyQuery => "missing query string",
            UrlRejection::MalformedQuery => "query string is not key=value pairs",
            UrlRejection::MissingVideoParam => "missing parameters",
        }
    }
}

impl Display for UrlRejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core domain errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Invalid YouTube URL {url}: {reason}")]
    InvalidUrl { url: String, reason: UrlRejection },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("video already added: {0}")]
    DuplicateVideo(String),
    #[error("not found")]
    NotFound,
    #[error("repository error: {0}")]
    Repository(String),
}

/// Return a short about/version line for the binary to print.
pub fn about() -> String {
    let pkg = env!("CARGO_PKG_NAME");
    let ver = env!("CARGO_PKG_VERSION");
    format!("{} v{} - video collection domain loaded", pkg, ver)
}

pub mod adapters;
pub mod service;
pub mod validate;
