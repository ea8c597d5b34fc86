use crate::validate::validate_new_video;
use crate::{CoreError, ListOptions, NewVideo, Video, VideoKey, VideoRepository};

/// Application service orchestrating adding, editing and listing videos.
///
/// Every write runs validation and id extraction first and only then hands
/// the record to the repository, so an invalid URL never reaches storage.
/// Uniqueness of `video_id` is left to the repository, which can enforce it
/// atomically.
pub struct VideoService<R: VideoRepository> {
    repo: R,
}

impl<R: VideoRepository> VideoService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Add a new video. The stored `video_id` is always derived from `url`.
    pub fn save(&self, input: NewVideo) -> Result<Video, CoreError> {
        let draft = validate_new_video(input)?;
        self.repo.insert(draft)
    }

    /// Replace an existing video's fields, re-deriving its `video_id`.
    pub fn update(&self, id: VideoKey, input: NewVideo) -> Result<Video, CoreError> {
        if self.repo.get(id)?.is_none() {
            return Err(CoreError::NotFound);
        }
        let video = validate_new_video(input)?.into_video(id);
        self.repo.update(&video)?;
        Ok(video)
    }

    /// List videos by case-insensitive name, optionally filtered by a search
    /// term. A missing or blank term lists everything.
    pub fn list(&self, search_term: Option<&str>) -> Result<Vec<Video>, CoreError> {
        self.repo.list(&ListOptions::from_term(search_term))
    }

    /// Fetch one video by key.
    pub fn get(&self, id: VideoKey) -> Result<Video, CoreError> {
        self.repo.get(id)?.ok_or(CoreError::NotFound)
    }

    pub fn count(&self) -> Result<usize, CoreError> {
        self.repo.count()
    }
}
