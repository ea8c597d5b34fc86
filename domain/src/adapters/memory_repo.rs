use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{
    fold_name, name_matches, CoreError, ListOptions, Video, VideoDraft, VideoKey, VideoRepository,
};

/// Simple in-memory repository for tests and the demo binary. A single mutex
/// guards the map and the key counter, so the duplicate check and the insert
/// happen as one step.
pub struct InMemoryRepo {
    inner: Mutex<Inner>,
}

struct Inner {
    videos: BTreeMap<VideoKey, Video>,
    next_key: i64,
}

impl Inner {
    fn conflicting(&self, candidate: &Video) -> bool {
        self.videos
            .values()
            .any(|v| v.id != candidate.id && v.video_id == candidate.video_id)
    }
}

impl InMemoryRepo {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                videos: BTreeMap::new(),
                next_key: 1,
            }),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>, CoreError> {
        self.inner
            .lock()
            .map_err(|_| CoreError::Repository("mutex poisoned".into()))
    }
}

impl Default for InMemoryRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoRepository for InMemoryRepo {
    fn insert(&self, draft: VideoDraft) -> Result<Video, CoreError> {
        let mut inner = self.lock()?;
        let video = draft.into_video(VideoKey::new(inner.next_key));
        if inner.conflicting(&video) {
            return Err(CoreError::DuplicateVideo(video.video_id.as_str().to_string()));
        }
        inner.next_key += 1;
        inner.videos.insert(video.id, video.clone());
        Ok(video)
    }

    fn update(&self, video: &Video) -> Result<(), CoreError> {
        let mut inner = self.lock()?;
        if !inner.videos.contains_key(&video.id) {
            return Err(CoreError::NotFound);
        }
        if inner.conflicting(video) {
            return Err(CoreError::DuplicateVideo(video.video_id.as_str().to_string()));
        }
        inner.videos.insert(video.id, video.clone());
        Ok(())
    }

    fn get(&self, id: VideoKey) -> Result<Option<Video>, CoreError> {
        Ok(self.lock()?.videos.get(&id).cloned())
    }

    fn list(&self, options: &ListOptions) -> Result<Vec<Video>, CoreError> {
        let inner = self.lock()?;
        // BTreeMap iterates in key order, so the stable sort keeps ties in insertion order
        let mut out: Vec<Video> = inner
            .videos
            .values()
            .filter(|v| match options.search.as_deref() {
                Some(term) => name_matches(&v.name, term),
                None => true,
            })
            .cloned()
            .collect();
        out.sort_by_cached_key(|v| fold_name(&v.name));
        Ok(out)
    }

    fn count(&self) -> Result<usize, CoreError> {
        Ok(self.lock()?.videos.len())
    }
}
