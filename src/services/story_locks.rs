use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;

/// Per-story mutual exclusion for structural graph edits.
///
/// The story is the lock granularity: two concurrent mutations of the same
/// story serialize here, while edits to different stories proceed in
/// parallel. Analytics ingestion never takes these locks; the counter
/// increment is atomic at the row level.
#[derive(Clone, Default)]
pub struct StoryLocks {
    locks: Arc<DashMap<i32, Arc<Mutex<()>>>>,
}

impl StoryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for one story, created on first use.
    pub fn for_story(&self, story_id: i32) -> Arc<Mutex<()>> {
        self.locks
            .entry(story_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
