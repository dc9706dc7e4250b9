//! Per-import mutable state.

use std::collections::HashMap;

use crate::graph::ObjectId;
use crate::progress::Progress;
use crate::texture::TextureTracker;

/// Everything that changes while one map (or model) is being imported.
///
/// A fresh session is created for every import, so nothing leaks between
/// runs on the same [`Importer`](crate::Importer).
#[derive(Debug)]
pub struct ImportSession {
    pub progress: Progress,
    pub textures: TextureTracker,
    /// First object created; receives the root correction
    pub root: Option<ObjectId>,
    /// Scene index to created object
    objects: HashMap<u32, ObjectId>,
}

impl ImportSession {
    pub fn new(node_count: usize) -> Self {
        Self {
            progress: Progress::new(node_count),
            textures: TextureTracker::new(),
            root: None,
            objects: HashMap::with_capacity(node_count),
        }
    }

    /// Record the object created for scene node `index`.
    pub fn record(&mut self, index: u32, object: ObjectId) {
        self.root.get_or_insert(object);
        self.objects.insert(index, object);
    }

    pub fn object_for(&self, index: u32) -> Option<ObjectId> {
        self.objects.get(&index).copied()
    }

    pub fn is_visited(&self, index: u32) -> bool {
        self.objects.contains_key(&index)
    }

    pub fn visited_count(&self) -> usize {
        self.objects.len()
    }
}
