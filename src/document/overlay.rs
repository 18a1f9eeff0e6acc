//! In-memory documents
//!
//! A [`VirtualDocument`] stands in for an editor buffer: it holds content
//! and a version, and fires save/destroy notifications when asked to.
//! Dropping one counts as destroying it.

use std::sync::RwLock;

use crate::events::{Callback, Emitter, Subscription};

use super::{parse_module_name, Document, DocumentId};

#[derive(Debug)]
struct Buffer {
    content: String,
    version: u64,
    /// Modified since the last save
    dirty: bool,
}

/// Editor buffer held in memory
#[derive(Debug)]
pub struct VirtualDocument {
    id: DocumentId,
    path: String,
    buffer: RwLock<Buffer>,
    saved: Emitter,
    destroyed: Emitter,
}

impl VirtualDocument {
    /// Creates a new clean document
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: DocumentId::next(),
            path: path.into(),
            buffer: RwLock::new(Buffer {
                content: content.into(),
                version: 0,
                dirty: false,
            }),
            saved: Emitter::new(),
            destroyed: Emitter::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> String {
        self.read(|buffer| buffer.content.clone())
    }

    pub fn version(&self) -> u64 {
        self.read(|buffer| buffer.version)
    }

    pub fn is_dirty(&self) -> bool {
        self.read(|buffer| buffer.dirty)
    }

    /// Replaces the content and bumps the version
    pub fn update(&self, content: impl Into<String>) {
        let mut buffer = self.buffer.write().unwrap_or_else(|e| e.into_inner());
        buffer.content = content.into();
        buffer.version += 1;
        buffer.dirty = true;
    }

    /// Marks the buffer clean and notifies save listeners
    pub fn save(&self) {
        {
            let mut buffer = self.buffer.write().unwrap_or_else(|e| e.into_inner());
            buffer.dirty = false;
        }
        self.saved.emit();
    }

    /// Notifies destroy listeners, then drops every listener
    pub fn destroy(&self) {
        self.destroyed.emit();
        self.saved.clear();
        self.destroyed.clear();
    }

    /// Number of live save subscriptions
    pub fn save_listeners(&self) -> usize {
        self.saved.listener_count()
    }

    fn read<T>(&self, f: impl FnOnce(&Buffer) -> T) -> T {
        let buffer = self.buffer.read().unwrap_or_else(|e| e.into_inner());
        f(&buffer)
    }
}

/// Closing a buffer without an explicit destroy still tells listeners.
impl Drop for VirtualDocument {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl Document for VirtualDocument {
    fn id(&self) -> DocumentId {
        self.id
    }

    async fn module_name(&self) -> String {
        self.read(|buffer| parse_module_name(&buffer.content))
    }

    fn on_save(&self, callback: Callback) -> Subscription {
        self.saved.subscribe(callback)
    }

    fn on_destroy(&self, callback: Callback) -> Subscription {
        self.destroyed.subscribe(callback)
    }
}
