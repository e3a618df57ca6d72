//! Preview handles for locally picked photos.
//!
//! A photo picked on the capture side lives in a private temporary file until
//! it is uploaded or discarded. The session tracks every handle it hands out
//! and releases the file when the photo is removed from its list; dropping
//! the session releases whatever is left.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{Photo, PhotoSource};

#[derive(Debug)]
pub struct PreviewSession {
    dir: TempDir,
    handles: HashMap<String, PathBuf>,
}

impl PreviewSession {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("puwer-preview-").tempdir()?;
        Ok(Self {
            dir,
            handles: HashMap::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Write a picked photo to a preview file and return a photo pointing
    /// at it.
    pub fn attach(&mut self, bytes: &[u8], name: &str, mime_type: &str) -> io::Result<Photo> {
        let id = Uuid::new_v4().to_string();
        let path = self
            .dir
            .path()
            .join(format!("{}.{}", id, extension_for(mime_type)));
        std::fs::write(&path, bytes)?;
        self.handles.insert(id.clone(), path.clone());
        debug!(photo_id = %id, bytes = bytes.len(), "preview handle created");

        Ok(Photo {
            id,
            source: PhotoSource::Local { path },
            name: name.to_string(),
            mime_type: mime_type.to_string(),
            size: bytes.len() as u64,
            timestamp: Utc::now(),
        })
    }

    /// Remove a photo from its owning list and release its preview handle.
    pub fn remove(&mut self, photos: &mut Vec<Photo>, photo_id: &str) -> Option<Photo> {
        let index = photos.iter().position(|p| p.id == photo_id)?;
        let photo = photos.remove(index);
        self.release(photo_id);
        Some(photo)
    }

    /// Release one handle. Returns whether the session owned it.
    pub fn release(&mut self, photo_id: &str) -> bool {
        let Some(path) = self.handles.remove(photo_id) else {
            return false;
        };
        if let Err(e) = std::fs::remove_file(&path) {
            warn!(photo_id, path = %path.display(), error = %e, "failed to release preview handle");
        }
        true
    }

    /// Number of handles not yet released.
    pub fn outstanding(&self) -> usize {
        self.handles.len()
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            debug!(count = self.handles.len(), "releasing preview handles at session end");
        }
        let ids: Vec<String> = self.handles.keys().cloned().collect();
        for id in ids {
            self.release(&id);
        }
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        _ => "bin",
    }
}
