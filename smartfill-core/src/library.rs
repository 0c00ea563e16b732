//! Collaborator interfaces consumed by the engine.
//!
//! The engine never owns photos or the wall layout. It reads them through
//! [`ImageStore`] (metadata and pixel access) and [`ProjectState`] (frames
//! and library membership). Two implementations are provided:
//!
//! - [`DirectoryLibrary`] - photos scanned from a local directory
//! - [`MemoryLibrary`] - in-memory photos, for tests and embedding

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{Result, SmartFillError};
use crate::model::{Frame, ImageMetadata};

/// File extensions picked up by [`DirectoryLibrary::scan`].
const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Transient reference to a photo's encoded bytes.
///
/// Whoever decodes it drops it immediately afterwards.
#[derive(Debug, Clone)]
pub enum ImageRef {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// Pixel quality tier requested from the image store.
///
/// The coordinator only asks for [`QualityTier::Analysis`]. The other tiers
/// exist so host stores with pre-rendered renditions can share one trait.
/// The stores in this module keep a single source per photo and serve it for
/// every tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityTier {
    /// Small preview rendition.
    Thumbnail,
    /// Rendition sized for feature extraction.
    Analysis,
    /// Full-resolution source.
    Original,
}

/// Metadata and pixel access by photo id.
#[async_trait]
pub trait ImageStore: Send + Sync {
    async fn metadata(&self, photo_id: &str) -> Option<ImageMetadata>;

    async fn image_ref(&self, photo_id: &str, tier: QualityTier) -> Result<ImageRef>;
}

/// Wall and library state of the open project.
#[async_trait]
pub trait ProjectState: Send + Sync {
    /// All frames on the wall, locked ones included.
    async fn frames(&self) -> Result<Vec<Frame>>;

    /// Ids of every photo in the project's library.
    async fn photo_ids(&self) -> Result<Vec<String>>;
}

#[derive(Debug, Clone)]
struct DirectoryEntry {
    path: PathBuf,
    metadata: ImageMetadata,
}

/// Photos from a local directory, identified by file name.
#[derive(Debug, Clone, Default)]
pub struct DirectoryLibrary {
    root: PathBuf,
    photos: BTreeMap<String, DirectoryEntry>,
    frames: Vec<Frame>,
}

impl DirectoryLibrary {
    /// Scan `root` (non-recursively) for supported images.
    ///
    /// Files whose headers cannot be read are skipped with a warning.
    pub fn scan(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let entries = std::fs::read_dir(&root).map_err(|e| {
            SmartFillError::Library(format!("Failed to read directory {}: {e}", root.display()))
        })?;

        let mut photos = BTreeMap::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() || !is_supported(&path) {
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()).map(str::to_owned) else {
                continue;
            };

            match image::image_dimensions(&path) {
                Ok((width, height)) => {
                    debug!(photo_id = %name, width, height, "Found photo");
                    let metadata = ImageMetadata::new(name.clone(), width, height);
                    photos.insert(name, DirectoryEntry { path, metadata });
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable image"),
            }
        }

        info!(root = %root.display(), photos = photos.len(), "Scanned photo directory");
        Ok(Self {
            root,
            photos,
            frames: Vec::new(),
        })
    }

    /// Attach the wall frames this library is planned against.
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn photo_id_list(&self) -> Vec<String> {
        self.photos.keys().cloned().collect()
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[async_trait]
impl ImageStore for DirectoryLibrary {
    async fn metadata(&self, photo_id: &str) -> Option<ImageMetadata> {
        self.photos.get(photo_id).map(|e| e.metadata.clone())
    }

    async fn image_ref(&self, photo_id: &str, _tier: QualityTier) -> Result<ImageRef> {
        self.photos
            .get(photo_id)
            .map(|e| ImageRef::Path(e.path.clone()))
            .ok_or_else(|| SmartFillError::Library(format!("Unknown photo: {photo_id}")))
    }
}

#[async_trait]
impl ProjectState for DirectoryLibrary {
    async fn frames(&self) -> Result<Vec<Frame>> {
        Ok(self.frames.clone())
    }

    async fn photo_ids(&self) -> Result<Vec<String>> {
        Ok(self.photo_id_list())
    }
}

#[derive(Debug, Clone)]
struct MemoryPhoto {
    metadata: ImageMetadata,
    bytes: Arc<[u8]>,
}

/// Mutable in-memory library and wall.
#[derive(Debug, Default)]
pub struct MemoryLibrary {
    photos: RwLock<HashMap<String, MemoryPhoto>>,
    order: RwLock<Vec<String>>,
    frames: RwLock<Vec<Frame>>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a photo with its encoded bytes.
    pub fn add_photo(&self, photo_id: impl Into<String>, metadata: ImageMetadata, bytes: Vec<u8>) {
        let photo_id = photo_id.into();
        let mut photos = self.photos.write().unwrap_or_else(|e| e.into_inner());
        let replaced = photos
            .insert(
                photo_id.clone(),
                MemoryPhoto {
                    metadata,
                    bytes: bytes.into(),
                },
            )
            .is_some();
        if !replaced {
            self.order
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .push(photo_id);
        }
    }

    pub fn set_frames(&self, frames: Vec<Frame>) {
        *self.frames.write().unwrap_or_else(|e| e.into_inner()) = frames;
    }
}

#[async_trait]
impl ImageStore for MemoryLibrary {
    async fn metadata(&self, photo_id: &str) -> Option<ImageMetadata> {
        let photos = self.photos.read().unwrap_or_else(|e| e.into_inner());
        photos.get(photo_id).map(|p| p.metadata.clone())
    }

    async fn image_ref(&self, photo_id: &str, _tier: QualityTier) -> Result<ImageRef> {
        let photos = self.photos.read().unwrap_or_else(|e| e.into_inner());
        photos
            .get(photo_id)
            .map(|p| ImageRef::Bytes(p.bytes.clone()))
            .ok_or_else(|| SmartFillError::Library(format!("Unknown photo: {photo_id}")))
    }
}

#[async_trait]
impl ProjectState for MemoryLibrary {
    async fn frames(&self) -> Result<Vec<Frame>> {
        Ok(self.frames.read().unwrap_or_else(|e| e.into_inner()).clone())
    }

    async fn photo_ids(&self) -> Result<Vec<String>> {
        Ok(self.order.read().unwrap_or_else(|e| e.into_inner()).clone())
    }
}
