//! On-device face detection.
//!
//! Detection runs through a [`ModelHandle`], a cheap cloneable capability that
//! loads its model lazily, at most once, on first use. A failed load is logged
//! once and every later detection reports "no faces"; it is never retried.
//!
//! ## Quick Start
//!
//! ```no_run
//! use smartfill_core::face::ModelHandle;
//!
//! let handle = ModelHandle::process_default(None);
//! let pixels = image::RgbImage::new(300, 200);
//! let faces = handle.detect(&pixels);
//! println!("faces: {}", faces.face_count);
//! ```

mod skin;

pub use skin::{SkinDetectorParams, SkinToneDetector};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use image::RgbImage;
use tracing::{info, warn};

use crate::error::Result;
use crate::model::{FaceBox, FaceDetection};

/// A face detector operating on analysis-resolution RGB pixels.
///
/// Implementations must run fully on-device and be thread-safe.
pub trait FaceModel: Send + Sync {
    /// Bounding boxes of detected faces, in the coordinate space of `pixels`.
    fn detect(&self, pixels: &RgbImage) -> Vec<FaceBox>;
}

type ModelLoader = dyn Fn() -> Result<Arc<dyn FaceModel>> + Send + Sync;

/// Lazily-loaded face model capability.
///
/// Clones share the same load slot, so a model is loaded at most once no
/// matter how many analyzers hold the handle.
#[derive(Clone)]
pub struct ModelHandle {
    /// `None` for handles whose slot is filled at construction.
    loader: Option<Arc<ModelLoader>>,
    slot: Arc<OnceLock<Option<Arc<dyn FaceModel>>>>,
}

impl ModelHandle {
    /// Create a handle that runs `loader` on first use.
    pub fn lazy<F>(loader: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn FaceModel>> + Send + Sync + 'static,
    {
        Self {
            loader: Some(Arc::new(loader)),
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Wrap an already-constructed model.
    pub fn with_model(model: Arc<dyn FaceModel>) -> Self {
        Self::preloaded(Some(model))
    }

    /// A handle whose model is permanently unavailable.
    pub fn unavailable() -> Self {
        Self::preloaded(None)
    }

    fn preloaded(model: Option<Arc<dyn FaceModel>>) -> Self {
        Self {
            loader: None,
            slot: Arc::new(OnceLock::from(model)),
        }
    }

    /// Handle for the built-in skin tone detector.
    pub fn skin_tone(params_path: Option<PathBuf>) -> Self {
        Self::lazy(move || {
            let detector = SkinToneDetector::load(params_path.as_deref())?;
            Ok(Arc::new(detector) as Arc<dyn FaceModel>)
        })
    }

    /// The process-wide built-in detector handle.
    ///
    /// The first caller's `params_path` wins; later calls share that handle.
    pub fn process_default(params_path: Option<&Path>) -> Self {
        static DEFAULT: OnceLock<ModelHandle> = OnceLock::new();
        DEFAULT
            .get_or_init(|| Self::skin_tone(params_path.map(Path::to_path_buf)))
            .clone()
    }

    /// True once a model has loaded successfully. Never triggers a load.
    pub fn ready(&self) -> bool {
        matches!(self.slot.get(), Some(Some(_)))
    }

    /// Run detection, loading the model first if needed.
    pub fn detect(&self, pixels: &RgbImage) -> FaceDetection {
        match self.model() {
            Some(model) => FaceDetection::from_faces(model.detect(pixels)),
            None => FaceDetection::none(),
        }
    }

    fn model(&self) -> Option<&Arc<dyn FaceModel>> {
        self.slot
            .get_or_init(|| match self.loader.as_ref().map(|load| load()) {
                None => None,
                Some(Ok(model)) => {
                    info!("Face detection model loaded");
                    Some(model)
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Face detection model failed to load, faces will be ignored");
                    None
                }
            })
            .as_ref()
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.slot.get() {
            None => "unloaded",
            Some(Some(_)) => "ready",
            Some(None) => "unavailable",
        };
        f.debug_struct("ModelHandle").field("state", &state).finish()
    }
}
