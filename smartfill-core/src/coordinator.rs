//! Smart Fill coordinator.
//!
//! Owns the analysis worker and the batch tracker, and exposes the engine's
//! public operations. Analysis is fire-and-forget: suggestion and solution
//! requests score against whatever analysis is cached at that moment and
//! never wait for pending work.
//!
//! ```no_run
//! use std::sync::Arc;
//! use smartfill_core::{DirectoryLibrary, Frame, ScoringOptions, SmartFillCoordinator};
//!
//! # async fn example() -> smartfill_core::Result<()> {
//! let library = Arc::new(
//!     DirectoryLibrary::scan("photos")?.with_frames(vec![Frame::new("hall-1", 4.0, 6.0)]),
//! );
//! let coordinator = SmartFillCoordinator::for_library(library).build().await?;
//!
//! coordinator.analyze_library(&["beach.jpg".to_string()], false).await?;
//! coordinator.wait_idle().await;
//!
//! let suggestions = coordinator
//!     .get_suggestions_for_frame(&Frame::new("hall-1", 4.0, 6.0), ScoringOptions::default())
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::join_all;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::analysis::PhotoAnalyzer;
use crate::cache::{open_cache, AnalysisCache};
use crate::config::SmartFillConfig;
use crate::error::Result;
use crate::face::ModelHandle;
use crate::library::{ImageStore, ProjectState, QualityTier};
use crate::model::{
    Frame, ImageMetadata, MatchScore, OptimizationSolution, PhotoAnalysis, ScoringOptions,
};
use crate::optimizer::{GalleryOptimizer, PhotoCandidate, RandomSource, ScoreMatrix};
use crate::scoring::score_match;
use crate::tracker::{AnalysisProgress, BatchTracker, Completion};
use crate::worker::{AnalysisWorker, AnalyzePhoto, ResponseKind, WorkerRequest, WorkerResponse};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Builder for [`SmartFillCoordinator`].
pub struct CoordinatorBuilder {
    images: Arc<dyn ImageStore>,
    project: Arc<dyn ProjectState>,
    config: SmartFillConfig,
    cache: Option<Arc<dyn AnalysisCache>>,
    face_model: Option<ModelHandle>,
    random: Option<RandomSource>,
}

impl CoordinatorBuilder {
    pub fn new(images: Arc<dyn ImageStore>, project: Arc<dyn ProjectState>) -> Self {
        Self {
            images,
            project,
            config: SmartFillConfig::default(),
            cache: None,
            face_model: None,
            random: None,
        }
    }

    pub fn with_config(mut self, config: SmartFillConfig) -> Self {
        self.config = config;
        self
    }

    /// Use this cache instead of the one described by the configuration.
    pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use this face model instead of the process-wide built-in detector.
    pub fn with_face_model(mut self, face_model: ModelHandle) -> Self {
        self.face_model = Some(face_model);
        self
    }

    /// Random source for alternative gallery solutions.
    pub fn with_random_source<F>(mut self, source: F) -> Self
    where
        F: FnMut() -> f64 + Send + 'static,
    {
        self.random = Some(Box::new(source));
        self
    }

    /// Start the worker thread and completion handler.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn build(self) -> Result<SmartFillCoordinator> {
        self.config.validate()?;

        let cache = match self.cache {
            Some(cache) => cache,
            None => open_cache(&self.config).await?,
        };
        let face_model = self
            .face_model
            .unwrap_or_else(|| ModelHandle::process_default(self.config.face_model_path.as_deref()));

        let mut optimizer = GalleryOptimizer::new(self.config.candidate_pool);
        if let Some(random) = self.random {
            optimizer = optimizer.with_random_source(random);
        }

        let (response_tx, response_rx) = mpsc::unbounded_channel();
        let worker = AnalysisWorker::spawn(PhotoAnalyzer::new(&self.config, face_model), response_tx)?;

        let tracker = Arc::new(Mutex::new(BatchTracker::new()));
        let (progress_tx, _) = watch::channel(AnalysisProgress::default());
        let progress_tx = Arc::new(progress_tx);

        let completions = tokio::spawn(handle_completions(
            response_rx,
            cache.clone(),
            tracker.clone(),
            progress_tx.clone(),
        ));

        Ok(SmartFillCoordinator {
            config: self.config,
            cache,
            images: self.images,
            project: self.project,
            worker,
            tracker,
            progress_tx,
            optimizer: Mutex::new(optimizer),
            completions,
        })
    }
}

pub struct SmartFillCoordinator {
    config: SmartFillConfig,
    cache: Arc<dyn AnalysisCache>,
    images: Arc<dyn ImageStore>,
    project: Arc<dyn ProjectState>,
    worker: AnalysisWorker,
    tracker: Arc<Mutex<BatchTracker>>,
    progress_tx: Arc<watch::Sender<AnalysisProgress>>,
    optimizer: Mutex<GalleryOptimizer>,
    completions: JoinHandle<()>,
}

impl SmartFillCoordinator {
    pub fn builder(images: Arc<dyn ImageStore>, project: Arc<dyn ProjectState>) -> CoordinatorBuilder {
        CoordinatorBuilder::new(images, project)
    }

    /// Builder for a library that is both the image store and the project.
    pub fn for_library<L>(library: Arc<L>) -> CoordinatorBuilder
    where
        L: ImageStore + ProjectState + 'static,
    {
        CoordinatorBuilder::new(library.clone(), library)
    }

    pub fn config(&self) -> &SmartFillConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn AnalysisCache> {
        &self.cache
    }

    /// Dispatch analysis for every id whose cached record is missing, stale
    /// or lacks face data when `detect_faces` is set.
    ///
    /// Returns the number of requests sent, without waiting for any of them.
    /// Photos already in flight at sufficient depth are not sent again.
    #[instrument(skip(self, photo_ids), fields(photos = photo_ids.len()))]
    pub async fn analyze_library(&self, photo_ids: &[String], detect_faces: bool) -> Result<usize> {
        let cached = self.cache.get_many(photo_ids).await;

        let mut seen = HashSet::new();
        let needed: Vec<&String> = photo_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter(|id| !cached.get(id.as_str()).is_some_and(|a| a.satisfies(detect_faces)))
            .collect();

        if needed.is_empty() {
            debug!("All photos already analyzed");
            return Ok(0);
        }

        let batch = lock(&self.tracker).begin_batch();
        let mut dispatched = 0usize;

        for photo_id in needed {
            if lock(&self.tracker).covers(photo_id, detect_faces) {
                continue;
            }

            let Some(metadata) = self.images.metadata(photo_id).await else {
                warn!(photo_id = %photo_id, "No metadata for photo, skipping analysis");
                continue;
            };
            let image = match self.images.image_ref(photo_id, QualityTier::Analysis).await {
                Ok(image) => image,
                Err(e) => {
                    warn!(photo_id = %photo_id, error = %e, "Photo unavailable, skipping analysis");
                    continue;
                }
            };

            // Another call may have dispatched this photo while we awaited the store.
            let (request_id, generation) = {
                let mut tracker = lock(&self.tracker);
                let registered = tracker.register_unless_covered(&batch, photo_id, detect_faces);
                let Some(id) = registered else {
                    continue;
                };
                (id, tracker.generation())
            };

            let request = WorkerRequest {
                id: request_id,
                generation,
                payload: AnalyzePhoto {
                    image_id: photo_id.clone(),
                    image,
                    width: metadata.width,
                    height: metadata.height,
                    detect_faces,
                },
            };
            if let Err(e) = self.worker.post(request) {
                let mut tracker = lock(&self.tracker);
                tracker.unregister(request_id);
                self.progress_tx.send_replace(tracker.progress());
                return Err(e);
            }
            dispatched += 1;
        }

        let progress = {
            let tracker = lock(&self.tracker);
            let progress = tracker.progress();
            self.progress_tx.send_replace(progress);
            progress
        };
        info!(
            batch = batch.id,
            dispatched,
            pending = progress.pending,
            detect_faces,
            "Dispatched photo analysis"
        );
        Ok(dispatched)
    }

    /// True when every id already has cached analysis of the requested depth.
    /// Reads the cache only; never dispatches.
    pub async fn check_analysis_status(&self, photo_ids: &[String], detect_faces: bool) -> bool {
        let cached = self.cache.get_many(photo_ids).await;
        photo_ids
            .iter()
            .all(|id| cached.get(id).is_some_and(|a| a.satisfies(detect_faces)))
    }

    /// Top suggestions for one frame, best first.
    ///
    /// Kicks off analysis for the library but scores only photos that are
    /// already analyzed.
    #[instrument(skip(self, frame), fields(frame_id = %frame.id))]
    pub async fn get_suggestions_for_frame(
        &self,
        frame: &Frame,
        options: ScoringOptions,
    ) -> Result<Vec<MatchScore>> {
        let photo_ids = self.project.photo_ids().await?;
        self.ensure_analysis(&photo_ids, &options).await;

        let (metadata, analyses) = self.load_inputs(&photo_ids).await;
        let mut scores: Vec<MatchScore> = photo_ids
            .iter()
            .filter_map(|id| {
                let meta = metadata.get(id)?;
                let analysis = analyses.get(id)?;
                Some(score_match(id, meta, analysis, frame, &options))
            })
            .collect();

        scores.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.photo_id.cmp(&b.photo_id))
        });
        scores.dedup_by(|a, b| a.photo_id == b.photo_id);
        scores.truncate(self.config.suggestion_limit);

        debug!(suggestions = scores.len(), "Scored frame suggestions");
        Ok(scores)
    }

    /// Up to `count` distinct whole-wall assignments over unlocked frames.
    #[instrument(skip(self))]
    pub async fn generate_gallery_solutions(
        &self,
        count: usize,
        options: ScoringOptions,
    ) -> Result<Vec<OptimizationSolution>> {
        let frames: Vec<Frame> = self
            .project
            .frames()
            .await?
            .into_iter()
            .filter(|frame| !frame.locked)
            .collect();
        let photo_ids = self.project.photo_ids().await?;
        self.ensure_analysis(&photo_ids, &options).await;

        let (metadata, analyses) = self.load_inputs(&photo_ids).await;
        let candidates: Vec<PhotoCandidate<'_>> = photo_ids
            .iter()
            .filter_map(|id| {
                Some(PhotoCandidate {
                    photo_id: id,
                    metadata: metadata.get(id)?,
                    analysis: analyses.get(id)?,
                })
            })
            .collect();

        let matrix = ScoreMatrix::build(&frames, &candidates, &options);
        let solutions = lock(&self.optimizer).solve(&matrix, count);

        if solutions.is_empty() && !frames.is_empty() {
            info!(
                frames = frames.len(),
                photos = candidates.len(),
                "No usable assignments for the wall"
            );
        }
        Ok(solutions)
    }

    /// Abandon all in-flight analysis. Results that arrive later are dropped.
    pub fn cancel_pending(&self) -> usize {
        let mut tracker = lock(&self.tracker);
        let dropped = tracker.cancel();
        self.progress_tx.send_replace(tracker.progress());
        info!(dropped, generation = tracker.generation(), "Cancelled pending analysis");
        dropped
    }

    pub fn progress(&self) -> AnalysisProgress {
        lock(&self.tracker).progress()
    }

    pub fn subscribe(&self) -> watch::Receiver<AnalysisProgress> {
        self.progress_tx.subscribe()
    }

    /// Wait until no analysis is in flight.
    pub async fn wait_idle(&self) {
        let mut rx = self.progress_tx.subscribe();
        let _ = rx.wait_for(AnalysisProgress::is_idle).await;
    }

    async fn ensure_analysis(&self, photo_ids: &[String], options: &ScoringOptions) {
        if let Err(e) = self.analyze_library(photo_ids, options.target_faces).await {
            warn!(error = %e, "Could not dispatch analysis, scoring cached photos only");
        }
    }

    async fn load_inputs(
        &self,
        photo_ids: &[String],
    ) -> (HashMap<String, ImageMetadata>, HashMap<String, PhotoAnalysis>) {
        let lookups = photo_ids
            .iter()
            .map(|id| async move { (id.clone(), self.images.metadata(id).await) });
        let metadata = join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(id, meta)| meta.map(|m| (id, m)))
            .collect();

        let analyses = self.cache.get_many(photo_ids).await;
        (metadata, analyses)
    }
}

impl Drop for SmartFillCoordinator {
    fn drop(&mut self) {
        self.completions.abort();
    }
}

impl std::fmt::Debug for SmartFillCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmartFillCoordinator")
            .field("config", &self.config)
            .field("progress", &self.progress())
            .finish_non_exhaustive()
    }
}

/// Single writer of analysis results into the cache.
async fn handle_completions(
    mut responses: mpsc::UnboundedReceiver<WorkerResponse>,
    cache: Arc<dyn AnalysisCache>,
    tracker: Arc<Mutex<BatchTracker>>,
    progress_tx: Arc<watch::Sender<AnalysisProgress>>,
) {
    while let Some(response) = responses.recv().await {
        if !lock(&tracker).is_current(response.generation) {
            debug!(request_id = response.id, photo_id = %response.image_id, "Dropping stale analysis");
            continue;
        }

        match &response.kind {
            ResponseKind::AnalysisComplete(analysis) => {
                if let Err(e) = cache.put(analysis).await {
                    warn!(photo_id = %response.image_id, error = %e, "Failed to cache analysis");
                }
            }
            ResponseKind::Error(message) => {
                warn!(photo_id = %response.image_id, error = %message, "Photo analysis failed");
            }
        }

        let mut state = lock(&tracker);
        match state.complete(response.id, response.generation) {
            Completion::Accepted(_) => {
                let progress = state.progress();
                progress_tx.send_replace(progress);
                if progress.is_idle() {
                    info!("Photo analysis idle");
                }
            }
            Completion::Stale | Completion::Unknown => {
                debug!(request_id = response.id, "Completion no longer tracked");
            }
        }
    }
}
