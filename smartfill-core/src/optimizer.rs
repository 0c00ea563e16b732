//! Whole-wall assignment optimizer.
//!
//! Assigning photos to frames to maximize total score is treated as
//! intractable, so the optimizer runs a randomized greedy search:
//!
//! 1. A score matrix (per frame, every photo sorted best-first) is computed
//!    once and shared by every solution.
//! 2. Solution 0 walks frames in wall order and always takes the best unused
//!    photo, so it is exactly reproducible for a given matrix.
//! 3. Every later solution walks a random permutation of the frames and picks
//!    uniformly among the top few unused photos.
//!
//! A frame with no unused candidate stays empty; photos are never reused
//! within a solution and solutions with no assignments are dropped.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::model::{Frame, ImageMetadata, OptimizationSolution, PhotoAnalysis, ScoringOptions};
use crate::scoring::score_match;

/// Source of uniform values in `[0, 1)`.
pub type RandomSource = Box<dyn FnMut() -> f64 + Send>;

/// Default random source backed by an OS-seeded PRNG.
pub fn default_random_source() -> RandomSource {
    let mut rng = StdRng::from_os_rng();
    Box::new(move || rng.random::<f64>())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub photo_id: String,
    pub score: u32,
}

/// A photo eligible for assignment, with everything the scorer needs.
#[derive(Debug, Clone, Copy)]
pub struct PhotoCandidate<'a> {
    pub photo_id: &'a str,
    pub metadata: &'a ImageMetadata,
    pub analysis: &'a PhotoAnalysis,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FrameRow {
    frame_id: String,
    candidates: Vec<ScoredCandidate>,
}

/// Per-frame candidate lists, best first, in wall order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreMatrix {
    rows: Vec<FrameRow>,
}

impl ScoreMatrix {
    /// Score every unlocked frame against every photo.
    pub fn build(frames: &[Frame], photos: &[PhotoCandidate<'_>], options: &ScoringOptions) -> Self {
        let rows = frames
            .iter()
            .filter(|frame| !frame.locked)
            .map(|frame| {
                let candidates = photos
                    .iter()
                    .map(|photo| ScoredCandidate {
                        photo_id: photo.photo_id.to_string(),
                        score: score_match(
                            photo.photo_id,
                            photo.metadata,
                            photo.analysis,
                            frame,
                            options,
                        )
                        .total_score,
                    })
                    .collect();
                (frame.id.clone(), candidates)
            })
            .collect();
        Self::from_scores(rows)
    }

    /// Build from precomputed scores. Each list is sorted best-first; equal
    /// scores keep their given order.
    pub fn from_scores(rows: Vec<(String, Vec<ScoredCandidate>)>) -> Self {
        let rows = rows
            .into_iter()
            .map(|(frame_id, mut candidates)| {
                candidates.sort_by(|a, b| b.score.cmp(&a.score));
                FrameRow {
                    frame_id,
                    candidates,
                }
            })
            .collect();
        Self { rows }
    }

    pub fn frame_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Sorted candidates for a frame.
    pub fn candidates(&self, frame_id: &str) -> Option<&[ScoredCandidate]> {
        self.rows
            .iter()
            .find(|row| row.frame_id == frame_id)
            .map(|row| row.candidates.as_slice())
    }
}

pub struct GalleryOptimizer {
    candidate_pool: usize,
    random: RandomSource,
}

impl GalleryOptimizer {
    /// `candidate_pool` bounds how far down each list alternative solutions
    /// may reach.
    pub fn new(candidate_pool: usize) -> Self {
        Self {
            candidate_pool: candidate_pool.max(1),
            random: default_random_source(),
        }
    }

    /// Replace the random source, e.g. with a seeded sequence in tests.
    pub fn with_random_source<F>(mut self, source: F) -> Self
    where
        F: FnMut() -> f64 + Send + 'static,
    {
        self.random = Box::new(source);
        self
    }

    /// Produce up to `count` solutions from a shared score matrix.
    pub fn solve(&mut self, matrix: &ScoreMatrix, count: usize) -> Vec<OptimizationSolution> {
        let mut solutions = Vec::with_capacity(count);

        for index in 0..count {
            let solution = self.solve_one(matrix, index);
            if solution.assignments.is_empty() {
                debug!(index, "Dropping solution with no assignments");
                continue;
            }
            solutions.push(solution);
        }

        debug!(
            requested = count,
            produced = solutions.len(),
            frames = matrix.frame_count(),
            "Generated gallery solutions"
        );
        solutions
    }

    fn solve_one(&mut self, matrix: &ScoreMatrix, index: usize) -> OptimizationSolution {
        let baseline = index == 0;
        let order = if baseline {
            (0..matrix.rows.len()).collect()
        } else {
            self.shuffled(matrix.rows.len())
        };

        let mut used: HashSet<&str> = HashSet::new();
        let mut assignments = BTreeMap::new();
        let mut total_score = 0u32;

        for row in order.into_iter().map(|i| &matrix.rows[i]) {
            let available: Vec<&ScoredCandidate> = row
                .candidates
                .iter()
                .filter(|c| !used.contains(c.photo_id.as_str()))
                .collect();
            if available.is_empty() {
                continue;
            }

            let pick = if baseline {
                0
            } else {
                self.pick_index(available.len().min(self.candidate_pool))
            };
            let chosen = available[pick];

            used.insert(chosen.photo_id.as_str());
            assignments.insert(row.frame_id.clone(), chosen.photo_id.clone());
            total_score += chosen.score;
        }

        OptimizationSolution {
            id: format!("solution-{index}"),
            assignments,
            total_score,
            used_photo_ids: used.into_iter().map(str::to_owned).collect::<BTreeSet<_>>(),
        }
    }

    /// Uniform index in `0..len`.
    fn pick_index(&mut self, len: usize) -> usize {
        let r = (self.random)().clamp(0.0, 1.0);
        ((r * len as f64) as usize).min(len.saturating_sub(1))
    }

    /// Fisher-Yates permutation of `0..len`.
    fn shuffled(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        for i in (1..len).rev() {
            let j = self.pick_index(i + 1);
            order.swap(i, j);
        }
        order
    }
}

impl fmt::Debug for GalleryOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GalleryOptimizer")
            .field("candidate_pool", &self.candidate_pool)
            .finish_non_exhaustive()
    }
}
