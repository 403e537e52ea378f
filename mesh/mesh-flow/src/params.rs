//! Parameters for flow baking.

use nalgebra::Matrix4;

use crate::error::{FlowError, FlowResult};

/// Largest accepted [`FlowParams::recursion_depth`].
///
/// Averaging revisits ancestors without memoization, so its cost grows like
/// `branching^depth` per vertex.
pub const MAX_RECURSION_DEPTH: u32 = 16;

/// How overlapping (seam-duplicate) vertices are found.
///
/// Both strategies produce the same pairwise relation; they differ only in cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapStrategy {
    /// Test every ordered vertex pair. O(V²), no extra memory.
    #[default]
    BruteForce,

    /// Bucket vertices into a uniform grid with cell size `sqrt(epsilon)` and
    /// only test pairs in neighbouring cells.
    SpatialHash,
}

/// Parameters for a flow bake.
///
/// # Example
///
/// ```
/// use mesh_flow::{FlowParams, OverlapStrategy};
///
/// let params = FlowParams::default();
/// assert_eq!(params.recursion_depth, 5);
///
/// let params = FlowParams::default()
///     .with_recursion_depth(8)
///     .with_overlap_strategy(OverlapStrategy::SpatialHash);
/// assert!(params.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FlowParams {
    /// Squared-distance threshold below which two vertices overlap.
    /// Default: `1e-7`
    pub overlap_epsilon: f64,

    /// Number of ancestor hops folded into each vertex's average.
    /// At most [`MAX_RECURSION_DEPTH`].
    /// Default: `5`
    pub recursion_depth: u32,

    /// Overlap search strategy.
    pub overlap_strategy: OverlapStrategy,

    /// Whether to run the overlap and averaging passes on the rayon pool.
    /// Default: `true`
    pub parallel: bool,

    /// Neighbour smoothing passes applied after averaging.
    /// Default: `0`
    pub smoothing_iterations: u32,

    /// Transform from snapshot space to seed space, used only when snapping
    /// seeds to their nearest vertex.
    /// Default: identity
    pub seed_transform: Matrix4<f64>,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            overlap_epsilon: 1e-7,
            recursion_depth: 5,
            overlap_strategy: OverlapStrategy::BruteForce,
            parallel: true,
            smoothing_iterations: 0,
            seed_transform: Matrix4::identity(),
        }
    }
}

impl FlowParams {
    /// Params for dense meshes: spatial hashing and a deeper, smoothed average.
    #[must_use]
    pub fn for_dense_meshes() -> Self {
        Self {
            overlap_strategy: OverlapStrategy::SpatialHash,
            recursion_depth: 8,
            smoothing_iterations: 1,
            ..Default::default()
        }
    }

    /// Params that keep every pass on the calling thread.
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Default::default()
        }
    }

    /// Set the squared-distance overlap threshold.
    #[must_use]
    pub const fn with_overlap_epsilon(mut self, epsilon: f64) -> Self {
        self.overlap_epsilon = epsilon;
        self
    }

    /// Set the ancestor averaging depth.
    ///
    /// Averaging cost is exponential in the depth; values above
    /// [`MAX_RECURSION_DEPTH`] fail [`validate`](Self::validate).
    #[must_use]
    pub const fn with_recursion_depth(mut self, depth: u32) -> Self {
        self.recursion_depth = depth;
        self
    }

    /// Set the overlap search strategy.
    #[must_use]
    pub const fn with_overlap_strategy(mut self, strategy: OverlapStrategy) -> Self {
        self.overlap_strategy = strategy;
        self
    }

    /// Enable or disable the rayon passes.
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Set the number of neighbour smoothing passes.
    #[must_use]
    pub const fn with_smoothing_iterations(mut self, iterations: u32) -> Self {
        self.smoothing_iterations = iterations;
        self
    }

    /// Set the snapshot-to-seed-space transform.
    #[must_use]
    pub const fn with_seed_transform(mut self, transform: Matrix4<f64>) -> Self {
        self.seed_transform = transform;
        self
    }

    /// Check that the params describe a bake that can run.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::InvalidParams`] if the epsilon is negative or not
    /// finite, the recursion depth exceeds [`MAX_RECURSION_DEPTH`], or the
    /// seed transform has non-finite entries.
    pub fn validate(&self) -> FlowResult<()> {
        if !self.overlap_epsilon.is_finite() || self.overlap_epsilon < 0.0 {
            return Err(FlowError::invalid_params(format!(
                "overlap epsilon must be finite and non-negative, got {}",
                self.overlap_epsilon
            )));
        }
        if self.recursion_depth > MAX_RECURSION_DEPTH {
            return Err(FlowError::invalid_params(format!(
                "recursion depth {} exceeds the maximum of {MAX_RECURSION_DEPTH}",
                self.recursion_depth
            )));
        }
        if self.seed_transform.iter().any(|v| !v.is_finite()) {
            return Err(FlowError::invalid_params(
                "seed transform contains non-finite entries",
            ));
        }
        Ok(())
    }
}
