use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::dcel::Dcel;
use super::handles::{new_fixed_vertex_handle, FixedVertexHandle};
use crate::Point2;

/// Seed used by [RandomSampleHintGenerator::default].
pub const DEFAULT_SEED: u64 = 0x5eed_cd7;

/// A structure used to speed up point location by providing a vertex close to the
/// queried position where the walk can start.
///
/// Point location walks from the hint to the target. The closer the hint, the
/// shorter the walk.
pub trait HintGenerator: Default {
    /// Returns a vertex that should be close to a given position.
    ///
    /// The returned vertex must be connected to at least one edge.
    fn get_hint(&mut self, dcel: &Dcel, position: Point2<f64>) -> FixedVertexHandle;

    /// Notifies the hint generator that a vertex was inserted or looked up.
    fn notify_vertex_inserted(&mut self, _vertex: FixedVertexHandle) {}
}

/// Samples `ceil(n^(1/3))` random vertices and returns the one closest to the query.
///
/// This bounds the expected walk length to `O(n^(1/3))` for uniformly distributed input.
/// Sampling uses a seeded random number generator, so results are reproducible.
#[derive(Clone, Debug)]
pub struct RandomSampleHintGenerator {
    rng: StdRng,
}

impl RandomSampleHintGenerator {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomSampleHintGenerator {
    fn default() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }
}

impl HintGenerator for RandomSampleHintGenerator {
    fn get_hint(&mut self, dcel: &Dcel, position: Point2<f64>) -> FixedVertexHandle {
        let num_vertices = dcel.num_vertices();
        let fallback = new_fixed_vertex_handle(0);
        if num_vertices == 0 {
            return fallback;
        }
        let num_samples = ((num_vertices as f64).cbrt().ceil() as usize).max(1);

        let mut best: Option<(f64, FixedVertexHandle)> = None;
        for _ in 0..num_samples {
            let candidate = FixedVertexHandle::new(self.rng.gen_range(0..num_vertices));
            let entry = dcel.vertex(candidate);
            if entry.symedge.is_none() {
                continue;
            }
            let distance_2 = entry.position.distance_2(position);
            if best.map_or(true, |(best_distance, _)| distance_2 < best_distance) {
                best = Some((distance_2, candidate));
            }
        }
        best.map(|(_, vertex)| vertex).unwrap_or(fallback)
    }
}

/// A hint generator that returns the last inserted vertex as hint.
///
/// Useful when consecutive insertions are spatially close.
#[derive(Clone, Copy, Debug, Default)]
pub struct LastUsedVertexHintGenerator {
    index: usize,
}

impl HintGenerator for LastUsedVertexHintGenerator {
    fn get_hint(&mut self, dcel: &Dcel, _position: Point2<f64>) -> FixedVertexHandle {
        let hint = FixedVertexHandle::new(self.index);
        if self.index < dcel.num_vertices() && dcel.vertex(hint).symedge.is_some() {
            hint
        } else {
            new_fixed_vertex_handle(0)
        }
    }

    fn notify_vertex_inserted(&mut self, vertex: FixedVertexHandle) {
        self.index = vertex.index();
    }
}
