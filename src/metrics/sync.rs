//! Cross-worker metric reduction

/// Collective communication over the cooperating training processes.
///
/// Data-parallel training runs one copy of the epoch loop per process; the
/// only coordination point is the blocking sum-reduction of metric
/// statistics at epoch end. The distributed backend is an external
/// collaborator behind this trait; [`LocalGroup`] covers the
/// single-process case.
pub trait ProcessGroup {
    /// Number of cooperating processes
    fn world_size(&self) -> usize;

    /// Element-wise sum of `values` across all processes, written back in
    /// place on every participant. Blocks until all processes arrive.
    fn all_reduce_sum(&self, values: &mut [f64]);
}

/// Single-process group: reductions are identities
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalGroup;

impl ProcessGroup for LocalGroup {
    fn world_size(&self) -> usize {
        1
    }

    fn all_reduce_sum(&self, _values: &mut [f64]) {}
}
