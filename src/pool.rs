//! Fixed worker pool and contiguous range partitioning.
//!
//! One rayon thread pool is built at startup and reused for every frame.
//! Work is always handed out as `workers` contiguous, disjoint ranges; each
//! dispatch runs inside a [`rayon::ThreadPool::scope`], so returning from a
//! dispatch is the barrier between phases.
//!
//! # Example
//!
//! ```ignore
//! use pullsim::pool::{partition, WorkerPool};
//!
//! let pool = WorkerPool::new(4)?;
//! let mut data = vec![0u32; 1000];
//! let parts = pool.split_mut(&mut data);
//! pool.run_partitions(parts, |worker, chunk| chunk.fill(worker as u32));
//! ```

use std::ops::Range;

use crate::error::EngineError;
use crate::store::KinematicSlicesMut;

/// Split `[0, len)` into exactly `parts` contiguous ranges.
///
/// Every range has `len / parts` elements except the last, which also takes
/// the remainder. With more parts than elements the leading ranges are
/// empty. `parts == 0` yields no ranges.
pub fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    if parts == 0 {
        return Vec::new();
    }
    let chunk = len / parts;
    (0..parts)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == parts { len } else { start + chunk };
            start..end
        })
        .collect()
}

/// Something that can be cut in two at an index, handing out disjoint
/// mutable halves.
pub trait SplitAt: Sized {
    /// Number of elements.
    fn split_len(&self) -> usize;

    /// Split into `[0, mid)` and `[mid, len)`.
    fn split_at_index(self, mid: usize) -> (Self, Self);
}

impl<'a, T> SplitAt for &'a mut [T] {
    fn split_len(&self) -> usize {
        self.len()
    }

    fn split_at_index(self, mid: usize) -> (Self, Self) {
        self.split_at_mut(mid)
    }
}

impl<'a> SplitAt for KinematicSlicesMut<'a> {
    fn split_len(&self) -> usize {
        self.len()
    }

    fn split_at_index(self, mid: usize) -> (Self, Self) {
        self.split_at(mid)
    }
}

/// Cut `data` into the pieces described by `ranges`.
///
/// `ranges` must be contiguous, start at 0 and end at `data.split_len()`
/// (the shape [`partition`] produces).
pub fn split_into<S: SplitAt>(data: S, ranges: &[Range<usize>]) -> Vec<S> {
    debug_assert_eq!(ranges.first().map_or(0, |r| r.start), 0);
    debug_assert_eq!(ranges.last().map_or(0, |r| r.end), data.split_len());

    let mut out = Vec::with_capacity(ranges.len());
    let mut rest = data;
    let mut consumed = 0;
    for (i, range) in ranges.iter().enumerate() {
        if i + 1 == ranges.len() {
            out.push(rest);
            break;
        }
        let (head, tail) = rest.split_at_index(range.end - consumed);
        consumed = range.end;
        out.push(head);
        rest = tail;
    }
    out
}

/// Fixed-size pool of worker threads.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Build a pool with exactly `workers` threads.
    pub fn new(workers: usize) -> Result<Self, EngineError> {
        if workers == 0 {
            return Err(EngineError::InvalidConfig(
                "worker count must be at least 1".into(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pullsim-worker-{i}"))
            .build()?;
        log::debug!("worker pool started with {workers} threads");
        Ok(Self { pool, workers })
    }

    /// Build a pool with one thread per logical CPU.
    pub fn with_available_parallelism() -> Result<Self, EngineError> {
        Self::new(num_cpus::get().max(1))
    }

    /// Number of worker threads.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Partition `[0, len)` into one range per worker.
    pub fn ranges(&self, len: usize) -> Vec<Range<usize>> {
        partition(len, self.workers)
    }

    /// Split `data` into one disjoint piece per worker.
    pub fn split_mut<S: SplitAt>(&self, data: S) -> Vec<S> {
        let ranges = self.ranges(data.split_len());
        split_into(data, &ranges)
    }

    /// Run `f(worker_index, part)` for every part, in parallel, and wait for
    /// all of them to finish.
    pub fn run_partitions<T, F>(&self, parts: Vec<T>, f: F)
    where
        T: Send,
        F: Fn(usize, T) + Sync,
    {
        let f = &f;
        self.pool.scope(|s| {
            for (i, part) in parts.into_iter().enumerate() {
                s.spawn(move |_| f(i, part));
            }
        });
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ParticleStore;

    #[test]
    fn test_partition_covers_range() {
        for len in [0usize, 1, 3, 4, 10, 1001] {
            for parts in 1..=7 {
                let ranges = partition(len, parts);
                assert_eq!(ranges.len(), parts);
                assert_eq!(ranges[0].start, 0);
                assert_eq!(ranges[parts - 1].end, len);
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
            }
        }
    }

    #[test]
    fn test_last_range_takes_remainder() {
        let ranges = partition(10, 3);
        assert_eq!(ranges, vec![0..3, 3..6, 6..10]);
    }

    #[test]
    fn test_more_parts_than_elements() {
        let ranges = partition(2, 4);
        assert_eq!(ranges, vec![0..0, 0..0, 0..0, 0..2]);
    }

    #[test]
    fn test_zero_parts() {
        assert!(partition(5, 0).is_empty());
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_split_mut_slices() {
        let pool = WorkerPool::new(3).unwrap();
        let mut data = vec![0u32; 11];
        let parts = pool.split_mut(data.as_mut_slice());
        let lens: Vec<usize> = parts.iter().map(|p| p.len()).collect();
        assert_eq!(lens, vec![3, 3, 5]);
    }

    #[test]
    fn test_run_partitions_touches_every_element_once() {
        let pool = WorkerPool::new(4).unwrap();
        let mut data = vec![0u32; 1003];
        let parts = pool.split_mut(data.as_mut_slice());
        pool.run_partitions(parts, |worker, chunk| {
            for v in chunk.iter_mut() {
                *v += worker as u32 + 1;
            }
        });
        let ranges = partition(1003, 4);
        for (w, range) in ranges.into_iter().enumerate() {
            assert!(data[range].iter().all(|&v| v == w as u32 + 1));
        }
    }

    #[test]
    fn test_split_kinematics() {
        let pool = WorkerPool::new(2).unwrap();
        let mut store = ParticleStore::new(9);
        let parts = pool.split_mut(store.kinematics_mut());
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].len(), 4);
        assert_eq!(parts[1].len(), 5);
    }
}
