//! Parallel evaluation of schedule stages.
//!
//! Nodes within one stage never feed each other, so a stage can be split
//! across workers freely. The pool holds `workers - 1` threads; the calling
//! thread always evaluates the last slice itself.

use std::ops::Range;
use std::sync::{Mutex, PoisonError};

use gsim_netlist::NodeId;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::error::SimError;

/// Splits `len` items into at most `workers` contiguous slices. Earlier
/// slices take one extra item each until the remainder is used up; empty
/// slices are left out.
pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let base = len / workers;
    let extra = len % workers;
    let mut slices = Vec::with_capacity(workers.min(len));
    let mut start = 0;
    for i in 0..workers {
        let size = base + usize::from(i < extra);
        if size == 0 {
            break;
        }
        slices.push(start..start + size);
        start += size;
    }
    slices
}

/// A fixed-size worker pool reused for every stage of every cycle.
#[derive(Debug)]
pub struct WorkerPool {
    pool: Option<ThreadPool>,
    workers: usize,
}

impl WorkerPool {
    /// Starts a pool for `workers` concurrent evaluators. One worker needs no
    /// extra threads.
    pub fn new(workers: usize) -> Result<Self, SimError> {
        let workers = workers.max(1);
        let pool = if workers > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(workers - 1)
                .thread_name(|i| format!("gsim-worker-{i}"))
                .build()
                .map_err(|e| SimError::WorkerPool(e.to_string()))?;
            Some(pool)
        } else {
            None
        };
        Ok(Self { pool, workers })
    }

    /// Number of concurrent evaluators, the calling thread included.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Calls `eval` on every node of a stage and waits for all of them.
    ///
    /// A slice stops at its first error; the first error reported by any
    /// slice is returned once the stage has joined.
    pub fn run_stage<F>(&self, nodes: &[NodeId], eval: F) -> Result<(), SimError>
    where
        F: Fn(NodeId) -> Result<(), SimError> + Sync,
    {
        let slices = partition(nodes.len(), self.workers);
        let pool = match &self.pool {
            Some(pool) if slices.len() > 1 => pool,
            _ => return nodes.iter().try_for_each(|&node| eval(node)),
        };

        let first_error: Mutex<Option<SimError>> = Mutex::new(None);
        let run_slice = |range: Range<usize>| {
            if let Err(err) = nodes[range].iter().try_for_each(|&node| eval(node)) {
                first_error
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .get_or_insert(err);
            }
        };

        if let Some((last, rest)) = slices.split_last() {
            pool.in_place_scope(|scope| {
                for range in rest {
                    let run_slice = &run_slice;
                    let range = range.clone();
                    scope.spawn(move |_| run_slice(range));
                }
                run_slice(last.clone());
            });
        }

        match first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn nodes(count: u32) -> Vec<NodeId> {
        (0..count).map(NodeId::from_raw).collect()
    }

    #[test]
    fn remainder_goes_to_earliest_slices() {
        assert_eq!(partition(10, 3), vec![0..4, 4..7, 7..10]);
        assert_eq!(partition(2, 4), vec![0..1, 1..2]);
        assert_eq!(partition(0, 3), Vec::<Range<usize>>::new());
        assert_eq!(partition(5, 0), vec![0..5]);
    }

    #[test]
    fn every_node_is_evaluated_once() {
        let pool = WorkerPool::new(4).unwrap();
        assert_eq!(pool.workers(), 4);
        let seen = Mutex::new(HashSet::new());
        let count = AtomicUsize::new(0);
        pool.run_stage(&nodes(37), |node| {
            count.fetch_add(1, Ordering::SeqCst);
            seen.lock().unwrap().insert(node);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 37);
        assert_eq!(seen.into_inner().unwrap().len(), 37);
    }

    #[test]
    fn single_worker_runs_inline() {
        let pool = WorkerPool::new(1).unwrap();
        let count = AtomicUsize::new(0);
        pool.run_stage(&nodes(5), |_| {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn errors_surface_after_join() {
        let pool = WorkerPool::new(3).unwrap();
        let err = pool
            .run_stage(&nodes(9), |node| {
                if node.as_raw() == 4 {
                    Err(SimError::WorkerPool("boom".into()))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, SimError::WorkerPool(ref msg) if msg == "boom"));
    }
}
