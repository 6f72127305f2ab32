use super::provider::SampleProvider;
use super::sample::Sample;
use anyhow::Result;
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::VecDeque;

/// Samples requested from the pool per worker and round trip.
const PREFETCH_PER_WORKER: usize = 2;

/// In-order iterator over a provider, batch size 1, no shuffling.
///
/// With more than one worker the next chunk of samples is built on a rayon pool.
/// Results are still yielded in increasing index order.
pub struct DataLoader<'a> {
    provider: &'a dyn SampleProvider,
    pool: Option<ThreadPool>,
    chunk: usize,
    next: usize,
    ready: VecDeque<Result<Sample>>,
}

impl<'a> DataLoader<'a> {
    pub fn new(provider: &'a dyn SampleProvider, num_workers: usize) -> Self {
        let pool = if num_workers > 1 && provider.supports_parallel() {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(num_workers)
                .build()
            {
                Ok(pool) => Some(pool),
                Err(err) => {
                    log::warn!("failed to start {num_workers} loader workers ({err}), loading serially");
                    None
                }
            }
        } else {
            None
        };
        let chunk = match pool {
            Some(_) => num_workers * PREFETCH_PER_WORKER,
            None => 1,
        };
        Self {
            provider,
            pool,
            chunk,
            next: 0,
            ready: VecDeque::new(),
        }
    }

    pub fn is_parallel(&self) -> bool {
        self.pool.is_some()
    }

    fn fill(&mut self) {
        let start = self.next;
        let end = (start + self.chunk).min(self.provider.len());
        let provider = self.provider;
        match &self.pool {
            Some(pool) => {
                let batch: Vec<Result<Sample>> =
                    pool.install(|| (start..end).into_par_iter().map(|i| provider.get(i)).collect());
                self.ready.extend(batch);
            }
            None => self.ready.extend((start..end).map(|i| provider.get(i))),
        }
        self.next = end;
    }
}

impl Iterator for DataLoader<'_> {
    type Item = Result<Sample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.ready.is_empty() && self.next < self.provider.len() {
            self.fill();
        }
        self.ready.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.provider.len() - self.next + self.ready.len();
        (left, Some(left))
    }
}
