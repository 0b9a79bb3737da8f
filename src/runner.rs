//! Draw-parallel execution
//!
//! Every draw is independent, so the draw range is split into contiguous
//! chunks, one per worker, and the per-chunk results are concatenated in
//! draw order. Each draw gets its own random stream derived from the run
//! seed and the draw index, which keeps results identical for a fixed seed
//! whatever the worker count.

use crate::error::{ForecastError, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Callback invoked between draws
pub trait DrawObserver: Sync {
    fn on_draw_complete(&self, completed: usize, total: usize);
}

/// Observer that logs progress every `step_pct` percent
#[derive(Debug, Clone)]
pub struct LogProgress {
    pub label: String,
    pub step_pct: usize,
}

impl LogProgress {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            step_pct: 10,
        }
    }
}

impl DrawObserver for LogProgress {
    fn on_draw_complete(&self, completed: usize, total: usize) {
        if total == 0 {
            return;
        }
        let step = self.step_pct.max(1);
        let pct = completed * 100 / total;
        let prev = (completed - 1) * 100 / total;
        if completed == total || pct / step != prev / step {
            log::info!("{}: {}/{} draws ({}%)", self.label, completed, total, pct);
        }
    }
}

/// Cooperative cancellation flag, checked between draws
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Optional hooks attached to a run
#[derive(Clone, Default)]
pub struct RunControl<'a> {
    pub observer: Option<&'a dyn DrawObserver>,
    pub cancellation: Option<CancellationToken>,
}

impl<'a> RunControl<'a> {
    pub fn with_observer(mut self, observer: &'a dyn DrawObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Runs a per-draw computation over `0..n_draws`
pub struct DrawRunner<'a> {
    workers: usize,
    seed: u64,
    control: &'a RunControl<'a>,
}

impl<'a> DrawRunner<'a> {
    pub fn new(workers: usize, seed: u64, control: &'a RunControl<'a>) -> Self {
        Self { workers, seed, control }
    }

    /// Random stream of one draw
    pub fn rng_for_draw(seed: u64, draw: usize) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(draw as u64);
        rng
    }

    /// Collect one output per draw, in draw order
    pub fn run<T, F>(&self, n_draws: usize, f: F) -> Result<Vec<T>>
    where
        T: Send,
        F: Fn(usize, &mut ChaCha8Rng) -> Result<T> + Sync,
    {
        self.run_fold(
            n_draws,
            Vec::new,
            |mut acc, draw, rng| {
                acc.push(f(draw, rng)?);
                Ok(acc)
            },
            |mut left, right| {
                left.extend(right);
                left
            },
        )
    }

    /// Fold draws into per-worker accumulators, then merge them in draw order
    pub fn run_fold<A, I, F, M>(&self, n_draws: usize, init: I, step: F, merge: M) -> Result<A>
    where
        A: Send,
        I: Fn() -> A + Sync,
        F: Fn(A, usize, &mut ChaCha8Rng) -> Result<A> + Sync,
        M: Fn(A, A) -> A,
    {
        let completed = AtomicUsize::new(0);

        if self.workers <= 1 || n_draws <= 1 {
            return self.process_chunk(0..n_draws, n_draws, &completed, &init, &step);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
            .map_err(|e| ForecastError::ThreadPool(e.to_string()))?;

        let chunk = n_draws.div_ceil(self.workers);
        let ranges: Vec<Range<usize>> = (0..n_draws)
            .step_by(chunk)
            .map(|start| start..(start + chunk).min(n_draws))
            .collect();
        log::debug!("splitting {} draws into {} chunks of up to {}", n_draws, ranges.len(), chunk);

        let parts: Vec<Result<A>> = pool.install(|| {
            ranges
                .into_par_iter()
                .map(|range| self.process_chunk(range, n_draws, &completed, &init, &step))
                .collect()
        });

        let mut merged: Option<A> = None;
        for part in parts {
            let part = part?;
            merged = Some(match merged {
                None => part,
                Some(acc) => merge(acc, part),
            });
        }
        Ok(merged.unwrap_or_else(init))
    }

    fn process_chunk<A, I, F>(
        &self,
        range: Range<usize>,
        total: usize,
        completed: &AtomicUsize,
        init: &I,
        step: &F,
    ) -> Result<A>
    where
        I: Fn() -> A,
        F: Fn(A, usize, &mut ChaCha8Rng) -> Result<A>,
    {
        let mut acc = init();
        for draw in range {
            if let Some(token) = &self.control.cancellation {
                if token.is_cancelled() {
                    return Err(ForecastError::Cancelled {
                        completed: completed.load(Ordering::SeqCst),
                        total,
                    });
                }
            }
            let mut rng = Self::rng_for_draw(self.seed, draw);
            acc = step(acc, draw, &mut rng)?;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(observer) = self.control.observer {
                observer.on_draw_complete(done, total);
            }
        }
        Ok(acc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::sync::Mutex;

    struct Recorder(Mutex<Vec<usize>>);

    impl DrawObserver for Recorder {
        fn on_draw_complete(&self, completed: usize, _total: usize) {
            self.0.lock().unwrap().push(completed);
        }
    }

    #[test]
    fn test_run_preserves_draw_order() {
        let control = RunControl::default();
        let runner = DrawRunner::new(4, 1, &control);
        let out = runner.run(37, |d, _| Ok(d * 2)).unwrap();
        assert_eq!(out, (0..37).map(|d| d * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_worker_count_does_not_change_results() {
        let control = RunControl::default();
        let seq = DrawRunner::new(1, 9, &control)
            .run(20, |_, rng| Ok(rng.gen::<f64>()))
            .unwrap();
        let par = DrawRunner::new(3, 9, &control)
            .run(20, |_, rng| Ok(rng.gen::<f64>()))
            .unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn test_fold_sums() {
        let control = RunControl::default();
        let runner = DrawRunner::new(3, 0, &control);
        let total = runner
            .run_fold(10, || 0usize, |acc, d, _| Ok(acc + d), |a, b| a + b)
            .unwrap();
        assert_eq!(total, 45);
    }

    #[test]
    fn test_observer_sees_every_draw() {
        let recorder = Recorder(Mutex::new(Vec::new()));
        let control = RunControl::default().with_observer(&recorder);
        DrawRunner::new(1, 0, &control).run(5, |d, _| Ok(d)).unwrap();
        assert_eq!(*recorder.0.lock().unwrap(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_cancellation_between_draws() {
        let token = CancellationToken::new();
        let control = RunControl::default().with_cancellation(token.clone());
        let runner = DrawRunner::new(1, 0, &control);
        let result = runner.run(10, |d, _| {
            if d == 3 {
                token.cancel();
            }
            Ok(d)
        });
        match result {
            Err(ForecastError::Cancelled { completed, total }) => {
                assert_eq!(completed, 4);
                assert_eq!(total, 10);
            }
            other => panic!("expected cancellation, got {:?}", other.map(|v| v.len())),
        }
    }
}
