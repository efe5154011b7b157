//! Item scheduler: bounded worker pool with staggered start times.
//!
//! Keeps up to `max_concurrent` item pipelines in flight at once. Item `i` (in
//! intake order) does not start before `run start + i × stagger`, so requests
//! are spread over time even when slots are free.

use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    max_concurrent: usize,
    stagger: Duration,
}

impl Scheduler {
    pub fn new(max_concurrent: usize, stagger: Duration) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            stagger,
        }
    }

    /// Start offset for the item at `index`.
    pub fn offset(&self, index: usize) -> Duration {
        self.stagger
            .saturating_mul(u32::try_from(index).unwrap_or(u32::MAX))
    }

    /// Drains `items`, running `work(index, item)` for each with bounded concurrency.
    ///
    /// `work` is called at intake time (in order); the future it returns runs once
    /// the item's start offset has elapsed. `on_input_closed` is called once, when
    /// the input channel is closed and every item has been taken. Returns the
    /// number of items dispatched.
    pub async fn run<T, F, Fut, C>(
        &self,
        mut items: mpsc::Receiver<T>,
        mut work: F,
        on_input_closed: C,
    ) -> usize
    where
        F: FnMut(usize, T) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
        C: FnOnce(),
    {
        let start = Instant::now();
        let mut join_set = JoinSet::new();
        let mut dispatched = 0usize;
        let mut on_input_closed = Some(on_input_closed);

        loop {
            let input_open = on_input_closed.is_some();
            tokio::select! {
                next = items.recv(), if input_open && join_set.len() < self.max_concurrent => {
                    match next {
                        Some(item) => {
                            let at = start + self.offset(dispatched);
                            let fut = work(dispatched, item);
                            dispatched += 1;
                            join_set.spawn(async move {
                                tokio::time::sleep_until(at).await;
                                fut.await;
                            });
                        }
                        None => {
                            if let Some(f) = on_input_closed.take() {
                                f();
                            }
                        }
                    }
                }
                Some(res) = join_set.join_next(), if !join_set.is_empty() => {
                    if let Err(e) = res {
                        tracing::error!("item task failed: {}", e);
                    }
                }
                else => break,
            }
        }
        dispatched
    }
}
