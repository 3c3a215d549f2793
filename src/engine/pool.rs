//! Bounded worker pool and ordering collector shared by split, merge and verify.
//!
//! Dispatcher thread: acquire a slot → build unit `i` → hand it to a fixed set of `limit` scoped
//! workers over a bounded job channel. Each unit sends exactly one [`Record`] and releases its
//! slot. The collector (calling thread) drains the record channel until every sender is gone
//! and slots payloads by `order`.

use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};
use log::debug;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crate::engine::cancel::CancelToken;
use crate::error::{ChunkError, Result};

/// A built unit waiting for a worker, with the slot it was admitted under.
type Job<U> = (usize, U, Permit);

/// What a unit reports back: its index and either a payload or the error that stopped it.
pub struct Record<T> {
    pub order: usize,
    pub outcome: Result<T>,
}

/// Called by the collector with `1` for every successful record (progress bars).
pub type ProgressHook = Box<dyn Fn(usize) + Send + Sync>;

/// Counting semaphore: a bounded channel pre-filled with one token per slot.
struct Slots {
    free: Receiver<()>,
    release: Sender<()>,
}

/// A held slot; returned to the pool on drop.
struct Permit {
    release: Sender<()>,
}

impl Drop for Permit {
    fn drop(&mut self) {
        let _ = self.release.send(());
    }
}

/// Why a slot was not granted.
enum Denied {
    /// External cancellation: reported as the acquiring unit's error.
    Cancelled,
    /// The collector already saw a fatal record: stop dispatching quietly.
    Aborted,
}

impl Slots {
    fn new(limit: usize) -> Self {
        let (release, free) = bounded::<()>(limit);
        for _ in 0..limit {
            let _ = release.send(());
        }
        Self { free, release }
    }

    fn acquire(
        &self,
        cancel: &CancelToken,
        abort: &CancelToken,
    ) -> std::result::Result<Permit, Denied> {
        if cancel.is_cancelled() {
            return Err(Denied::Cancelled);
        }
        if abort.is_cancelled() {
            return Err(Denied::Aborted);
        }
        select! {
            recv(self.free) -> _ => Ok(Permit { release: self.release.clone() }),
            recv(cancel.signal()) -> _ => Err(Denied::Cancelled),
            recv(abort.signal()) -> _ => Err(Denied::Aborted),
        }
    }
}

/// Run jobs until the dispatcher hangs up. A panicking unit is reported as `WorkerPanicked`
/// and the worker moves on to the next job.
fn worker_loop<T, U>(jobs: Receiver<Job<U>>, records: Sender<Record<T>>)
where
    U: FnOnce() -> Result<T>,
{
    for (order, unit, permit) in jobs.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(unit))
            .unwrap_or_else(|_| Err(ChunkError::WorkerPanicked { order }));
        let _ = records.send(Record { order, outcome });
        drop(permit);
    }
}

pub struct WorkerPool {
    limit: usize,
    on_record: Option<ProgressHook>,
}

impl WorkerPool {
    /// Pool admitting at most `limit` concurrent units (at least 1).
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
            on_record: None,
        }
    }

    pub fn with_progress(mut self, hook: Option<ProgressHook>) -> Self {
        self.on_record = hook;
        self
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Run `count` units and return their payloads in index order.
    ///
    /// `factory(i)` is called on the dispatcher thread for `i = 0..count`, strictly in order and
    /// only once a slot is free, so sequential work (reading the source) belongs there and the
    /// returned closure is what runs in parallel. The first error from a factory or a unit fails
    /// the whole batch; later records are drained and discarded.
    pub fn dispatch<T, F, U>(
        &self,
        count: usize,
        cancel: &CancelToken,
        mut factory: F,
    ) -> Result<Vec<T>>
    where
        T: Send,
        F: FnMut(usize) -> Result<U> + Send,
        U: FnOnce() -> Result<T> + Send,
    {
        let slots = Slots::new(self.limit);
        let abort = CancelToken::new();
        let (record_tx, record_rx) = unbounded::<Record<T>>();
        // Every job in the channel or on a worker holds a permit, so `limit` never blocks a send.
        let (job_tx, job_rx) = bounded::<Job<U>>(self.limit);
        let workers = self.limit.min(count);
        debug!("Dispatching {} units over {} workers", count, workers);

        thread::scope(|scope| {
            for id in 0..workers {
                let jobs = job_rx.clone();
                let records = record_tx.clone();
                thread::Builder::new()
                    .name(format!("chunk-worker-{id}"))
                    .spawn_scoped(scope, move || worker_loop(jobs, records))
                    .map_err(|e| {
                        abort.cancel();
                        ChunkError::Spawn { source: e }
                    })?;
            }
            drop(job_rx);

            let slots = &slots;
            let abort_ref = &abort;
            thread::Builder::new()
                .name("chunk-dispatcher".to_string())
                .spawn_scoped(scope, move || {
                    for order in 0..count {
                        let permit = match slots.acquire(cancel, abort_ref) {
                            Ok(permit) => permit,
                            Err(Denied::Cancelled) => {
                                let _ = record_tx.send(Record {
                                    order,
                                    outcome: Err(ChunkError::Cancelled),
                                });
                                break;
                            }
                            Err(Denied::Aborted) => break,
                        };
                        let unit = match factory(order) {
                            Ok(unit) => unit,
                            Err(err) => {
                                let _ = record_tx.send(Record {
                                    order,
                                    outcome: Err(err),
                                });
                                break;
                            }
                        };
                        if job_tx.send((order, unit, permit)).is_err() {
                            break;
                        }
                    }
                    // job_tx dropped here: workers finish their queue and exit.
                })
                .map_err(|e| {
                    abort.cancel();
                    ChunkError::Spawn { source: e }
                })?;

            self.collect(record_rx, count, &abort)
        })
    }

    /// Consume records until the channel closes. First error wins; payloads land in slot `order`.
    fn collect<T>(
        &self,
        records: Receiver<Record<T>>,
        count: usize,
        abort: &CancelToken,
    ) -> Result<Vec<T>> {
        let mut ordered: Vec<Option<T>> = std::iter::repeat_with(|| None).take(count).collect();
        let mut first_error: Option<ChunkError> = None;

        for Record { order, outcome } in records.iter() {
            if first_error.is_some() {
                continue;
            }
            match outcome {
                Ok(payload) => {
                    if let Some(slot) = ordered.get_mut(order) {
                        *slot = Some(payload);
                    }
                    if let Some(hook) = &self.on_record {
                        hook(1);
                    }
                }
                Err(err) => {
                    debug!("Chunk {} failed; draining in-flight units", order);
                    abort.cancel();
                    first_error = Some(ChunkError::Worker {
                        order,
                        source: Box::new(err),
                    });
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        ordered
            .into_iter()
            .enumerate()
            .map(|(order, slot)| slot.ok_or(ChunkError::MissingResult { order }))
            .collect()
    }
}
