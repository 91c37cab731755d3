//! Ordered parallel map/reduce over a sequential input stream.
//!
//! Inputs are read one at a time on a producer thread, fanned out to a
//! worker pool for the (expensive, pure) map phase, and reduced on the
//! calling thread strictly in input order. Results are sequence-numbered
//! and buffered until their turn, so the final accumulator is identical to
//! a single-threaded run no matter how workers interleave. Items in flight
//! past the reduce frontier are capped, so one slow mapping throttles the
//! producer instead of growing the reorder buffer without bound. With one
//! thread the whole pipeline degenerates to a plain sequential loop with no
//! channels and no spawns.

use std::collections::BTreeMap;
use std::thread;

use crossbeam_channel::bounded;

use crate::error::{EngineError, Result};

/// Channel slots per worker. Caps items sent but not yet reduced, so the
/// producer can never run more than `threads * BUFFER_PER_WORKER` items
/// ahead of the in-order reduce frontier.
const BUFFER_PER_WORKER: usize = 4;

/// A map/reduce scheduler with a fixed worker count.
#[derive(Debug, Clone, Copy)]
pub struct Scheduler {
    threads: usize,
}

impl Scheduler {
    /// Create a scheduler running `threads` map workers.
    pub fn new(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(EngineError::Config(
                "scheduler thread count must be >= 1".to_string(),
            ));
        }
        Ok(Self { threads })
    }

    /// The configured worker count.
    #[inline]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Drain `inputs`, apply `map` to each, and fold the results into `init`
    /// with `reduce`, in input order.
    ///
    /// The first error wins, in input order: an input-stream error or map
    /// failure at sequence `n` is returned after every successful result
    /// before `n` has been reduced, and nothing at or after `n` is. Work
    /// already in flight behind an error is discarded, never reduced.
    pub fn execute<It, I, M, T, Map, Red>(
        &self,
        inputs: It,
        map: Map,
        init: T,
        mut reduce: Red,
    ) -> Result<T>
    where
        It: Iterator<Item = Result<I>> + Send,
        I: Send,
        M: Send,
        Map: Fn(I) -> Result<M> + Sync,
        Red: FnMut(M, T) -> T,
    {
        if self.threads == 1 {
            return Self::execute_sequential(inputs, map, init, reduce);
        }

        let buffer = self.threads * BUFFER_PER_WORKER;
        let (in_tx, in_rx) = bounded::<(u64, I)>(buffer);
        let (out_tx, out_rx) = bounded::<(u64, Result<M>)>(buffer);
        // Credit channel: one permit per item reduced at the in-order
        // frontier. The producer spends its initial credit, then must wait
        // for permits, so a stalled head result throttles the whole
        // pipeline instead of letting mapped results pile up in the
        // reorder buffer.
        let (permit_tx, permit_rx) = bounded::<()>(buffer);

        thread::scope(|scope| {
            // Producer owns the input iterator. A recv/send failure means
            // the reducer hung up after an error; that is a normal shutdown.
            let producer = scope.spawn(move || -> Option<EngineError> {
                let mut credit = buffer;
                for (seq, item) in (0u64..).zip(inputs) {
                    if credit > 0 {
                        credit -= 1;
                    } else if permit_rx.recv().is_err() {
                        return None;
                    }
                    match item {
                        Ok(input) => {
                            if in_tx.send((seq, input)).is_err() {
                                return None;
                            }
                        }
                        Err(err) => return Some(err),
                    }
                }
                None
            });

            let map = &map;
            for _ in 0..self.threads {
                let in_rx = in_rx.clone();
                let out_tx = out_tx.clone();
                scope.spawn(move || {
                    for (seq, input) in in_rx.iter() {
                        if out_tx.send((seq, map(input))).is_err() {
                            break;
                        }
                    }
                });
            }
            // The reducer must see the channels close once producer and
            // workers finish, so the originals go now.
            drop(in_rx);
            drop(out_tx);

            let mut acc = init;
            let mut next_seq = 0u64;
            let mut pending: BTreeMap<u64, Result<M>> = BTreeMap::new();
            let mut abort: Option<EngineError> = None;

            'collect: while let Ok((seq, result)) = out_rx.recv() {
                pending.insert(seq, result);
                while let Some(result) = pending.remove(&next_seq) {
                    next_seq += 1;
                    match result {
                        Ok(mapped) => acc = reduce(mapped, acc),
                        Err(err) => {
                            abort = Some(err);
                            break 'collect;
                        }
                    }
                    // Release a permit only once the item is reduced; the
                    // producer may already be gone at stream end
                    let _ = permit_tx.send(());
                }
            }
            // Hanging up unblocks workers, which in turn unblocks the
            // producer; scope then joins everything cleanly.
            drop(out_rx);
            drop(permit_tx);

            let driver_err = match producer.join() {
                Ok(err) => err,
                Err(payload) => std::panic::resume_unwind(payload),
            };

            // A map abort always precedes any producer error in sequence
            // order: the producer stops sending at its error, so every
            // result the reducer saw came earlier in the stream.
            if let Some(err) = abort {
                return Err(err);
            }
            if let Some(err) = driver_err {
                return Err(err);
            }
            Ok(acc)
        })
    }

    fn execute_sequential<It, I, M, T, Map, Red>(
        inputs: It,
        map: Map,
        init: T,
        mut reduce: Red,
    ) -> Result<T>
    where
        It: Iterator<Item = Result<I>>,
        Map: Fn(I) -> Result<M>,
        Red: FnMut(M, T) -> T,
    {
        let mut acc = init;
        for item in inputs {
            let mapped = map(item?)?;
            acc = reduce(mapped, acc);
        }
        Ok(acc)
    }
}
