//! The region traversal engine: streaming driver, finalizer, and scheduler
//! glue.
//!
//! The driver walks the pileup stream once, feeding three pieces of state in
//! lockstep: the band-pass activity profile (region boundaries), the bounded
//! read cache (candidate attachments), and the dead-zone tracker (proof of
//! read-set completeness). Region candidates queue up FIFO and are finalized
//! strictly in genome order, each one only after the tracker proves no
//! future read can touch its extended span. Finalized regions flow into the
//! ordered map/reduce scheduler, so analysis output is deterministic for a
//! given input regardless of worker count.

use std::collections::VecDeque;
use std::io::Write;
use std::time::Instant;

use crate::cache::ReadCache;
use crate::config::EngineConfig;
use crate::deadzone::DeadZoneTracker;
use crate::error::{EngineError, Result};
use crate::genome::Genome;
use crate::interval::Interval;
use crate::profile::{ActivityProfile, ActivityState};
use crate::read::Pileup;
use crate::region::ActiveRegion;
use crate::scheduler::Scheduler;
use crate::trace::TrackWriter;

/// Boxed sink for trace output.
pub type TraceSink = Box<dyn Write + Send>;

/// Counters accumulated over one traversal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraversalStats {
    /// Regions handed to the scheduler, active and inactive.
    pub regions_emitted: u64,
    /// Regions that closed because their sites crossed the threshold.
    pub active_regions: u64,
    /// Total reads attached across all finalized regions (a read spanning
    /// two regions counts twice).
    pub reads_attached: u64,
    /// Reads lost to reservoir downsampling.
    pub reads_discarded: u64,
    /// True if the wall-clock budget expired before the stream ended.
    pub deadline_expired: bool,
}

/// The streaming active-region engine.
///
/// Construct with a validated [`EngineConfig`] and a [`Genome`] dictionary,
/// optionally wire up trace sinks, then [`run`](Self::run) it over a sorted
/// pileup stream.
#[derive(Debug)]
pub struct RegionEngine {
    config: EngineConfig,
    genome: Genome,
    activity_trace: Option<TrackWriter<TraceSink>>,
    region_trace: Option<TrackWriter<TraceSink>>,
    stats: TraversalStats,
}

impl RegionEngine {
    pub fn new(config: EngineConfig, genome: Genome) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            genome,
            activity_trace: None,
            region_trace: None,
            stats: TraversalStats::default(),
        })
    }

    /// Write the per-site activity profile to `sink` in IGV format.
    pub fn with_activity_trace(mut self, sink: TraceSink) -> Self {
        self.activity_trace = Some(TrackWriter::new(sink));
        self
    }

    /// Write finalized region decisions to `sink` in IGV format.
    pub fn with_region_trace(mut self, sink: TraceSink) -> Self {
        self.region_trace = Some(TrackWriter::new(sink));
        self
    }

    /// Counters from the most recent [`run`](Self::run).
    #[inline]
    pub fn stats(&self) -> &TraversalStats {
        &self.stats
    }

    /// Traverse the pileup stream and map/reduce the finalized regions.
    ///
    /// `activity` scores each pileup's site (ignored when preset regions are
    /// configured). `map` runs on the worker pool and must be a pure
    /// function of its region; `reduce` folds map results into `init` on the
    /// calling thread, strictly in genome order.
    ///
    /// The engine hands `map` nothing but the region itself. Reference
    /// sequence, annotations, or any other region-ordered context the
    /// analysis needs must be captured by the `map` closure and looked up
    /// there (shared immutably, since workers call it concurrently).
    ///
    /// On error, every region before the failure point has already been
    /// reduced; nothing at or after it is. Stats are valid either way.
    pub fn run<P, A, M, T, Map, Red>(
        &mut self,
        pileups: P,
        activity: A,
        map: Map,
        init: T,
        reduce: Red,
    ) -> Result<T>
    where
        P: Iterator<Item = Result<Pileup>> + Send,
        A: FnMut(&Pileup) -> Result<f64> + Send,
        M: Send,
        Map: Fn(ActiveRegion) -> Result<M> + Sync,
        Red: FnMut(M, T) -> T,
    {
        self.config.validate()?;
        let scheduler = Scheduler::new(self.config.worker_threads)?;
        self.stats = TraversalStats::default();

        if let Some(trace) = &mut self.activity_trace {
            trace.write_header("line", &["ActivityProfile"])?;
        }
        if let Some(trace) = &mut self.region_trace {
            trace.write_header("line", &["ActiveRegions"])?;
        }

        let profile = ActivityProfile::new(
            self.config.filter_width,
            self.config.filter_sigma,
            self.config.active_prob_threshold,
        )?;
        let cache = ReadCache::new(self.config.cache_capacity)?;

        // Preset regions bypass the profile entirely: they form the work
        // queue up front and every one is treated as active.
        let work_queue: VecDeque<ActiveRegion> = match &self.config.preset_regions {
            Some(regions) => regions
                .iter()
                .map(|interval| {
                    ActiveRegion::new(
                        *interval,
                        Vec::new(),
                        true,
                        self.config.extension,
                        self.genome.contig_length(interval.contig),
                    )
                })
                .collect(),
            None => VecDeque::new(),
        };

        let mut driver = Driver {
            pileups,
            activity,
            config: &self.config,
            genome: &self.genome,
            profile,
            cache,
            tracker: DeadZoneTracker::new(),
            work_queue,
            ready: VecDeque::new(),
            preset_mode: self.config.preset_regions.is_some(),
            last_locus: None,
            started: Instant::now(),
            finished: false,
            stats: &mut self.stats,
            activity_trace: self.activity_trace.as_mut(),
            region_trace: self.region_trace.as_mut(),
        };

        let output = scheduler.execute(&mut driver, map, init, reduce);
        drop(driver);

        // On the error path the traversal error matters more than a
        // trace-flush failure
        if output.is_ok() {
            if let Some(trace) = &mut self.activity_trace {
                trace.flush()?;
            }
            if let Some(trace) = &mut self.region_trace {
                trace.flush()?;
            }
        }
        output
    }
}

/// Single-pass traversal state. Yields finalized regions to the scheduler;
/// any ordering or analysis failure ends the stream with that error.
struct Driver<'a, P, A> {
    pileups: P,
    activity: A,
    config: &'a EngineConfig,
    genome: &'a Genome,
    profile: ActivityProfile,
    cache: ReadCache,
    tracker: DeadZoneTracker,
    work_queue: VecDeque<ActiveRegion>,
    ready: VecDeque<ActiveRegion>,
    preset_mode: bool,
    last_locus: Option<Interval>,
    started: Instant,
    finished: bool,
    stats: &'a mut TraversalStats,
    activity_trace: Option<&'a mut TrackWriter<TraceSink>>,
    region_trace: Option<&'a mut TrackWriter<TraceSink>>,
}

impl<P, A> Iterator for Driver<'_, P, A>
where
    P: Iterator<Item = Result<Pileup>>,
    A: FnMut(&Pileup) -> Result<f64>,
{
    type Item = Result<ActiveRegion>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(region) = self.ready.pop_front() {
                return Some(Ok(region));
            }
            if self.finished {
                return None;
            }
            if self.deadline_expired() {
                self.stats.deadline_expired = true;
                self.finished = true;
                if let Err(err) = self.finish() {
                    return Some(Err(err));
                }
                continue;
            }
            match self.pileups.next() {
                Some(Ok(pileup)) => {
                    if let Err(err) = self.ingest(pileup) {
                        self.finished = true;
                        return Some(Err(err));
                    }
                }
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(err));
                }
                None => {
                    self.finished = true;
                    if let Err(err) = self.finish() {
                        return Some(Err(err));
                    }
                }
            }
        }
    }
}

impl<P, A> Driver<'_, P, A>
where
    P: Iterator<Item = Result<Pileup>>,
    A: FnMut(&Pileup) -> Result<f64>,
{
    fn deadline_expired(&self) -> bool {
        self.config
            .deadline
            .is_some_and(|budget| self.started.elapsed() >= budget)
    }

    /// Consume one pileup: advance the dead zone, cache its reads, feed the
    /// activity profile, and finalize whatever became provably complete.
    fn ingest(&mut self, pileup: Pileup) -> Result<()> {
        let locus = pileup.locus;
        if let Some(prev) = self.last_locus {
            let advanced = locus.contig > prev.contig
                || (locus.contig == prev.contig && locus.start > prev.start);
            if !advanced {
                return Err(EngineError::OrderingViolation(format!(
                    "pileup locus {locus} does not advance past {prev}"
                )));
            }
            if locus.contig != prev.contig {
                self.cross_contig(locus.contig)?;
            }
        }
        self.last_locus = Some(locus);
        self.tracker.observe_locus(&locus);

        if !self.preset_mode {
            let prob = (self.activity)(&pileup)?;
            if let Some(trace) = self.activity_trace.as_deref_mut() {
                trace.write_row(self.genome, &locus, "activity", &[prob])?;
            }
            // A coverage gap breaks profile contiguity; flush what came
            // before the gap rather than bridging it
            if let Some(span) = self.profile.span() {
                if span.contig != locus.contig || locus.start != span.stop + 1 {
                    self.flush_profile()?;
                }
            }
            self.profile.add(
                ActivityState::new(locus, prob),
                self.genome.contig_length(locus.contig),
            )?;
            let regions = self.profile.pop_ready(
                self.config.extension,
                self.config.min_region_size,
                self.config.max_region_size,
                false,
            )?;
            self.work_queue.extend(regions);
        }

        for read in pileup.reads {
            self.tracker.observe_read(&read)?;
            self.cache.add(read)?;
        }

        self.drain_completed()
    }

    /// Leaving a contig proves every queued region on it complete.
    fn cross_contig(&mut self, new_contig: u32) -> Result<()> {
        self.flush_profile()?;
        while self
            .work_queue
            .front()
            .is_some_and(|region| region.interval().contig < new_contig)
        {
            self.finalize_head()?;
        }
        Ok(())
    }

    /// Force-close everything buffered in the profile into the work queue.
    fn flush_profile(&mut self) -> Result<()> {
        let regions = self.profile.pop_ready(
            self.config.extension,
            self.config.min_region_size,
            self.config.max_region_size,
            true,
        )?;
        self.work_queue.extend(regions);
        Ok(())
    }

    /// Finalize queue heads while the dead zone proves them complete.
    fn drain_completed(&mut self) -> Result<()> {
        while self
            .work_queue
            .front()
            .is_some_and(|region| self.tracker.is_complete(region))
        {
            self.finalize_head()?;
        }
        Ok(())
    }

    /// Attach reads to the head region and move it to the ready queue.
    ///
    /// Each cached read lands in exactly one of four buckets: attached and
    /// exhausted (moved into the region), attached and still live (cloned in,
    /// original re-cached for later regions), live but not overlapping
    /// (re-cached), or exhausted without overlapping anything (dropped).
    fn finalize_head(&mut self) -> Result<()> {
        let Some(mut region) = self.work_queue.pop_front() else {
            return Ok(());
        };

        self.stats.reads_discarded += self.cache.discarded_count();
        let contig = region.interval().contig;
        let stop = region.interval().stop;
        let mut kept = Vec::new();
        for read in self.cache.drain() {
            let span = read.span();
            let attaches = if self.config.attach_extended_reads {
                span.overlaps(region.extended())
            } else {
                span.overlaps(region.interval())
            };
            let exhausted =
                DeadZoneTracker::read_is_exhausted(&read, contig, stop, self.config.extension);
            match (attaches, exhausted) {
                (true, true) => region.add_read(read),
                (true, false) => {
                    region.add_read(read.clone());
                    kept.push(read);
                }
                (false, false) => kept.push(read),
                (false, true) => {}
            }
        }
        // Drained reads come back sorted, so re-adding preserves cache order
        for read in kept {
            self.cache.add(read)?;
        }

        self.stats.regions_emitted += 1;
        if region.is_active() {
            self.stats.active_regions += 1;
        }
        self.stats.reads_attached += region.read_count() as u64;

        if let Some(trace) = self.region_trace.as_deref_mut() {
            let (feature, value) = if region.is_active() {
                ("ACTIVE", 1.0)
            } else {
                ("INACTIVE", -1.0)
            };
            trace.write_row(self.genome, region.interval(), feature, &[value])?;
        }

        self.ready.push_back(region);
        Ok(())
    }

    /// End of stream (or deadline): force-close the profile, finalize the
    /// whole queue, and flush traces.
    fn finish(&mut self) -> Result<()> {
        self.flush_profile()?;
        while !self.work_queue.is_empty() {
            self.finalize_head()?;
        }
        self.stats.reads_discarded += self.cache.discarded_count();
        if let Some(trace) = self.activity_trace.as_deref_mut() {
            trace.flush()?;
        }
        if let Some(trace) = self.region_trace.as_deref_mut() {
            trace.flush()?;
        }
        Ok(())
    }
}
