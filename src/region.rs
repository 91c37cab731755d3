//! Finalized active regions ready for analysis.

use std::fmt;

use crate::interval::Interval;
use crate::read::Read;

/// A contiguous span of the genome selected for analysis as a single unit.
///
/// Carries the core interval (the bases whose activity decided the
/// boundaries), an extended interval used only for read attachment, the
/// smoothed per-site probabilities that supported the close, and, once
/// finalized, every cached read overlapping the core (or, when the
/// analysis opts in, the extension). `is_active` records whether the region
/// closed because its sites crossed the activity threshold, or only because
/// the engine forced a flush (end of contig, traversal shutdown).
///
/// Once handed to the scheduler a region is logically immutable and may be
/// read freely from worker threads.
#[derive(Debug, Clone)]
pub struct ActiveRegion {
    interval: Interval,
    extended: Interval,
    is_active: bool,
    supporting_probs: Vec<f64>,
    reads: Vec<Read>,
}

impl ActiveRegion {
    /// Create a region with no reads attached yet.
    ///
    /// `supporting_probs`, when non-empty, must hold exactly one smoothed
    /// probability per base of `interval`. The extended interval is clamped
    /// to `[1, contig_length]`.
    pub fn new(
        interval: Interval,
        supporting_probs: Vec<f64>,
        is_active: bool,
        extension: u64,
        contig_length: u64,
    ) -> Self {
        debug_assert!(
            supporting_probs.is_empty() || supporting_probs.len() as u64 == interval.span(),
            "supporting probabilities must cover the region exactly"
        );
        let extended = interval.padded(extension, contig_length);
        Self {
            interval,
            extended,
            is_active,
            supporting_probs,
            reads: Vec::new(),
        }
    }

    /// The core span of this region, excluding the extension.
    #[inline]
    pub fn interval(&self) -> &Interval {
        &self.interval
    }

    /// The span including the extension, clamped to the contig.
    #[inline]
    pub fn extended(&self) -> &Interval {
        &self.extended
    }

    /// Did this region close because its sites crossed the activity
    /// threshold (true), or only because the engine forced a flush (false)?
    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// The smoothed per-site probabilities behind the close. Empty for
    /// preset regions.
    #[inline]
    pub fn supporting_probs(&self) -> &[f64] {
        &self.supporting_probs
    }

    /// Reads attached by the finalizer, in alignment-start order.
    #[inline]
    pub fn reads(&self) -> &[Read] {
        &self.reads
    }

    /// Number of attached reads.
    #[inline]
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    /// Attach a read. Called only by the finalizer, before handoff to the
    /// scheduler.
    pub(crate) fn add_read(&mut self, read: Read) {
        self.reads.push(read);
    }
}

impl fmt::Display for ActiveRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ActiveRegion {} active?={} nReads={}",
            self.interval,
            self.is_active,
            self.reads.len()
        )
    }
}
