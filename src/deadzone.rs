//! Live/dead zone accounting over the sorted read stream.
//!
//! The tracker maintains a single monotone boundary: the span of the last
//! read observed. Because the input is coordinate-sorted, every read not yet
//! seen must start at or after that boundary. Any region whose extended
//! interval falls entirely before the boundary is therefore provably
//! complete: no future read can overlap it, so it is safe to finalize. The
//! same monotonicity check is what catches out-of-order inputs, which would
//! silently invalidate that proof.

use crate::error::{EngineError, Result};
use crate::interval::Interval;
use crate::read::Read;
use crate::region::ActiveRegion;

/// Tracks the frontier between the dead zone (no future read can land
/// there) and the live zone (reads may still arrive).
#[derive(Debug, Default)]
pub struct DeadZoneTracker {
    /// Span of the last read seen. Everything strictly before its start is
    /// dead. None until the first read arrives.
    boundary: Option<Interval>,
}

impl DeadZoneTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current boundary span, if any read has been seen.
    #[inline]
    pub fn boundary(&self) -> Option<Interval> {
        self.boundary
    }

    /// Record a read's position, advancing the boundary.
    ///
    /// Fails if the read starts before the current boundary start: the
    /// stream is not sorted and the completeness proof no longer holds.
    pub fn observe_read(&mut self, read: &Read) -> Result<()> {
        if read.is_unmapped() {
            return Err(EngineError::OrderingViolation(format!(
                "unmapped read {} has no position and cannot advance the dead zone",
                read.name()
            )));
        }
        if let Some(boundary) = &self.boundary {
            let regressed = read.contig() < boundary.contig
                || (read.contig() == boundary.contig && read.start() < boundary.start);
            if regressed {
                return Err(EngineError::OrderingViolation(format!(
                    "read {} at {} starts before the last seen read at {}",
                    read.name(),
                    read.span(),
                    boundary
                )));
            }
        }
        self.boundary = Some(read.span());
        Ok(())
    }

    /// Advance the boundary past a coverage gap: a locus with no reads
    /// proves nothing starts before it either. Only ever moves forward.
    pub fn observe_locus(&mut self, locus: &Interval) {
        match &self.boundary {
            Some(boundary) if !locus.is_past(boundary) => {}
            _ => self.boundary = Some(*locus),
        }
    }

    /// True if the region's extended interval lies entirely in the dead
    /// zone, so its read set is provably complete.
    ///
    /// With no boundary yet, nothing is provably complete.
    pub fn is_complete(&self, region: &ActiveRegion) -> bool {
        let Some(boundary) = &self.boundary else {
            return false;
        };
        let extended = region.extended();
        extended.contig < boundary.contig
            || (extended.contig == boundary.contig && extended.stop < boundary.start)
    }

    /// True if this read can no longer overlap any region at or after
    /// `region_stop` on `region_contig`, given the configured extension.
    /// Such reads are dropped at finalization instead of being re-cached.
    pub fn read_is_exhausted(read: &Read, region_contig: u32, region_stop: u64, extension: u64) -> bool {
        read.contig() < region_contig
            || (read.contig() == region_contig && read.stop() + extension < region_stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(contig: u32, start: u64, stop: u64, extension: u64) -> ActiveRegion {
        ActiveRegion::new(Interval::new(contig, start, stop), vec![], true, extension, 0)
    }

    #[test]
    fn test_nothing_complete_before_first_read() {
        let tracker = DeadZoneTracker::new();
        assert!(!tracker.is_complete(&region(0, 1, 100, 0)));
    }

    #[test]
    fn test_boundary_advances_and_proves_completeness() {
        let mut tracker = DeadZoneTracker::new();
        tracker.observe_read(&Read::new("r1", 0, 500, 600)).unwrap();

        // Extended stop 450 < boundary start 500: complete
        assert!(tracker.is_complete(&region(0, 100, 400, 50)));
        // Extended stop 500 touches the boundary start: a read at 500 could
        // still overlap, so not complete
        assert!(!tracker.is_complete(&region(0, 100, 450, 50)));
    }

    #[test]
    fn test_earlier_contig_is_complete() {
        let mut tracker = DeadZoneTracker::new();
        tracker.observe_read(&Read::new("r1", 1, 10, 100)).unwrap();
        assert!(tracker.is_complete(&region(0, 1, 1_000_000, 100)));
    }

    #[test]
    fn test_regression_is_rejected() {
        let mut tracker = DeadZoneTracker::new();
        tracker.observe_read(&Read::new("r1", 0, 500, 600)).unwrap();

        let result = tracker.observe_read(&Read::new("r2", 0, 499, 700));
        assert!(matches!(result, Err(EngineError::OrderingViolation(_))));

        let result = tracker.observe_read(&Read::new("r3", 1, 1, 50));
        assert!(result.is_ok());
        let result = tracker.observe_read(&Read::new("r4", 0, 900, 950));
        assert!(matches!(result, Err(EngineError::OrderingViolation(_))));
    }

    #[test]
    fn test_same_start_is_allowed() {
        let mut tracker = DeadZoneTracker::new();
        tracker.observe_read(&Read::new("r1", 0, 500, 600)).unwrap();
        assert!(tracker.observe_read(&Read::new("r2", 0, 500, 550)).is_ok());
    }

    #[test]
    fn test_unmapped_read_rejected() {
        let mut tracker = DeadZoneTracker::new();
        let result = tracker.observe_read(&Read::unmapped("floater"));
        assert!(matches!(result, Err(EngineError::OrderingViolation(_))));
    }

    #[test]
    fn test_locus_advances_boundary_over_gaps() {
        let mut tracker = DeadZoneTracker::new();
        tracker.observe_read(&Read::new("r1", 0, 100, 200)).unwrap();

        // Walking loci through a coverage desert keeps the proof moving
        tracker.observe_locus(&Interval::locus(0, 5000));
        assert!(tracker.is_complete(&region(0, 1000, 2000, 50)));

        // A locus behind the boundary never moves it backwards
        tracker.observe_locus(&Interval::locus(0, 10));
        assert_eq!(tracker.boundary().map(|b| b.start), Some(5000));
    }

    #[test]
    fn test_read_exhaustion() {
        // Read stop 100 + extension 50 = 150 < region stop 200: exhausted
        let read = Read::new("r1", 0, 50, 100);
        assert!(DeadZoneTracker::read_is_exhausted(&read, 0, 200, 50));
        assert!(!DeadZoneTracker::read_is_exhausted(&read, 0, 150, 50));
        // Earlier contig is always exhausted
        assert!(DeadZoneTracker::read_is_exhausted(&read, 1, 1, 0));
    }
}
