//! Core interval type for genomic region representation.
//!
//! Uses 1-based, fully-closed coordinates: an interval covers every base
//! from `start` through `stop` inclusive. Contigs are referenced by their
//! index in a [`crate::genome::Genome`] dictionary so comparisons follow
//! genome order rather than lexicographic chromosome names.

use std::cmp::Ordering;
use std::fmt;

/// A genomic interval with contig index, start, and stop positions.
/// 1-based, inclusive on both ends. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub contig: u32,
    pub start: u64,
    pub stop: u64,
}

impl Interval {
    /// Create a new interval.
    #[inline]
    pub fn new(contig: u32, start: u64, stop: u64) -> Self {
        Self {
            contig,
            start,
            stop,
        }
    }

    /// Create a length-1 interval at a single position.
    #[inline]
    pub fn locus(contig: u32, pos: u64) -> Self {
        Self::new(contig, pos, pos)
    }

    /// Number of bases covered by the interval.
    #[inline]
    pub fn span(&self) -> u64 {
        self.stop.saturating_sub(self.start) + 1
    }

    /// Check if this interval overlaps another.
    #[inline]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.contig == other.contig && self.start <= other.stop && other.start <= self.stop
    }

    /// True if this interval ends before the other starts (no overlap possible).
    #[inline]
    pub fn is_before(&self, other: &Interval) -> bool {
        self.contig < other.contig || (self.contig == other.contig && self.stop < other.start)
    }

    /// True if this interval starts after the other ends.
    #[inline]
    pub fn is_past(&self, other: &Interval) -> bool {
        other.is_before(self)
    }

    /// True if this interval fully contains the other.
    #[inline]
    pub fn contains(&self, other: &Interval) -> bool {
        self.contig == other.contig && self.start <= other.start && other.stop <= self.stop
    }

    /// Symmetrically extend by `padding` bases, clamped to `[1, contig_length]`.
    ///
    /// A `contig_length` of 0 means the length is unknown and only the lower
    /// bound is enforced.
    #[inline]
    pub fn padded(&self, padding: u64, contig_length: u64) -> Interval {
        let start = self.start.saturating_sub(padding).max(1);
        let stop = if contig_length > 0 {
            (self.stop + padding).min(contig_length)
        } else {
            self.stop + padding
        };
        Interval::new(self.contig, start, stop)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.contig, self.start, self.stop)
    }
}

impl Ord for Interval {
    fn cmp(&self, other: &Self) -> Ordering {
        self.contig
            .cmp(&other.contig)
            .then(self.start.cmp(&other.start))
            .then(self.stop.cmp(&other.stop))
    }
}

impl PartialOrd for Interval {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_inclusive() {
        assert_eq!(Interval::new(0, 100, 100).span(), 1);
        assert_eq!(Interval::new(0, 100, 199).span(), 100);
    }

    #[test]
    fn test_overlap() {
        let a = Interval::new(0, 100, 200);
        let b = Interval::new(0, 200, 300);
        let c = Interval::new(0, 201, 300);
        let d = Interval::new(1, 100, 200);

        assert!(a.overlaps(&b)); // Closed coordinates: touching at 200 overlaps
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&d)); // Different contig
    }

    #[test]
    fn test_before_past() {
        let a = Interval::new(0, 100, 200);
        let b = Interval::new(0, 201, 300);
        let c = Interval::new(1, 1, 50);

        assert!(a.is_before(&b));
        assert!(b.is_past(&a));
        assert!(a.is_before(&c));
        assert!(!b.is_before(&a));
    }

    #[test]
    fn test_padded_clamps_to_contig() {
        let a = Interval::new(0, 50, 950);
        let padded = a.padded(100, 1000);
        assert_eq!(padded.start, 1);
        assert_eq!(padded.stop, 1000);

        let unclamped = a.padded(100, 0);
        assert_eq!(unclamped.stop, 1050);
    }

    #[test]
    fn test_ordering() {
        let mut intervals = [
            Interval::new(1, 100, 200),
            Interval::new(0, 200, 300),
            Interval::new(0, 100, 200),
        ];
        intervals.sort();

        assert_eq!(intervals[0], Interval::new(0, 100, 200));
        assert_eq!(intervals[1], Interval::new(0, 200, 300));
        assert_eq!(intervals[2], Interval::new(1, 100, 200));
    }
}
