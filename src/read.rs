//! Aligned read and per-locus pileup value types.
//!
//! Reads carry only what the engine needs: a coordinate span and an opaque
//! payload. Base sequence, qualities, and tags are caller business and pass
//! through untouched. The engine's hard precondition is that reads arrive
//! sorted by (contig, alignment start), non-decreasing.

use crate::interval::Interval;

/// A single aligned sequencing read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Read {
    name: String,
    contig: u32,
    start: u64,
    stop: u64,
    unmapped: bool,
    /// Opaque payload bytes (sequence, qualities, tags) carried through the
    /// engine untouched.
    payload: Vec<u8>,
}

impl Read {
    /// Create a mapped read spanning `[start, stop]` on `contig`.
    pub fn new(name: impl Into<String>, contig: u32, start: u64, stop: u64) -> Self {
        Self {
            name: name.into(),
            contig,
            start,
            stop,
            unmapped: false,
            payload: Vec::new(),
        }
    }

    /// Create an unmapped read. Unmapped reads have no usable coordinates
    /// and are rejected by the cache and the dead-zone tracker.
    pub fn unmapped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contig: 0,
            start: 0,
            stop: 0,
            unmapped: true,
            payload: Vec::new(),
        }
    }

    /// Attach payload bytes to this read.
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// The read name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reference contig index.
    #[inline]
    pub fn contig(&self) -> u32 {
        self.contig
    }

    /// 1-based alignment start.
    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// 1-based inclusive alignment stop.
    #[inline]
    pub fn stop(&self) -> u64 {
        self.stop
    }

    /// True if this read has no alignment.
    #[inline]
    pub fn is_unmapped(&self) -> bool {
        self.unmapped
    }

    /// The alignment span as an interval.
    #[inline]
    pub fn span(&self) -> Interval {
        Interval::new(self.contig, self.start, self.stop)
    }

    /// The opaque payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// One locus of the input stream: a length-1 interval plus the reads whose
/// alignments first become visible at that locus.
///
/// The stream of pileups must walk each contig left to right, one base at a
/// time, and every read must appear in exactly one pileup.
#[derive(Debug, Clone)]
pub struct Pileup {
    pub locus: Interval,
    pub reads: Vec<Read>,
}

impl Pileup {
    /// A pileup at `locus` carrying `reads`.
    pub fn new(locus: Interval, reads: Vec<Read>) -> Self {
        Self { locus, reads }
    }

    /// A coverage-free pileup (no new reads at this locus).
    pub fn empty(locus: Interval) -> Self {
        Self::new(locus, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_span() {
        let read = Read::new("r1", 0, 100, 150);
        assert_eq!(read.span(), Interval::new(0, 100, 150));
        assert!(!read.is_unmapped());
    }

    #[test]
    fn test_unmapped_read() {
        let read = Read::unmapped("r2");
        assert!(read.is_unmapped());
    }

    #[test]
    fn test_payload_roundtrip() {
        let read = Read::new("r3", 0, 1, 10).with_payload(b"ACGT".to_vec());
        assert_eq!(read.payload(), b"ACGT");
    }
}
