//! Bounded read cache with reservoir-sampling overflow.
//!
//! While the number of held reads stays at or below capacity the cache is
//! exact. The first capacity-exceeding add switches it, one way, to a
//! fixed-size uniform reservoir sample with a discard counter. The switch
//! trades exactness for a hard memory ceiling under pathological coverage
//! depth (PCR duplication piles and the like); it is a documented policy,
//! not an error, and is undone only by draining.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{EngineError, Result};
use crate::read::Read;

/// Minimum number of reads before drain uses a parallel sort.
const PARALLEL_SORT_THRESHOLD: usize = 10_000;

/// The two internal representations. The transition from `Exact` to
/// `Reservoir` is one-way until the cache is drained.
#[derive(Debug)]
enum Storage {
    /// Exact ordered list; nothing has been lost.
    Exact(Vec<Read>),
    /// Fixed-size uniform sample over everything added since the cutover.
    Reservoir {
        sample: Vec<Read>,
        /// Total reads offered to the reservoir, including the pre-cutover
        /// contents.
        seen: u64,
        discarded: u64,
    },
}

/// A bounded cache of coordinate-sorted reads.
#[derive(Debug)]
pub struct ReadCache {
    capacity: usize,
    storage: Storage,
    rng: SmallRng,
}

impl ReadCache {
    /// Create a cache holding at most `capacity` reads.
    pub fn new(capacity: usize) -> Result<Self> {
        Self::from_rng(capacity, SmallRng::from_entropy())
    }

    /// Create a cache with a deterministic reservoir, for reproducible runs.
    pub fn with_seed(capacity: usize, seed: u64) -> Result<Self> {
        Self::from_rng(capacity, SmallRng::seed_from_u64(seed))
    }

    fn from_rng(capacity: usize, rng: SmallRng) -> Result<Self> {
        if capacity == 0 {
            return Err(EngineError::Config(
                "read cache capacity must be >= 1".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            storage: Storage::Exact(Vec::new()),
            rng,
        })
    }

    /// The configured capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of reads currently held.
    #[inline]
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Exact(reads) => reads.len(),
            Storage::Reservoir { sample, .. } => sample.len(),
        }
    }

    /// Check if the cache holds no reads.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once the exact-to-reservoir cutover has happened.
    #[inline]
    pub fn is_downsampling(&self) -> bool {
        matches!(self.storage, Storage::Reservoir { .. })
    }

    /// Number of reads lost to downsampling since the last drain.
    /// Always 0 before the cutover (exact mode loses nothing).
    #[inline]
    pub fn discarded_count(&self) -> u64 {
        match &self.storage {
            Storage::Exact(_) => 0,
            Storage::Reservoir { discarded, .. } => *discarded,
        }
    }

    /// Add a read, assumed to arrive in non-decreasing start order.
    ///
    /// The capacity-exceeding add performs the one-way cutover to reservoir
    /// sampling. Unmapped reads have no coordinate and are a caller contract
    /// violation.
    pub fn add(&mut self, read: Read) -> Result<()> {
        if read.is_unmapped() {
            return Err(EngineError::OrderingViolation(format!(
                "unmapped read {} cannot be cached: it has no alignment coordinate",
                read.name()
            )));
        }

        if let Storage::Exact(reads) = &mut self.storage {
            if reads.len() < self.capacity {
                reads.push(read);
                return Ok(());
            }
            // Cutover: the exact contents become the sample verbatim
            let sample = std::mem::take(reads);
            self.storage = Storage::Reservoir {
                sample,
                seen: self.capacity as u64,
                discarded: 0,
            };
        }
        self.offer(read);
        Ok(())
    }

    /// Offer a read to the reservoir (algorithm R): read number n replaces a
    /// uniformly random slot with probability capacity/n.
    fn offer(&mut self, read: Read) {
        let Storage::Reservoir {
            sample,
            seen,
            discarded,
        } = &mut self.storage
        else {
            unreachable!("offer called in exact mode");
        };

        *seen += 1;
        *discarded += 1;
        let slot = self.rng.gen_range(0..*seen);
        if (slot as usize) < sample.len() {
            sample[slot as usize] = read;
        }
    }

    /// Return all held reads sorted by alignment start and reset the cache
    /// to empty exact mode.
    ///
    /// Exact-mode contents are already sorted (adds arrive in order) and are
    /// returned as-is; a reservoir does not preserve relative order, so its
    /// sample is re-sorted here.
    pub fn drain(&mut self) -> Vec<Read> {
        let storage = std::mem::replace(&mut self.storage, Storage::Exact(Vec::new()));
        match storage {
            Storage::Exact(reads) => reads,
            Storage::Reservoir { mut sample, .. } => {
                if sample.len() >= PARALLEL_SORT_THRESHOLD {
                    sample.par_sort_unstable_by_key(|r| (r.contig(), r.start(), r.stop()));
                } else {
                    sample.sort_unstable_by_key(|r| (r.contig(), r.start(), r.stop()));
                }
                sample
            }
        }
    }
}
