// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! RASP: Region Assembly from Streaming Pileups
//!
//! A streaming engine that segments a genome into active regions from a
//! single left-to-right pass over coordinate-sorted per-base pileups, and
//! runs an analysis over each region on a worker pool with deterministic,
//! genome-ordered output.
//!
//! # Features
//!
//! - **Single-pass streaming**: Bounded memory over arbitrarily long inputs
//! - **Band-pass segmentation**: Gaussian-smoothed activity signal with
//!   min/max region size control
//! - **Provably complete regions**: Dead-zone tracking guarantees every
//!   region sees all of its overlapping reads before analysis starts
//! - **Ordered parallelism**: Map in parallel, reduce in genome order; the
//!   result never depends on thread count
//!
//! # Example
//!
//! ```rust,no_run
//! use rasp_genomics::prelude::*;
//!
//! let mut genome = Genome::new();
//! genome.insert("chr1", 1_000_000);
//!
//! let mut engine = RegionEngine::new(EngineConfig::default(), genome).unwrap();
//! let pileups = std::iter::empty(); // a sorted pileup stream
//! let total_reads = engine
//!     .run(
//!         pileups,
//!         |pileup: &Pileup| Ok(if pileup.reads.is_empty() { 0.0 } else { 0.5 }),
//!         |region: ActiveRegion| Ok(region.read_count()),
//!         0usize,
//!         |n, acc| acc + n,
//!     )
//!     .unwrap();
//! println!("attached {total_reads} reads");
//! ```

pub mod cache;
pub mod config;
pub mod deadzone;
pub mod engine;
pub mod error;
pub mod genome;
pub mod interval;
pub mod profile;
pub mod read;
pub mod region;
pub mod scheduler;
pub mod trace;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::{RegionEngine, TraversalStats};
pub use error::{EngineError, Result};
pub use genome::Genome;
pub use interval::Interval;
pub use read::{Pileup, Read};
pub use region::ActiveRegion;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::cache::ReadCache;
    pub use crate::config::EngineConfig;
    pub use crate::deadzone::DeadZoneTracker;
    pub use crate::engine::{RegionEngine, TraceSink, TraversalStats};
    pub use crate::error::{EngineError, Result};
    pub use crate::genome::Genome;
    pub use crate::interval::Interval;
    pub use crate::profile::{ActivityProfile, ActivityState};
    pub use crate::read::{Pileup, Read};
    pub use crate::region::ActiveRegion;
    pub use crate::scheduler::Scheduler;
    pub use crate::trace::TrackWriter;
}
