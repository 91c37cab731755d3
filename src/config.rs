//! Engine configuration with fail-fast validation.

use std::time::Duration;

use crate::error::{EngineError, Result};
use crate::interval::Interval;

/// Configuration for a region traversal.
///
/// All sizes and distances are in bp. Construction of a
/// [`crate::engine::RegionEngine`] validates the whole configuration up
/// front; a bad value never gets as far as the traversal loop.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Symmetric margin added to each region's core interval for read
    /// attachment. Never changes the active/inactive decision.
    pub extension: u64,
    /// Minimum region size. Activity flips closer to the region start than
    /// this are absorbed rather than closing the region.
    pub min_region_size: u64,
    /// Maximum region size. Reaching it closes the region immediately, even
    /// mid-activity.
    pub max_region_size: u64,
    /// Half-width of the band-pass smoothing kernel; the full window is
    /// `2 * filter_width + 1` sites.
    pub filter_width: u64,
    /// Standard deviation of the Gaussian the kernel weights are drawn from.
    pub filter_sigma: f64,
    /// Smoothed probability above which a site counts as active.
    pub active_prob_threshold: f64,
    /// Worker pool size for the map phase. 1 degenerates to strictly
    /// sequential execution.
    pub worker_threads: usize,
    /// Maximum number of reads held by the cache before reservoir
    /// downsampling kicks in.
    pub cache_capacity: usize,
    /// Attach reads that overlap only the extended interval, not the core.
    pub attach_extended_reads: bool,
    /// Optional wall-clock budget. Checked between pileups; on expiry the
    /// driver stops consuming input, force-finalizes buffered state, and
    /// in-flight work drains normally.
    pub deadline: Option<Duration>,
    /// Optional pre-supplied region boundaries, globally sorted. When set,
    /// the activity profile is bypassed entirely and every region is marked
    /// active; dead-zone gating and read attachment still apply.
    pub preset_regions: Option<Vec<Interval>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            extension: 50,
            min_region_size: 50,
            max_region_size: 300,
            filter_width: 50,
            filter_sigma: 17.0,
            active_prob_threshold: 0.002,
            worker_threads: default_worker_threads(),
            cache_capacity: 2_500_000,
            attach_extended_reads: false,
            deadline: None,
            preset_regions: None,
        }
    }
}

/// Hardware concurrency, falling back to 1 if it cannot be determined.
pub fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl EngineConfig {
    /// Validate the configuration, failing fast on any inconsistency.
    pub fn validate(&self) -> Result<()> {
        if self.min_region_size == 0 {
            return Err(EngineError::Config(
                "min_region_size must be >= 1".to_string(),
            ));
        }
        if self.min_region_size > self.max_region_size {
            return Err(EngineError::Config(format!(
                "min_region_size ({}) must not exceed max_region_size ({})",
                self.min_region_size, self.max_region_size
            )));
        }
        if self.worker_threads == 0 {
            return Err(EngineError::Config(
                "worker_threads must be >= 1".to_string(),
            ));
        }
        if self.cache_capacity == 0 {
            return Err(EngineError::Config(
                "cache_capacity must be >= 1".to_string(),
            ));
        }
        if !(self.filter_sigma > 0.0) {
            return Err(EngineError::Config(format!(
                "filter_sigma must be positive, got {}",
                self.filter_sigma
            )));
        }
        if !(0.0..=1.0).contains(&self.active_prob_threshold) {
            return Err(EngineError::Config(format!(
                "active_prob_threshold must be within [0, 1], got {}",
                self.active_prob_threshold
            )));
        }
        if let Some(regions) = &self.preset_regions {
            self.validate_preset_regions(regions)?;
        }
        Ok(())
    }

    fn validate_preset_regions(&self, regions: &[Interval]) -> Result<()> {
        for window in regions.windows(2) {
            let (prev, next) = (&window[0], &window[1]);
            if !prev.is_before(next) {
                return Err(EngineError::Config(format!(
                    "preset regions must be sorted and non-overlapping, but {prev} is not before {next}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let config = EngineConfig {
            cache_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(EngineError::Config(_))));
    }

    #[test]
    fn test_rejects_min_above_max() {
        let config = EngineConfig {
            min_region_size: 500,
            max_region_size: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_workers() {
        let config = EngineConfig {
            worker_threads: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_sigma_and_threshold() {
        let config = EngineConfig {
            filter_sigma: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            active_prob_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_overlapping_preset_regions() {
        let config = EngineConfig {
            preset_regions: Some(vec![Interval::new(0, 1, 100), Interval::new(0, 50, 150)]),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            preset_regions: Some(vec![Interval::new(0, 1, 100), Interval::new(0, 101, 200)]),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
