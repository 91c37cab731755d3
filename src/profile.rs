//! Per-site activity probabilities, band-pass smoothed and segmented into
//! region candidates.
//!
//! The profile consumes one raw probability per site, in strict coordinate
//! order. Each raw value is spread over a Gaussian-weighted window before it
//! contributes to any boundary decision, so isolated spikes recruit their
//! neighborhood and ragged signals coalesce. Candidates are popped off the
//! front of the profile only once enough trailing context exists that no
//! pending probability mass can still change the decision, or when a flush
//! is forced at a contig end.

use std::collections::VecDeque;

use crate::error::{EngineError, Result};
use crate::interval::Interval;
use crate::region::ActiveRegion;

/// One site's activity result: a length-1 locus and the probability that it
/// belongs inside an active region. Produced once per site, consumed once.
#[derive(Debug, Clone, Copy)]
pub struct ActivityState {
    pub locus: Interval,
    pub prob: f64,
}

impl ActivityState {
    pub fn new(locus: Interval, prob: f64) -> Self {
        Self { locus, prob }
    }
}

/// Span bookkeeping for the buffered stretch of profile.
#[derive(Debug, Clone, Copy)]
struct ProfileSpan {
    contig: u32,
    /// Position of the first buffered probability.
    start: u64,
    /// Position of the last *raw* site added. Smoothing may have pushed
    /// probabilities past this; those are trimmed on a forced flush.
    raw_stop: u64,
    contig_length: u64,
}

/// The smoothed activity signal over the current stretch of genome.
#[derive(Debug)]
pub struct ActivityProfile {
    kernel: Vec<f64>,
    width: u64,
    threshold: f64,
    span: Option<ProfileSpan>,
    probs: VecDeque<f64>,
}

impl ActivityProfile {
    /// Create an empty profile.
    ///
    /// `width` is the kernel half-width (full window `2 * width + 1`),
    /// `sigma` the Gaussian spread of the weights, `threshold` the smoothed
    /// probability above which a site counts as active.
    pub fn new(width: u64, sigma: f64, threshold: f64) -> Result<Self> {
        if !(sigma > 0.0) {
            return Err(EngineError::Config(format!(
                "band-pass sigma must be positive, got {sigma}"
            )));
        }
        if !(0.0..=1.0).contains(&threshold) {
            return Err(EngineError::Config(format!(
                "activity threshold must be within [0, 1], got {threshold}"
            )));
        }
        Ok(Self {
            kernel: gaussian_kernel(width, sigma),
            width,
            threshold,
            span: None,
            probs: VecDeque::new(),
        })
    }

    /// Number of buffered sites (including smoothing spill-over past the
    /// last raw site).
    #[inline]
    pub fn len(&self) -> usize {
        self.probs.len()
    }

    /// True if no sites are buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// The raw span currently buffered: first buffered site through the last
    /// raw site added. None when empty.
    pub fn span(&self) -> Option<Interval> {
        self.span
            .map(|s| Interval::new(s.contig, s.start, s.raw_stop))
    }

    /// Append the next site's activity state.
    ///
    /// Sites must be contiguous and in increasing coordinate order on a
    /// single contig; the engine force-flushes the profile across contig
    /// switches and coverage gaps before adding the first state beyond them.
    /// `contig_length` bounds the smoothing spill at contig edges (0 if
    /// unknown).
    pub fn add(&mut self, state: ActivityState, contig_length: u64) -> Result<()> {
        if !state.prob.is_finite() || !(0.0..=1.0).contains(&state.prob) {
            return Err(EngineError::Analysis(format!(
                "activity probability at {} must be within [0, 1], got {}",
                state.locus, state.prob
            )));
        }

        let span = match &mut self.span {
            None => {
                let span = ProfileSpan {
                    contig: state.locus.contig,
                    start: state.locus.start,
                    raw_stop: state.locus.start,
                    contig_length,
                };
                self.span = Some(span);
                span
            }
            Some(span) => {
                if state.locus.contig != span.contig || state.locus.start != span.raw_stop + 1 {
                    return Err(EngineError::OrderingViolation(format!(
                        "activity state at {} is not immediately after profile stop {}:{}",
                        state.locus, span.contig, span.raw_stop
                    )));
                }
                span.raw_stop = state.locus.start;
                *span
            }
        };

        if state.prob > 0.0 {
            self.spread(span, state.locus.start, state.prob);
        } else {
            // A zero never moves mass anywhere; just occupy the site
            self.incorporate(span.start, state.locus.start, 0.0);
        }
        Ok(())
    }

    /// Spread a raw probability over the kernel window around `center`.
    fn spread(&mut self, span: ProfileSpan, center: u64, prob: f64) {
        let width = self.width as i64;
        for offset in -width..=width {
            let pos = center as i64 + offset;
            if pos < 1 {
                continue;
            }
            let pos = pos as u64;
            if span.contig_length > 0 && pos > span.contig_length {
                continue;
            }
            let weight = self.kernel[(offset + width) as usize];
            self.incorporate(span.start, pos, weight * prob);
        }
    }

    /// Accumulate probability mass at an absolute position. Positions before
    /// the profile start are dropped; the position one past the current end
    /// extends the buffer. Window-ordered spreading guarantees nothing
    /// further out ever arrives.
    fn incorporate(&mut self, start: u64, pos: u64, prob: f64) {
        if pos < start {
            return;
        }
        let idx = (pos - start) as usize;
        if idx < self.probs.len() {
            self.probs[idx] += prob;
        } else {
            debug_assert_eq!(idx, self.probs.len());
            self.probs.push_back(prob);
        }
    }

    /// Pop all region candidates that are ready, leaving unfinished state in
    /// the profile.
    ///
    /// Without `force`, a candidate only closes once `max_size + width`
    /// sites are buffered beyond the profile start, so no future addition
    /// can change its boundary. With `force`, everything left is closed out
    /// (used at contig ends and traversal shutdown), after trimming the
    /// smoothing spill past the last raw site so no candidate covers bases
    /// the data never reached.
    pub fn pop_ready(
        &mut self,
        extension: u64,
        min_size: u64,
        max_size: u64,
        force: bool,
    ) -> Result<Vec<ActiveRegion>> {
        if min_size == 0 {
            return Err(EngineError::Config("min_size must be >= 1".to_string()));
        }
        if max_size < min_size {
            return Err(EngineError::Config(format!(
                "max_size ({max_size}) must be >= min_size ({min_size})"
            )));
        }

        let mut regions = Vec::new();
        while let Some(region) = self.pop_next(extension, min_size, max_size, force) {
            regions.push(region);
        }
        Ok(regions)
    }

    fn pop_next(
        &mut self,
        extension: u64,
        min_size: u64,
        max_size: u64,
        force: bool,
    ) -> Option<ActiveRegion> {
        let span = self.span?;
        if self.probs.is_empty() {
            return None;
        }

        if force {
            // Trim smoothing spill-over beyond the last raw site. A close
            // at max size can leave the buffer holding nothing but spill
            // (start one past raw_stop), in which case everything goes.
            let raw_len = if span.raw_stop >= span.start {
                (span.raw_stop - span.start + 1) as usize
            } else {
                0
            };
            self.probs.truncate(raw_len);
            if self.probs.is_empty() {
                self.span = None;
                return None;
            }
        } else if (self.probs.len() as u64) < max_size + self.width {
            // Pending probability mass could still change the decision
            return None;
        }

        let first_active = self.probs[0] > self.threshold;
        let mut current = first_active;
        let mut end = 0usize;
        while end < self.probs.len() && (end as u64) < max_size {
            let active = self.probs[end] > self.threshold;
            if active != current {
                if (end as u64) >= min_size {
                    break;
                }
                // Too small to close: absorb the flip and keep accumulating
                current = active;
            }
            end += 1;
        }

        let supporting: Vec<f64> = self.probs.drain(..end).collect();
        let interval = Interval::new(span.contig, span.start, span.start + end as u64 - 1);

        if self.probs.is_empty() {
            self.span = None;
        } else if let Some(span) = &mut self.span {
            span.start += end as u64;
        }

        Some(ActiveRegion::new(
            interval,
            supporting,
            first_active,
            extension,
            span.contig_length,
        ))
    }
}

/// Gaussian kernel over `2 * width + 1` taps, normalized to sum to 1.
fn gaussian_kernel(width: u64, sigma: f64) -> Vec<f64> {
    let n = (2 * width + 1) as usize;
    let mut kernel = Vec::with_capacity(n);
    for i in 0..n {
        let x = (i as f64 - width as f64) / sigma;
        kernel.push((-0.5 * x * x).exp());
    }
    let sum: f64 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= sum;
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pos: u64, prob: f64) -> ActivityState {
        ActivityState::new(Interval::locus(0, pos), prob)
    }

    /// Profile with no smoothing: width 0 makes boundary tests exact.
    fn flat_profile(threshold: f64) -> ActivityProfile {
        ActivityProfile::new(0, 1.0, threshold).unwrap()
    }

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        let kernel = gaussian_kernel(5, 2.0);
        assert_eq!(kernel.len(), 11);
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        for i in 0..5 {
            assert!((kernel[i] - kernel[10 - i]).abs() < 1e-12);
        }
        assert!(kernel[5] > kernel[4]);
    }

    #[test]
    fn test_empty_profile_pops_nothing() {
        let mut profile = flat_profile(0.5);
        assert!(profile.pop_ready(0, 1, 100, true).unwrap().is_empty());
        assert!(profile.pop_ready(0, 1, 100, false).unwrap().is_empty());
    }

    #[test]
    fn test_rejects_bad_probability() {
        let mut profile = flat_profile(0.5);
        assert!(matches!(
            profile.add(state(1, 1.5), 0),
            Err(EngineError::Analysis(_))
        ));
        assert!(matches!(
            profile.add(state(1, f64::NAN), 0),
            Err(EngineError::Analysis(_))
        ));
    }

    #[test]
    fn test_rejects_non_contiguous_add() {
        let mut profile = flat_profile(0.5);
        profile.add(state(100, 0.1), 0).unwrap();
        assert!(matches!(
            profile.add(state(102, 0.1), 0),
            Err(EngineError::OrderingViolation(_))
        ));
    }

    #[test]
    fn test_not_ready_without_lookahead() {
        let mut profile = flat_profile(0.5);
        for pos in 1..=49 {
            profile.add(state(pos, 0.9), 0).unwrap();
        }
        // max_size 50: readiness needs 50 buffered sites, we have 49
        assert!(profile.pop_ready(0, 10, 50, false).unwrap().is_empty());

        profile.add(state(50, 0.9), 0).unwrap();
        let regions = profile.pop_ready(0, 10, 50, false).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(*regions[0].interval(), Interval::new(0, 1, 50));
        assert!(regions[0].is_active());
    }

    #[test]
    fn test_max_size_closes_mid_activity() {
        let mut profile = flat_profile(0.5);
        for pos in 1..=120 {
            profile.add(state(pos, 0.9), 0).unwrap();
        }
        let regions = profile.pop_ready(0, 10, 50, false).unwrap();
        // 120 buffered: two full regions pop, the 20-site tail is not ready
        assert_eq!(regions.len(), 2);
        assert_eq!(*regions[0].interval(), Interval::new(0, 1, 50));
        assert_eq!(*regions[1].interval(), Interval::new(0, 51, 100));
        assert_eq!(profile.len(), 20);
    }

    #[test]
    fn test_short_active_run_held_until_forced() {
        let min_size = 10;
        let mut profile = flat_profile(0.5);
        // Exactly min_size - 1 active sites, then inactivity
        for pos in 1..=9 {
            profile.add(state(pos, 0.9), 0).unwrap();
        }
        for pos in 10..=40 {
            profile.add(state(pos, 0.0), 0).unwrap();
        }

        // The flip at offset 9 is below min_size, so nothing closes until
        // max_size would be reached or a flush is forced
        assert!(profile
            .pop_ready(0, min_size, 1000, false)
            .unwrap()
            .is_empty());

        let regions = profile.pop_ready(0, min_size, 1000, true).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(*regions[0].interval(), Interval::new(0, 1, 40));
        // First site was active, so the absorbed run keeps the active label
        assert!(regions[0].is_active());
        assert!(profile.is_empty());
    }

    #[test]
    fn test_forced_flush_emits_inactive_region() {
        let mut profile = flat_profile(0.5);
        for pos in 1..=30 {
            profile.add(state(pos, 0.0), 0).unwrap();
        }
        let regions = profile.pop_ready(0, 5, 100, true).unwrap();
        assert_eq!(regions.len(), 1);
        assert!(!regions[0].is_active());
        assert_eq!(regions[0].interval().span(), 30);
    }

    #[test]
    fn test_forced_flush_trims_smoothing_spill() {
        // Width 3 spreads probability past the last raw site; a forced
        // flush must not emit regions over bases the data never covered.
        let mut profile = ActivityProfile::new(3, 1.5, 0.5).unwrap();
        for pos in 1..=10 {
            profile.add(state(pos, 0.9), 0).unwrap();
        }
        assert!(profile.len() > 10);

        let regions = profile.pop_ready(0, 1, 100, true).unwrap();
        let total_span: u64 = regions.iter().map(|r| r.interval().span()).sum();
        assert_eq!(total_span, 10);
        assert_eq!(regions.last().unwrap().interval().stop, 10);
    }

    #[test]
    fn test_forced_flush_drops_pure_spill_after_max_size_close() {
        let mut profile = ActivityProfile::new(2, 1.0, 0.3).unwrap();
        for pos in 1..=50 {
            profile.add(state(pos, 0.9), 0).unwrap();
        }
        // len == max + width, so the max-size region closes and only the
        // two spill sites past the raw data remain
        let regions = profile.pop_ready(0, 10, 50, false).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(*regions[0].interval(), Interval::new(0, 1, 50));
        assert!(!profile.is_empty());

        let regions = profile.pop_ready(0, 10, 50, true).unwrap();
        assert!(regions.is_empty());
        assert!(profile.is_empty());
    }

    #[test]
    fn test_smoothing_recruits_neighborhood() {
        // A single spike among zeros: the kernel spreads it symmetrically
        // and conserves its mass away from contig edges.
        let mut profile = ActivityProfile::new(2, 1.0, 0.3).unwrap();
        for pos in 1..=9 {
            let prob = if pos == 5 { 1.0 } else { 0.0 };
            profile.add(state(pos, prob), 0).unwrap();
        }

        let regions = profile.pop_ready(0, 1, 100, true).unwrap();
        let all_probs: Vec<f64> = regions
            .iter()
            .flat_map(|r| r.supporting_probs().iter().copied())
            .collect();
        assert_eq!(all_probs.len(), 9);
        let total: f64 = all_probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        // Symmetric around the spike
        assert!((all_probs[3] - all_probs[5]).abs() < 1e-12);
        assert!(all_probs[4] > all_probs[3]);

        // Only the spike site crosses 0.3, so it closes as its own
        // active region between two inactive flanks
        assert_eq!(regions.len(), 3);
        assert!(!regions[0].is_active());
        assert!(regions[1].is_active());
        assert_eq!(*regions[1].interval(), Interval::locus(0, 5));
        assert!(!regions[2].is_active());
    }

    #[test]
    fn test_contig_edge_clamps_spread() {
        // Spike at the last base of a short contig: mass past the edge is
        // dropped, not wrapped or buffered
        let mut profile = ActivityProfile::new(2, 1.0, 0.3).unwrap();
        for pos in 1..=10 {
            let prob = if pos == 10 { 1.0 } else { 0.0 };
            profile.add(state(pos, prob), 10).unwrap();
        }
        assert_eq!(profile.len(), 10);

        let regions = profile.pop_ready(5, 1, 100, true).unwrap();
        let last = regions.last().unwrap();
        assert_eq!(last.interval().stop, 10);
        // Extension is clamped to the contig too
        assert_eq!(last.extended().stop, 10);
    }
}
