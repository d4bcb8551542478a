//! Coarse-to-fine threshold sweep used while the marker is lost.
//!
//! Failure count `n` is split as `n = div + k` with `div` the largest power
//! of two not above `n`. The per-channel range `0..256` is cut into `div`
//! bins and the center of bin `k` is probed, so consecutive failures try the
//! midpoint, then both quarter points, then the eighths, and so on.

/// Per-channel intensity levels.
pub const CHANNEL_LEVELS: u32 = 256;

/// Bins this narrow or narrower end the sweep.
pub const MIN_SWEEP_STEP: u32 = 16;

/// One point of the sweep.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ThresholdProbe {
    /// Channel-sum threshold to try.
    pub threshold: u32,
    /// False once the bin width reached [`MIN_SWEEP_STEP`].
    pub has_finer: bool,
}

/// Threshold to probe after `failures` consecutive failed frames.
pub fn sweep_threshold(failures: u32) -> ThresholdProbe {
    if failures == 0 {
        return ThresholdProbe {
            threshold: 3 * CHANNEL_LEVELS / 2,
            has_finer: true,
        };
    }
    let div = 1u32 << (u32::BITS - 1 - failures.leading_zeros());
    let step = CHANNEL_LEVELS / div;
    ThresholdProbe {
        threshold: 3 * (step * (failures - div) + step / 2),
        has_finer: step > MIN_SWEEP_STEP,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probes_midpoint_then_quarters_then_eighths() {
        let thresholds: Vec<u32> = (1..=7).map(|n| sweep_threshold(n).threshold).collect();
        assert_eq!(thresholds, vec![384, 192, 576, 96, 288, 480, 672]);
    }

    #[test]
    fn exhausts_at_sixteenth_bins() {
        assert!((1..16).all(|n| sweep_threshold(n).has_finer));
        assert_eq!(
            sweep_threshold(16),
            ThresholdProbe {
                threshold: 24,
                has_finer: false
            }
        );
    }

    #[test]
    fn thresholds_stay_inside_channel_sum_range() {
        for n in 0..1024 {
            assert!(sweep_threshold(n).threshold < 3 * CHANNEL_LEVELS);
        }
    }
}
