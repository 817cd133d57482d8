
use smallvec::SmallVec;

use crate::{kernel::ContFir, util::gcd};

/// Fractional bits of the fixed-point weights.
pub const FIXED_BITS: u32 = 22;

/// Mapping of one destination axis onto the source axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisGeometry {
    pub src_len: usize,
    pub dst_len: usize,
    /// Source window start, in source samples.
    pub win_pos: f64,
    /// Source window extent, in source samples.
    pub win_len: f64,
    /// Sampling centre of the first source sample, in half samples.
    pub center_src: f64,
    /// Sampling centre of the first destination sample, in half samples.
    pub center_dst: f64,
    /// Kernel stretch factor. Positive values are relative to the
    /// downscaling ratio, negative values are absolute.
    pub kernel_scale: f64,
}

impl AxisGeometry {
    /// Factor applied to source distances before evaluating the kernel.
    #[must_use]
    pub fn fir_scale(&self) -> f64 {
        if self.kernel_scale > 0.0 {
            self.kernel_scale * (self.dst_len as f64 / self.win_len).min(1.0)
        } else {
            -self.kernel_scale
        }
    }
}

/// Taps of one sub-sample phase.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase {
    /// Source index of the first weight.
    pub start: isize,
    pub weights: SmallVec<[f64; 8]>,
    /// Same weights with [`FIXED_BITS`] fractional bits.
    pub fixed: SmallVec<[i32; 8]>,
}

/// Per-output tap lists of one axis, stored once per distinct phase.
#[derive(Debug, Clone)]
pub struct WeightTable {
    phases: Vec<Phase>,
    /// Source advance between two consecutive periods.
    step: isize,
    dst_len: usize,
}

impl WeightTable {
    /// Discretises `kernel` for the given axis mapping.
    ///
    /// With `normalize`, the weights of every phase are scaled to sum to
    /// `total`. Otherwise they are only multiplied by the kernel scale, so a
    /// stretched kernel keeps its area.
    #[must_use]
    pub fn build(kernel: &dyn ContFir, geo: &AxisGeometry, normalize: bool, total: f64) -> Self {
        let dst_len = geo.dst_len.max(1);
        let ratio = geo.win_len / dst_len as f64;
        let fir_scale = geo.fir_scale();
        let reach = kernel.support() / fir_scale;

        let (period, step) = if geo.win_len.fract() == 0.0 && geo.win_len >= 1.0 {
            let win = geo.win_len as usize;
            let div = gcd(dst_len, win);
            (dst_len / div, (win / div) as isize)
        } else {
            (dst_len, 0)
        };

        let c_src = geo.center_src * 0.5;
        let c_dst = geo.center_dst * 0.5;

        let phases = (0..period)
            .map(|i| {
                let pos = (i as f64 + c_dst).mul_add(ratio, geo.win_pos) - c_src;
                let first = (pos - reach).ceil() as isize;
                let last = (pos + reach).floor() as isize;

                let mut weights: SmallVec<[f64; 8]> = (first..=last)
                    .map(|j| kernel.eval((pos - j as f64) * fir_scale))
                    .collect();
                let mut start = first;

                // Zero weights on the sides carry no information
                let lead = weights.iter().take_while(|&&w| w == 0.0).count();
                if lead == weights.len() {
                    weights.clear();
                    weights.push(0.0);
                    start = pos.round() as isize;
                } else {
                    weights.drain(..lead);
                    start += lead as isize;
                    while weights.last() == Some(&0.0) {
                        weights.pop();
                    }
                }

                if normalize {
                    let sum: f64 = weights.iter().sum();
                    if sum != 0.0 {
                        let scale = total / sum;
                        weights.iter_mut().for_each(|w| *w *= scale);
                    }
                } else {
                    weights.iter_mut().for_each(|w| *w *= fir_scale);
                }

                let fixed = quantize(&weights);
                Phase {
                    start,
                    weights,
                    fixed,
                }
            })
            .collect();

        Self {
            phases,
            step,
            dst_len,
        }
    }

    /// Number of distinct phases.
    #[must_use]
    pub fn period(&self) -> usize {
        self.phases.len()
    }

    #[must_use]
    pub const fn step(&self) -> isize {
        self.step
    }

    #[must_use]
    pub const fn dst_len(&self) -> usize {
        self.dst_len
    }

    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Phase and first source index of output `i`.
    #[must_use]
    pub fn taps_for(&self, i: usize) -> (isize, &Phase) {
        let period = self.phases.len();
        let phase = &self.phases[i % period];
        let start = phase.start + (i / period) as isize * self.step;
        (start, phase)
    }

    /// Whether output `i` is source sample `i` for every `i`, unscaled.
    #[must_use]
    pub fn is_identity(&self, src_len: usize) -> bool {
        src_len == self.dst_len
            && self.step == self.phases.len() as isize
            && self
                .phases
                .iter()
                .enumerate()
                .all(|(i, p)| p.start == i as isize && p.weights.as_slice() == [1.0])
    }
}

/// Rounds the weights to fixed point, folding the rounding residue into the
/// largest weight so the integer sum matches the rounded real sum.
#[must_use]
pub fn quantize(weights: &[f64]) -> SmallVec<[i32; 8]> {
    let one = f64::from(1u32 << FIXED_BITS);
    let mut fixed: SmallVec<[i32; 8]> = weights.iter().map(|w| (w * one).round() as i32).collect();

    let target = (weights.iter().sum::<f64>() * one).round() as i32;
    let residue = target - fixed.iter().sum::<i32>();
    if residue != 0 {
        let largest = weights
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map_or(0, |(idx, _)| idx);
        if let Some(w) = fixed.get_mut(largest) {
            *w += residue;
        }
    }

    fixed
}
