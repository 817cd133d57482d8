use std::f64::consts::PI;

use rustdct::DctPlanner;

use crate::kernel::ContFir;

/// Tikhonov term of the reciprocal, relative to the DC gain. Bounds the
/// sharpening gain to `1 / (2 sqrt(LAMBDA))`.
const LAMBDA: f64 = 0.01;

/// Kernel convolved with the discrete inverse of its integer sampling.
///
/// Applying it undoes, as far as `taps` correction coefficients allow, a
/// previous filtering by the base kernel.
#[derive(Debug)]
pub struct Inverted {
    base: Box<dyn ContFir>,
    /// Correction coefficients for offsets `0..=taps`, mirrored.
    coefs: Vec<f64>,
}

impl Inverted {
    #[must_use]
    pub fn new(base: Box<dyn ContFir>, taps: usize) -> Self {
        let coefs = compute_correction(base.as_ref(), taps.max(1));
        Self { base, coefs }
    }

    #[must_use]
    pub fn coefs(&self) -> &[f64] {
        &self.coefs
    }
}

impl ContFir for Inverted {
    fn eval(&self, x: f64) -> f64 {
        let mut sum = self.coefs[0] * self.base.eval(x);
        for (k, &g) in self.coefs.iter().enumerate().skip(1) {
            let k = k as f64;
            sum += g * (self.base.eval(x - k) + self.base.eval(x + k));
        }
        sum
    }

    fn support(&self) -> f64 {
        self.base.support() + (self.coefs.len() - 1) as f64
    }
}

fn compute_correction(base: &dyn ContFir, taps: usize) -> Vec<f64> {
    let support = base.support().ceil() as usize;
    let len = (8 * (taps + support)).next_power_of_two().max(256) + 1;

    let mut planner = DctPlanner::<f64>::new();
    let dct = planner.plan_dct1(len);

    // Frequency response of the sampled kernel. The DCT-I halves the first
    // sample, which gives half of the even response.
    let mut spectrum: Vec<f64> = (0..len).map(|n| base.eval(n as f64)).collect();
    dct.process_dct1(&mut spectrum);

    let dc = spectrum[0];
    for val in &mut spectrum {
        let h = if dc.abs() > f64::EPSILON { *val / dc } else { *val };
        *val = h / h.mul_add(h, LAMBDA);
    }

    // DCT-I is its own inverse up to a scale, removed by the DC normalisation
    // below.
    dct.process_dct1(&mut spectrum);

    let mut coefs: Vec<f64> = (0..=taps)
        .map(|k| {
            let taper = 0.5 * (1.0 + (PI * k as f64 / (taps + 1) as f64).cos());
            spectrum[k] * taper
        })
        .collect();

    let dc_gain = coefs[0] + 2.0 * coefs[1..].iter().sum::<f64>();
    if dc_gain.abs() > f64::EPSILON {
        for coef in &mut coefs {
            *coef /= dc_gain;
        }
    }

    coefs
}
