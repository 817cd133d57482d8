
mod inverse;

use std::{
    hash::{DefaultHasher, Hash, Hasher},
    sync::Arc,
};

use anyhow::{Result, bail};
use log::debug;

pub use self::inverse::Inverted;
use crate::{
    error::ResampleError,
    kernel::{ContFir, KernelCoefs, create_kernel_fnc},
};

pub const MAX_TAPS: i64 = 128;

/// Box-integrates a kernel over one source sample with `ovr` sub-samples.
#[derive(Debug)]
pub struct Oversampled {
    base: Box<dyn ContFir>,
    ovr: usize,
}

impl Oversampled {
    #[must_use]
    pub fn new(base: Box<dyn ContFir>, ovr: usize) -> Self {
        Self {
            base,
            ovr: ovr.max(1),
        }
    }
}

impl ContFir for Oversampled {
    fn eval(&self, x: f64) -> f64 {
        let step = 1.0 / self.ovr as f64;
        let sum: f64 = (0..self.ovr)
            .map(|k| self.base.eval(x + (k as f64 + 0.5).mul_add(step, -0.5)))
            .sum();
        sum * step
    }

    fn support(&self) -> f64 {
        self.base.support() + 0.5
    }
}

/// A fully configured kernel for one direction of one plane.
#[derive(Debug, Clone)]
pub struct KernelData {
    kernel: Arc<dyn ContFir>,
    total: f64,
    hash: u64,
}

impl KernelData {
    /// Builds the kernel from its user parameters.
    ///
    /// `total` is the sum the weights of each output sample are normalised to;
    /// `0` means 1. `ovr` values below 2 disable oversampling.
    pub fn create_kernel(
        name: &str,
        impulse: &[f64],
        taps: i64,
        coefs: KernelCoefs,
        ovr: i64,
        invert: bool,
        invert_taps: i64,
        total: f64,
    ) -> Result<Self> {
        if !(1..=MAX_TAPS).contains(&taps) {
            bail!(ResampleError::invalid_arg(format!(
                "taps* must be in the 1-128 range, got {taps}."
            )));
        }
        if !(1..=MAX_TAPS).contains(&invert_taps) {
            bail!(ResampleError::invalid_arg(format!(
                "invkstaps* must be in the 1-128 range, got {invert_taps}."
            )));
        }
        if ovr < 0 {
            bail!(ResampleError::invalid_arg("kovrspl must be positive or null."));
        }
        if total < 0.0 || !total.is_finite() {
            bail!(ResampleError::invalid_arg(
                "total* must be positive or null."
            ));
        }

        if [coefs.a1, coefs.a2, coefs.a3].iter().flatten().any(|c| !c.is_finite()) {
            bail!(ResampleError::invalid_arg("a1, a2 and a3 must be finite."));
        }

        let mut kernel = create_kernel_fnc(name, impulse, taps as usize, coefs)?;
        if ovr > 1 {
            kernel = Box::new(Oversampled::new(kernel, ovr as usize));
        }
        if invert {
            kernel = Box::new(Inverted::new(kernel, invert_taps as usize));
        }

        let mut hasher = DefaultHasher::new();
        name.to_ascii_lowercase().hash(&mut hasher);
        if name.eq_ignore_ascii_case("impulse") {
            for val in impulse {
                val.to_bits().hash(&mut hasher);
            }
        }
        taps.hash(&mut hasher);
        for coef in [coefs.a1, coefs.a2, coefs.a3] {
            coef.map(f64::to_bits).hash(&mut hasher);
        }
        ovr.max(1).hash(&mut hasher);
        invert.hash(&mut hasher);
        if invert {
            invert_taps.hash(&mut hasher);
        }
        let total = if total == 0.0 { 1.0 } else { total };
        total.to_bits().hash(&mut hasher);
        let hash = hasher.finish();

        debug!(
            "kernel {} taps={} ovr={} invks={} support={:.3} hash={:016x}",
            name,
            taps,
            ovr,
            invert,
            kernel.support(),
            hash
        );

        Ok(Self {
            kernel: Arc::from(kernel),
            total,
            hash,
        })
    }

    #[must_use]
    pub fn kernel(&self) -> &dyn ContFir {
        self.kernel.as_ref()
    }

    /// Target sum of the weights of one output sample.
    #[must_use]
    pub const fn total(&self) -> f64 {
        self.total
    }

    /// Identity of the kernel and all of its construction parameters.
    #[must_use]
    pub const fn hash(&self) -> u64 {
        self.hash
    }
}
