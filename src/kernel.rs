#[cfg(test)]
mod tests;

mod spline;
mod windowed;

use std::{f64::consts::PI, fmt::Debug};

use anyhow::{Result, bail};

pub use self::{
    spline::{Spline, Spline16, Spline36, Spline64},
    windowed::{Window, WindowedSinc},
};
use crate::error::ResampleError;

/// A continuous, even filter kernel.
pub trait ContFir: Debug + Send + Sync {
    /// Kernel value at `x`, in source samples.
    fn eval(&self, x: f64) -> f64;

    /// Half-width outside of which the kernel is zero.
    fn support(&self) -> f64;
}

/// Normalised sinc, `sin(pi x) / (pi x)`.
#[must_use]
pub fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-9 {
        return 1.0;
    }
    let px = PI * x;
    px.sin() / px
}

/// Nearest neighbour.
#[derive(Debug, Clone, Copy)]
pub struct Rect;

impl ContFir for Rect {
    fn eval(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 0.5 {
            1.0
        } else if x == 0.5 {
            0.5
        } else {
            0.0
        }
    }

    fn support(&self) -> f64 {
        0.5
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Linear;

impl ContFir for Linear {
    fn eval(&self, x: f64) -> f64 {
        (1.0 - x.abs()).max(0.0)
    }

    fn support(&self) -> f64 {
        1.0
    }
}

/// Mitchell-Netravali family of piecewise cubics.
#[derive(Debug, Clone, Copy)]
pub struct Cubic {
    p: [f64; 7],
}

impl Cubic {
    #[must_use]
    pub fn new(b: f64, c: f64) -> Self {
        Self {
            p: [
                (6.0 - 2.0 * b) / 6.0,
                (-18.0 + 12.0 * b + 6.0 * c) / 6.0,
                (12.0 - 9.0 * b - 6.0 * c) / 6.0,
                (8.0 * b + 24.0 * c) / 6.0,
                (-12.0 * b - 48.0 * c) / 6.0,
                (6.0 * b + 30.0 * c) / 6.0,
                (-b - 6.0 * c) / 6.0,
            ],
        }
    }
}

impl ContFir for Cubic {
    fn eval(&self, x: f64) -> f64 {
        let x = x.abs();
        let p = &self.p;
        if x < 1.0 {
            (p[2] * x + p[1]).mul_add(x * x, p[0])
        } else if x < 2.0 {
            ((p[6] * x + p[5]) * x + p[4]).mul_add(x, p[3])
        } else {
            0.0
        }
    }

    fn support(&self) -> f64 {
        2.0
    }
}

/// `2^(-p/10 * x^2)`, truncated at `taps`.
#[derive(Debug, Clone, Copy)]
pub struct Gauss {
    k: f64,
    taps: f64,
}

impl Gauss {
    pub fn new(p: f64, taps: usize) -> Result<Self> {
        if !(1.0..=100.0).contains(&p) {
            bail!(ResampleError::invalid_arg(format!(
                "gauss: a1 (p) must be in the 1-100 range, got {p}."
            )));
        }
        Ok(Self {
            k: -p * 0.1 * std::f64::consts::LN_2,
            taps: taps as f64,
        })
    }
}

impl ContFir for Gauss {
    fn eval(&self, x: f64) -> f64 {
        if x.abs() >= self.taps {
            return 0.0;
        }
        (self.k * x * x).exp()
    }

    fn support(&self) -> f64 {
        self.taps
    }
}

/// User supplied impulse response, centred and linearly interpolated
/// between samples one source sample apart.
#[derive(Debug, Clone)]
pub struct Impulse {
    samples: Vec<f64>,
}

impl Impulse {
    pub fn new(samples: &[f64]) -> Result<Self> {
        if samples.is_empty() {
            bail!(ResampleError::invalid_arg("impulse: the array cannot be empty."));
        }
        if samples.iter().any(|v| !v.is_finite()) {
            bail!(ResampleError::invalid_arg("impulse: samples must be finite."));
        }
        if samples.len() % 2 == 0 {
            bail!(ResampleError::invalid_arg(
                "impulse: the number of samples must be odd."
            ));
        }
        Ok(Self {
            samples: samples.to_vec(),
        })
    }
}

impl ContFir for Impulse {
    fn eval(&self, x: f64) -> f64 {
        let half = (self.samples.len() / 2) as f64;
        let pos = x + half;
        if pos <= -1.0 || pos >= self.samples.len() as f64 {
            return 0.0;
        }

        let base = pos.floor();
        let frac = pos - base;
        let sample = |idx: f64| -> f64 {
            if idx < 0.0 {
                0.0
            } else {
                self.samples.get(idx as usize).copied().unwrap_or(0.0)
            }
        };
        (sample(base + 1.0) - sample(base)).mul_add(frac, sample(base))
    }

    fn support(&self) -> f64 {
        (self.samples.len() / 2) as f64 + 1.0
    }
}

/// Shape parameters given by the user. Unset values take the family default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KernelCoefs {
    pub a1: Option<f64>,
    pub a2: Option<f64>,
    pub a3: Option<f64>,
}

/// Builds the kernel called `name`. Names are case insensitive.
pub fn create_kernel_fnc(
    name: &str,
    impulse: &[f64],
    taps: usize,
    coefs: KernelCoefs,
) -> Result<Box<dyn ContFir>> {
    Ok(match name.to_ascii_lowercase().as_str() {
        "point" | "rect" | "box" | "nearest" => Box::new(Rect),
        "linear" | "bilinear" | "triangle" => Box::new(Linear),
        "cubic" | "bicubic" => Box::new(Cubic::new(
            coefs.a1.unwrap_or(1.0 / 3.0),
            coefs.a2.unwrap_or(1.0 / 3.0),
        )),
        "lanczos" => Box::new(WindowedSinc::new(Window::Lanczos, taps)),
        "blackman" => Box::new(WindowedSinc::new(Window::Blackman, taps)),
        "blackmanminlobe" => Box::new(WindowedSinc::new(Window::BlackmanMinLobe, taps)),
        "sinc" => Box::new(WindowedSinc::new(Window::Rect, taps)),
        "spline16" => Box::new(Spline16),
        "spline36" => Box::new(Spline36),
        "spline64" => Box::new(Spline64),
        "spline" => Box::new(Spline::new(taps)),
        "gauss" | "gaussian" => Box::new(Gauss::new(coefs.a1.unwrap_or(30.0), taps)?),
        "impulse" => Box::new(Impulse::new(impulse)?),
        _ => bail!(ResampleError::invalid_arg(format!(
            "unknown kernel: {name}."
        ))),
    })
}
