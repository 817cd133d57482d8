use std::f64::consts::PI;

use super::{ContFir, sinc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Plain truncation.
    Rect,
    Lanczos,
    Blackman,
    /// 4-term minimum side-lobe Blackman-Harris.
    BlackmanMinLobe,
}

impl Window {
    /// Window value at `x`, with `x` in `[-1, 1]` spanning the whole support.
    fn eval(self, x: f64) -> f64 {
        match self {
            Self::Rect => 1.0,
            Self::Lanczos => sinc(x),
            Self::Blackman => {
                let a = PI * x;
                0.08f64.mul_add((2.0 * a).cos(), 0.5f64.mul_add(a.cos(), 0.42))
            }
            Self::BlackmanMinLobe => {
                let a = PI * x;
                0.01168f64.mul_add(
                    (3.0 * a).cos(),
                    0.14128f64.mul_add((2.0 * a).cos(), 0.48829f64.mul_add(a.cos(), 0.35875)),
                )
            }
        }
    }
}

/// Sinc kernel truncated at `taps` lobes and shaped by a window.
#[derive(Debug, Clone, Copy)]
pub struct WindowedSinc {
    window: Window,
    taps: f64,
}

impl WindowedSinc {
    #[must_use]
    pub fn new(window: Window, taps: usize) -> Self {
        Self {
            window,
            taps: taps.max(1) as f64,
        }
    }
}

impl ContFir for WindowedSinc {
    fn eval(&self, x: f64) -> f64 {
        if x.abs() >= self.taps {
            return 0.0;
        }
        sinc(x) * self.window.eval(x / self.taps)
    }

    fn support(&self) -> f64 {
        self.taps
    }
}
