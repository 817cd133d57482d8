use super::ContFir;

#[derive(Debug, Clone, Copy)]
pub struct Spline16;

impl ContFir for Spline16 {
    fn eval(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 1.0 {
            ((x - 9.0 / 5.0) * x - 1.0 / 5.0) * x + 1.0
        } else if x < 2.0 {
            let x = x - 1.0;
            ((-1.0 / 3.0 * x + 4.0 / 5.0) * x - 7.0 / 15.0) * x
        } else {
            0.0
        }
    }

    fn support(&self) -> f64 {
        2.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Spline36;

impl ContFir for Spline36 {
    fn eval(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 1.0 {
            ((13.0 / 11.0 * x - 453.0 / 209.0) * x - 3.0 / 209.0) * x + 1.0
        } else if x < 2.0 {
            let x = x - 1.0;
            ((-6.0 / 11.0 * x + 270.0 / 209.0) * x - 156.0 / 209.0) * x
        } else if x < 3.0 {
            let x = x - 2.0;
            ((1.0 / 11.0 * x - 45.0 / 209.0) * x + 26.0 / 209.0) * x
        } else {
            0.0
        }
    }

    fn support(&self) -> f64 {
        3.0
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Spline64;

impl ContFir for Spline64 {
    fn eval(&self, x: f64) -> f64 {
        let x = x.abs();
        if x < 1.0 {
            ((49.0 / 41.0 * x - 6387.0 / 2911.0) * x - 3.0 / 2911.0) * x + 1.0
        } else if x < 2.0 {
            let x = x - 1.0;
            ((-24.0 / 41.0 * x + 4032.0 / 2911.0) * x - 2328.0 / 2911.0) * x
        } else if x < 3.0 {
            let x = x - 2.0;
            ((6.0 / 41.0 * x - 1008.0 / 2911.0) * x + 582.0 / 2911.0) * x
        } else if x < 4.0 {
            let x = x - 3.0;
            ((-1.0 / 41.0 * x + 168.0 / 2911.0) * x - 97.0 / 2911.0) * x
        } else {
            0.0
        }
    }

    fn support(&self) -> f64 {
        4.0
    }
}

/// Interpolating natural cubic spline through `2 * taps` samples.
///
/// Segment `k` of the kernel is the weight of the sample `k` steps away,
/// i.e. the natural spline through an impulse at node `-k` of the node set
/// `-(taps - 1)..=taps`, evaluated over `[0, 1)`.
#[derive(Debug, Clone)]
pub struct Spline {
    /// Per segment: values and second derivatives at nodes 0 and 1.
    segments: Vec<[f64; 4]>,
}

impl Spline {
    #[must_use]
    pub fn new(taps: usize) -> Self {
        let taps = taps.max(1);
        let nbr_nodes = 2 * taps;
        let segments = (0..taps)
            .map(|k| {
                let mut y = vec![0.0; nbr_nodes];
                y[taps - 1 - k] = 1.0;
                let m = natural_second_derivatives(&y);
                [y[taps - 1], y[taps], m[taps - 1], m[taps]]
            })
            .collect();

        Self { segments }
    }
}

impl ContFir for Spline {
    fn eval(&self, x: f64) -> f64 {
        let x = x.abs();
        let seg = x.floor();
        let Some(&[y0, y1, m0, m1]) = self.segments.get(seg as usize) else {
            return 0.0;
        };

        let t = x - seg;
        let u = 1.0 - t;
        u * y0 + t * y1 + (u * u * u - u) * m0 / 6.0 + (t * t * t - t) * m1 / 6.0
    }

    fn support(&self) -> f64 {
        self.segments.len() as f64
    }
}

/// Second derivatives of the natural cubic spline through `y`, sampled with
/// unit spacing.
fn natural_second_derivatives(y: &[f64]) -> Vec<f64> {
    let n = y.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    // Thomas algorithm on M[i-1] + 4 M[i] + M[i+1] = 6 (y[i-1] - 2 y[i] + y[i+1])
    let inner = n - 2;
    let mut c_prime = vec![0.0; inner];
    let mut d_prime = vec![0.0; inner];
    for i in 0..inner {
        let rhs = 6.0 * (y[i] - 2.0 * y[i + 1] + y[i + 2]);
        if i == 0 {
            c_prime[i] = 1.0 / 4.0;
            d_prime[i] = rhs / 4.0;
        } else {
            let denom = 4.0 - c_prime[i - 1];
            c_prime[i] = 1.0 / denom;
            d_prime[i] = (rhs - d_prime[i - 1]) / denom;
        }
    }

    for i in (0..inner).rev() {
        let next = if i + 1 < inner { m[i + 2] } else { 0.0 };
        m[i + 1] = d_prime[i] - c_prime[i] * next;
    }

    m
}
