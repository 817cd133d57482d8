
use std::str::FromStr;

use anyhow::{Result, bail};

use crate::error::ResampleError;

/// Where sub-sampled chroma samples sit relative to the luma grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChromaPlacement {
    /// Centred between the luma samples in both directions.
    Mpeg1,
    /// Co-sited with the left luma sample, centred vertically.
    #[default]
    Mpeg2,
    /// Co-sited left for 4:1:1, Cr on the top and Cb on the bottom line for
    /// 4:2:0.
    Dv,
}

impl FromStr for ChromaPlacement {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "mpeg1" => Self::Mpeg1,
            "mpeg2" => Self::Mpeg2,
            "dv" => Self::Dv,
            _ => bail!(ResampleError::invalid_arg(format!(
                "unexpected cplace string: {s}."
            ))),
        })
    }
}

impl ChromaPlacement {
    /// Sampling centre of the first sample of `plane`, horizontally and
    /// vertically, in half-pixel units of that plane. `1.0` is the middle of
    /// the pixel.
    #[must_use]
    pub fn compute_cplace(
        self,
        plane: usize,
        ss_w: u8,
        ss_h: u8,
        rgb: bool,
        interlaced: bool,
        top: bool,
    ) -> (f64, f64) {
        let mut cp_h = 1.0;
        let mut cp_v = 1.0;

        if !rgb && (plane == 1 || plane == 2) {
            if self == Self::Mpeg2 || (self == Self::Dv && ss_w == 2 && ss_h == 0) {
                cp_h = 1.0 / f64::from(1u32 << ss_w);
            }
            if self == Self::Dv && ss_w == 1 && ss_h == 1 {
                cp_v = if plane == 1 { 2.0 } else { 0.0 };
            }
        }

        if interlaced {
            cp_v *= 0.5;
            if !top {
                cp_v += 1.0;
            }
        }

        (cp_h, cp_v)
    }

    /// Value of the `_ChromaLocation` frame property matching this placement,
    /// if it can be expressed.
    #[must_use]
    pub const fn chroma_location(self, ss_w: u8, ss_h: u8) -> Option<i64> {
        match self {
            Self::Mpeg2 => Some(0),
            Self::Dv if ss_w == 2 && ss_h == 0 => Some(0),
            Self::Mpeg1 => Some(1),
            Self::Dv => None,
        }
    }
}
