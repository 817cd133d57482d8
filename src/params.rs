
use anyhow::{Result, bail};

use crate::error::ResampleError;

/// How a clip is to be interpreted regarding interlacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterlacingParam {
    /// Always progressive frames.
    Frames = 0,
    /// Always separated fields.
    Fields = 1,
    /// Decided per frame from the frame properties.
    #[default]
    Auto = 2,
}

impl TryFrom<i64> for InterlacingParam {
    type Error = anyhow::Error;

    fn try_from(val: i64) -> Result<Self> {
        Ok(match val {
            0 => Self::Frames,
            1 => Self::Fields,
            2 => Self::Auto,
            _ => bail!(ResampleError::invalid_arg(format!(
                "interlaced argument out of range, must be 0-2, got {val}."
            ))),
        })
    }
}

/// Field dominance of separated fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FieldOrder {
    Bff = 0,
    Tff = 1,
    #[default]
    Auto = 2,
}

impl TryFrom<i64> for FieldOrder {
    type Error = anyhow::Error;

    fn try_from(val: i64) -> Result<Self> {
        Ok(match val {
            0 => Self::Bff,
            1 => Self::Tff,
            2 => Self::Auto,
            _ => bail!(ResampleError::invalid_arg(format!(
                "tff argument out of range, must be 0-2, got {val}."
            ))),
        })
    }
}

/// The resolved nature of one frame, on one side of the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterlacingType {
    Frame = 0,
    Top = 1,
    Bottom = 2,
}

impl InterlacingType {
    pub const ALL: [Self; 3] = [Self::Frame, Self::Top, Self::Bottom];

    #[must_use]
    pub const fn from_flags(interlaced: bool, top: bool) -> Self {
        match (interlaced, top) {
            (false, _) => Self::Frame,
            (true, true) => Self::Top,
            (true, false) => Self::Bottom,
        }
    }

    #[must_use]
    pub const fn is_field(self) -> bool {
        !matches!(self, Self::Frame)
    }

    #[must_use]
    pub const fn is_top(self) -> bool {
        matches!(self, Self::Top)
    }
}

/// Destination and source interlacing types of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldPair {
    pub dst: InterlacingType,
    pub src: InterlacingType,
}

impl FieldPair {
    pub const COUNT: usize = 9;

    #[must_use]
    pub const fn new(dst: InterlacingType, src: InterlacingType) -> Self {
        Self { dst, src }
    }

    /// Dense index in `0..FieldPair::COUNT`.
    #[must_use]
    pub const fn index(self) -> usize {
        self.dst as usize * 3 + self.src as usize
    }

    /// Every pair, ordered by [`FieldPair::index`].
    pub fn all() -> impl Iterator<Item = Self> {
        InterlacingType::ALL.into_iter().flat_map(|dst| {
            InterlacingType::ALL
                .into_iter()
                .map(move |src| Self::new(dst, src))
        })
    }
}

/// What happens to each plane of the output frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PlaneMode {
    /// Resampled.
    #[default]
    Process,
    /// Copied from the source with level conversion, cropped or left
    /// incomplete when the sizes differ.
    Copy,
    /// Left as allocated by the host.
    Skip,
    /// Filled with a constant code value.
    Fill(f64),
}

impl TryFrom<f64> for PlaneMode {
    type Error = anyhow::Error;

    /// `3` processes, `2` copies, `1` skips and any value `<= 0` fills the
    /// plane with its absolute value.
    fn try_from(val: f64) -> Result<Self> {
        Ok(if val == 3.0 {
            Self::Process
        } else if val == 2.0 {
            Self::Copy
        } else if val == 1.0 {
            Self::Skip
        } else if val <= 0.0 {
            Self::Fill(-val)
        } else {
            bail!(ResampleError::invalid_arg(format!(
                "invalid planes value, must be 3, 2, 1 or a value <= 0, got {val}."
            )))
        })
    }
}

/// Filtering direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dir {
    H = 0,
    V = 1,
}

/// Fetches the value for `plane` in a per-plane argument list. Missing
/// entries repeat the last one.
#[must_use]
pub fn per_plane<T: Copy>(list: &[T], plane: usize) -> Option<T> {
    list.get(plane).or_else(|| list.last()).copied()
}

/// Like [`per_plane`] for owned values such as kernel names.
#[must_use]
pub fn per_plane_ref<T>(list: &[T], plane: usize) -> Option<&T> {
    list.get(plane).or_else(|| list.last())
}
