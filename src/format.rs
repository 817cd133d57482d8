
use anyhow::{Result, bail};

use crate::error::ResampleError;

/// In-memory representation of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    U8,
    U16,
    F32,
}

impl Storage {
    #[must_use]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::F32 => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleType {
    Integer,
    Float,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorFamily {
    Gray,
    Yuv,
    Rgb,
}

/// Numeric layout of the samples of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    pub sample_type: SampleType,
    pub bits: u8,
    pub full_range: bool,
}

impl PixelFormat {
    pub fn new(sample_type: SampleType, bits: u8, full_range: bool) -> Result<Self> {
        let valid = match sample_type {
            SampleType::Integer => matches!(bits, 8 | 9 | 10 | 12 | 16),
            SampleType::Float => bits == 32,
        };
        if !valid {
            bail!(ResampleError::invalid_arg(format!(
                "pixel bitdepth not supported: {:?} {} bits.",
                sample_type, bits
            )));
        }

        Ok(Self {
            sample_type,
            bits,
            full_range,
        })
    }

    #[must_use]
    pub const fn storage(&self) -> Storage {
        match self.sample_type {
            SampleType::Float => Storage::F32,
            SampleType::Integer if self.bits <= 8 => Storage::U8,
            SampleType::Integer => Storage::U16,
        }
    }

    #[must_use]
    pub const fn is_float(&self) -> bool {
        matches!(self.sample_type, SampleType::Float)
    }

    /// Largest representable code value. Float formats are not clamped.
    #[must_use]
    pub fn max_value(&self) -> f64 {
        match self.sample_type {
            SampleType::Integer => f64::from((1u32 << self.bits) - 1),
            SampleType::Float => f64::INFINITY,
        }
    }

    /// Code value of black (or neutral chroma) and the code distance that
    /// spans the nominal range.
    #[must_use]
    pub fn levels(&self, chroma: bool) -> (f64, f64) {
        match self.sample_type {
            SampleType::Float => (0.0, 1.0),
            SampleType::Integer => {
                let shift = f64::from(1u32 << (self.bits - 8));
                match (self.full_range, chroma) {
                    (true, false) => (0.0, self.max_value()),
                    (true, true) => (f64::from(1u32 << (self.bits - 1)), self.max_value()),
                    (false, false) => (16.0 * shift, 219.0 * shift),
                    (false, true) => (128.0 * shift, 224.0 * shift),
                }
            }
        }
    }
}

/// Computes the multiply-add pair that maps code values of `src` onto `dst`:
/// `out = in * gain + add_cst`.
#[must_use]
pub fn compute_fmt_mac_cst(dst: &PixelFormat, src: &PixelFormat, chroma: bool) -> (f64, f64) {
    let (src_offset, src_scale) = src.levels(chroma);
    let (dst_offset, dst_scale) = dst.levels(chroma);
    let gain = dst_scale / src_scale;
    let add_cst = dst_offset - src_offset * gain;
    (gain, add_cst)
}

/// Layout of a whole clip: colour family, sample format and chroma
/// sub-sampling (log2 of the factor).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClipFormat {
    pub color_family: ColorFamily,
    pub sample_type: SampleType,
    pub bits: u8,
    pub ss_w: u8,
    pub ss_h: u8,
}

impl ClipFormat {
    pub fn new(
        color_family: ColorFamily,
        sample_type: SampleType,
        bits: u8,
        ss_w: u8,
        ss_h: u8,
    ) -> Result<Self> {
        // Validates the sample type and bit depth combination
        PixelFormat::new(sample_type, bits, false)?;

        if ss_w > 2 || ss_h > 2 {
            bail!(ResampleError::invalid_arg(
                "chroma subsampling must be at most 4x per direction."
            ));
        }
        if color_family != ColorFamily::Yuv && (ss_w > 0 || ss_h > 0) {
            bail!(ResampleError::invalid_arg(
                "only YUV formats can have subsampled chroma."
            ));
        }

        Ok(Self {
            color_family,
            sample_type,
            bits,
            ss_w,
            ss_h,
        })
    }

    #[must_use]
    pub const fn plane_count(&self) -> usize {
        match self.color_family {
            ColorFamily::Gray => 1,
            ColorFamily::Yuv | ColorFamily::Rgb => 3,
        }
    }

    #[must_use]
    pub const fn is_chroma_plane(&self, plane: usize) -> bool {
        matches!(self.color_family, ColorFamily::Yuv) && plane > 0
    }

    #[must_use]
    pub const fn plane_width(&self, plane: usize, width: usize) -> usize {
        if self.is_chroma_plane(plane) {
            width >> self.ss_w
        } else {
            width
        }
    }

    #[must_use]
    pub const fn plane_height(&self, plane: usize, height: usize) -> usize {
        if self.is_chroma_plane(plane) {
            height >> self.ss_h
        } else {
            height
        }
    }

    /// RGB is full range unless stated otherwise, everything else is studio
    /// range.
    #[must_use]
    pub const fn is_full_range_default(&self) -> bool {
        matches!(self.color_family, ColorFamily::Rgb)
    }

    #[must_use]
    pub const fn pixel_format(&self, full_range: bool) -> PixelFormat {
        PixelFormat {
            sample_type: self.sample_type,
            bits: self.bits,
            full_range,
        }
    }

    #[must_use]
    pub const fn storage(&self) -> Storage {
        self.pixel_format(false).storage()
    }
}

/// Parses a chroma subsampling string such as `"420"` into log2 factors.
pub fn parse_chroma_subsampling(css: &str) -> Result<(u8, u8)> {
    let digits: String = css.chars().filter(char::is_ascii_digit).collect();
    Ok(match digits.as_str() {
        "444" => (0, 0),
        "422" => (1, 0),
        "420" => (1, 1),
        "411" => (2, 0),
        "440" => (0, 1),
        _ => bail!(ResampleError::invalid_arg(format!(
            "unsupported css value: {css}."
        ))),
    })
}

/// Borrowed samples of one source plane.
#[derive(Debug, Clone, Copy)]
pub enum PlaneBuf<'a> {
    U8(&'a [u8]),
    U16(&'a [u16]),
    F32(&'a [f32]),
}

impl PlaneBuf<'_> {
    #[must_use]
    pub const fn storage(&self) -> Storage {
        match self {
            Self::U8(_) => Storage::U8,
            Self::U16(_) => Storage::U16,
            Self::F32(_) => Storage::F32,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::U8(buf) => buf.len(),
            Self::U16(buf) => buf.len(),
            Self::F32(buf) => buf.len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusively borrowed samples of one destination plane.
#[derive(Debug)]
pub enum PlaneBufMut<'a> {
    U8(&'a mut [u8]),
    U16(&'a mut [u16]),
    F32(&'a mut [f32]),
}

impl PlaneBufMut<'_> {
    #[must_use]
    pub const fn storage(&self) -> Storage {
        match self {
            Self::U8(_) => Storage::U8,
            Self::U16(_) => Storage::U16,
            Self::F32(_) => Storage::F32,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::U8(buf) => buf.len(),
            Self::U16(buf) => buf.len(),
            Self::F32(buf) => buf.len(),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reborrows the buffer for a shorter lifetime.
    pub fn reborrow(&mut self) -> PlaneBufMut<'_> {
        match self {
            Self::U8(buf) => PlaneBufMut::U8(buf),
            Self::U16(buf) => PlaneBufMut::U16(buf),
            Self::F32(buf) => PlaneBufMut::F32(buf),
        }
    }
}

/// A source plane with its stride, in samples.
#[derive(Debug, Clone, Copy)]
pub struct PlaneRef<'a> {
    pub data: PlaneBuf<'a>,
    pub stride: usize,
}

/// A destination plane with its stride, in samples.
#[derive(Debug)]
pub struct PlaneMut<'a> {
    pub data: PlaneBufMut<'a>,
    pub stride: usize,
}

/// Checks that a buffer of `len` samples holds a `width` x `height` plane
/// laid out with `stride`.
pub fn check_plane_extent(len: usize, stride: usize, width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        bail!(ResampleError::processing("empty plane."));
    }
    if stride < width {
        bail!(ResampleError::processing(format!(
            "stride {} is smaller than the plane width {}.",
            stride, width
        )));
    }
    let needed = stride * (height - 1) + width;
    if len < needed {
        bail!(ResampleError::processing(format!(
            "plane buffer holds {} samples, {} needed.",
            len, needed
        )));
    }
    Ok(())
}
