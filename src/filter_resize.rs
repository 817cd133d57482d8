#[cfg(test)]
mod tests;

#[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))]
mod avx2;
mod rust;

use anyhow::{Result, bail};
use cfg_if::cfg_if;
use log::{debug, trace};
use smallvec::SmallVec;

use crate::{
    bitblt::{bitblt_scaled, with_typed_planes},
    error::ResampleError,
    format::{PixelFormat, PlaneBuf, PlaneBufMut, check_plane_extent},
    kernel_data::KernelData,
    params::Dir,
    resample_spec::ResampleSpecPlane,
    util::{CpuFeatures, Pixel},
    weights::{FIXED_BITS, WeightTable},
};

/// Precision of the fixed-point intermediate plane: a 16-bit sample range
/// plus four fractional bits, whatever the source depth.
pub const INTER_BITS: u32 = 20;

/// Taps of one output sample, restricted to the source range.
#[derive(Debug, Clone, Default)]
pub struct TapSpan {
    pub start: usize,
    pub weights: SmallVec<[f32; 8]>,
    pub fixed: SmallVec<[i32; 8]>,
}

impl TapSpan {
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

/// Resolves the taps of every output of `table`. Taps that fall outside
/// `[0, src_len)` are dropped without redistributing their weight.
#[must_use]
pub fn clip_taps(table: &WeightTable, src_len: usize) -> Vec<TapSpan> {
    (0..table.dst_len())
        .map(|i| {
            let (start, phase) = table.taps_for(i);
            let end = start + phase.weights.len() as isize;
            let lo = start.max(0);
            let hi = end.min(src_len as isize);
            if lo >= hi {
                return TapSpan::default();
            }

            let skip = (lo - start) as usize;
            let take = (hi - lo) as usize;
            TapSpan {
                start: lo as usize,
                weights: phase.weights[skip..skip + take]
                    .iter()
                    .map(|&w| w as f32)
                    .collect(),
                fixed: SmallVec::from_slice(&phase.fixed[skip..skip + take]),
            }
        })
        .collect()
}

/// Separable resizer for one plane. Immutable once built and shared between
/// threads.
#[derive(Debug)]
pub struct FilterResize {
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
    /// `None` when the axis is an identity.
    taps_h: Option<Vec<TapSpan>>,
    taps_v: Option<Vec<TapSpan>>,
    /// Source rows read by the vertical pass.
    rows: std::ops::Range<usize>,
    gain: f64,
    add_cst: f64,
    src_fmt: PixelFormat,
    dst_fmt: PixelFormat,
    int_path: bool,
    /// Fractional bits of the intermediate plane, in source code values.
    inter_frac: u32,
    cpu: CpuFeatures,
}

impl FilterResize {
    pub fn new(
        spec: &ResampleSpecPlane,
        kernel_h: &KernelData,
        kernel_v: &KernelData,
        normalize: bool,
        src_fmt: PixelFormat,
        dst_fmt: PixelFormat,
        force_float: bool,
        cpu: CpuFeatures,
    ) -> Result<Self> {
        if spec.src_width == 0 || spec.src_height == 0 || spec.dst_width == 0 || spec.dst_height == 0 {
            bail!(ResampleError::runtime("cannot build a filter for an empty plane."));
        }
        let window = [spec.win_x, spec.win_y, spec.win_w, spec.win_h];
        if !window.iter().all(|v| v.is_finite()) || !(spec.win_w > 0.0 && spec.win_h > 0.0) {
            bail!(ResampleError::runtime("cannot build a filter for an empty window."));
        }

        let table_h = WeightTable::build(
            kernel_h.kernel(),
            &spec.axis(Dir::H),
            normalize,
            kernel_h.total(),
        );
        let table_v = WeightTable::build(
            kernel_v.kernel(),
            &spec.axis(Dir::V),
            normalize,
            kernel_v.total(),
        );

        let taps_h = (!table_h.is_identity(spec.src_width)).then(|| clip_taps(&table_h, spec.src_width));
        let taps_v = (!table_v.is_identity(spec.src_height)).then(|| clip_taps(&table_v, spec.src_height));

        let rows = match &taps_v {
            None => 0..spec.src_height,
            Some(taps) => {
                let first = taps
                    .iter()
                    .filter(|t| !t.is_empty())
                    .map(|t| t.start)
                    .min()
                    .unwrap_or(0);
                let end = taps
                    .iter()
                    .map(|t| t.start + t.len())
                    .max()
                    .unwrap_or(0)
                    .max(first);
                first..end
            }
        };

        let int_path = !force_float && !src_fmt.is_float() && !dst_fmt.is_float();
        let inter_frac = INTER_BITS.saturating_sub(u32::from(src_fmt.bits));
        let cpu = cpu & CpuFeatures::detect();

        debug!(
            "filter {}x{} -> {}x{}: h {} phases{}, v {} phases{}, rows {:?}, {} path, {:?}",
            spec.src_width,
            spec.src_height,
            spec.dst_width,
            spec.dst_height,
            table_h.period(),
            if taps_h.is_none() { " (identity)" } else { "" },
            table_v.period(),
            if taps_v.is_none() { " (identity)" } else { "" },
            rows,
            if int_path { "integer" } else { "float" },
            cpu
        );

        Ok(Self {
            src_width: spec.src_width,
            src_height: spec.src_height,
            dst_width: spec.dst_width,
            dst_height: spec.dst_height,
            taps_h,
            taps_v,
            rows,
            gain: spec.gain,
            add_cst: spec.add_cst,
            src_fmt,
            dst_fmt,
            int_path,
            inter_frac,
            cpu,
        })
    }

    /// Whether the filter only converts sample values.
    #[must_use]
    pub const fn is_bypass(&self) -> bool {
        self.taps_h.is_none() && self.taps_v.is_none()
    }

    #[must_use]
    pub const fn is_int_path(&self) -> bool {
        self.int_path
    }

    #[must_use]
    pub const fn cpu_features(&self) -> CpuFeatures {
        self.cpu
    }

    /// Resamples `src` into `dst`. Strides are in samples.
    pub fn process_plane(
        &self,
        dst: PlaneBufMut<'_>,
        dst_stride: usize,
        src: PlaneBuf<'_>,
        src_stride: usize,
        is_chroma: bool,
    ) -> Result<()> {
        if src.storage() != self.src_fmt.storage() || dst.storage() != self.dst_fmt.storage() {
            bail!(ResampleError::processing(format!(
                "plane buffers are {:?} -> {:?}, filter expects {:?} -> {:?}.",
                src.storage(),
                dst.storage(),
                self.src_fmt.storage(),
                self.dst_fmt.storage()
            )));
        }
        check_plane_extent(src.len(), src_stride, self.src_width, self.src_height)?;
        check_plane_extent(dst.len(), dst_stride, self.dst_width, self.dst_height)?;

        trace!(
            "{} plane {}x{} -> {}x{}",
            if is_chroma { "chroma" } else { "luma" },
            self.src_width,
            self.src_height,
            self.dst_width,
            self.dst_height
        );

        if self.is_bypass() {
            return bitblt_scaled(
                dst,
                dst_stride,
                src,
                src_stride,
                self.src_width,
                self.src_height,
                self.gain,
                self.add_cst,
                &self.dst_fmt,
            );
        }

        with_typed_planes!(src, dst, |s, d| {
            if self.int_path {
                self.process_int(d, dst_stride, s, src_stride);
            } else {
                self.process_flt(d, dst_stride, s, src_stride);
            }
        });

        Ok(())
    }

    fn process_int<T: Pixel, U: Pixel>(&self, dst: &mut [U], dst_stride: usize, src: &[T], src_stride: usize) {
        let width = self.dst_width;
        let mut inter = vec![0i32; self.rows.len() * width];
        for (y, inter_row) in self.rows.clone().zip(inter.chunks_exact_mut(width)) {
            let src_row = &src[y * src_stride..y * src_stride + self.src_width];
            match &self.taps_h {
                Some(taps) => rust::horizontal_int(inter_row, src_row, taps, FIXED_BITS - self.inter_frac),
                None => {
                    for (d, &s) in inter_row.iter_mut().zip(src_row) {
                        *d = s.to_i32() << self.inter_frac;
                    }
                }
            }
        }

        let max_val = self.dst_fmt.max_value();
        let mut acc = vec![0i64; width];
        for (y, dst_row) in dst.chunks_mut(dst_stride).take(self.dst_height).enumerate() {
            let scale = match &self.taps_v {
                Some(taps) => {
                    acc.fill(0);
                    let span = &taps[y];
                    for (k, &w) in span.fixed.iter().enumerate() {
                        let row = (span.start + k - self.rows.start) * width;
                        self.accumulate_i64(&mut acc, &inter[row..row + width], w);
                    }
                    f64::from(FIXED_BITS + self.inter_frac).exp2()
                }
                None => {
                    let row = (y - self.rows.start) * width;
                    for (a, &v) in acc.iter_mut().zip(&inter[row..row + width]) {
                        *a = i64::from(v);
                    }
                    f64::from(self.inter_frac).exp2()
                }
            };

            let gain = self.gain / scale;
            for (d, &a) in dst_row[..width].iter_mut().zip(&acc) {
                *d = U::from_f64((a as f64).mul_add(gain, self.add_cst), max_val);
            }
        }
    }

    fn process_flt<T: Pixel, U: Pixel>(&self, dst: &mut [U], dst_stride: usize, src: &[T], src_stride: usize) {
        let width = self.dst_width;
        let mut inter = vec![0f32; self.rows.len() * width];
        for (y, inter_row) in self.rows.clone().zip(inter.chunks_exact_mut(width)) {
            let src_row = &src[y * src_stride..y * src_stride + self.src_width];
            match &self.taps_h {
                Some(taps) => rust::horizontal_flt(inter_row, src_row, taps),
                None => {
                    for (d, &s) in inter_row.iter_mut().zip(src_row) {
                        *d = s.to_f32();
                    }
                }
            }
        }

        let max_val = self.dst_fmt.max_value();
        let mut acc = vec![0f32; width];
        for (y, dst_row) in dst.chunks_mut(dst_stride).take(self.dst_height).enumerate() {
            match &self.taps_v {
                Some(taps) => {
                    acc.fill(0.0);
                    let span = &taps[y];
                    for (k, &w) in span.weights.iter().enumerate() {
                        let row = (span.start + k - self.rows.start) * width;
                        self.accumulate_f32(&mut acc, &inter[row..row + width], w);
                    }
                }
                None => {
                    let row = (y - self.rows.start) * width;
                    acc.copy_from_slice(&inter[row..row + width]);
                }
            }

            for (d, &a) in dst_row[..width].iter_mut().zip(&acc) {
                *d = U::from_f64(f64::from(a).mul_add(self.gain, self.add_cst), max_val);
            }
        }
    }

    fn accumulate_f32(&self, acc: &mut [f32], row: &[f32], w: f32) {
        cfg_if! {
            if #[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))] {
                if self.cpu.contains(CpuFeatures::AVX2) {
                    // SAFETY: the AVX2 flag is only kept when the CPU supports it
                    unsafe {
                        avx2::accumulate_row_f32(acc, row, w);
                    }
                    return;
                }
            }
        }

        rust::accumulate_row_f32(acc, row, w);
    }

    fn accumulate_i64(&self, acc: &mut [i64], row: &[i32], w: i32) {
        cfg_if! {
            if #[cfg(all(target_arch = "x86_64", not(feature = "no_simd")))] {
                if self.cpu.contains(CpuFeatures::AVX2) {
                    // SAFETY: the AVX2 flag is only kept when the CPU supports it
                    unsafe {
                        avx2::accumulate_row_i64(acc, row, w);
                    }
                    return;
                }
            }
        }

        rust::accumulate_row_i64(acc, row, w);
    }
}
