
use anyhow::{Result, bail};
use log::{debug, warn};
use smallvec::SmallVec;

use crate::{
    bitblt::{bitblt_scaled, fill_plane},
    chroma::ChromaPlacement,
    error::ResampleError,
    field::{FieldInfo, FrameProps, resolve_interlacing},
    filter_cache::FilterCache,
    filter_resize::FilterResize,
    format::{
        ClipFormat,
        ColorFamily,
        PixelFormat,
        PlaneMut,
        PlaneRef,
        SampleType,
        compute_fmt_mac_cst,
        parse_chroma_subsampling,
    },
    kernel::KernelCoefs,
    kernel_data::KernelData,
    params::{FieldOrder, FieldPair, InterlacingParam, PlaneMode, per_plane, per_plane_ref},
    resample_spec::{ResampleSpecPlane, SpecTable},
    util::CpuFeatures,
};

const EPS: f64 = 1e-9;

/// User-facing options of a resampling job, as received from the host.
///
/// Every field is optional. Per-plane lists repeat their last value for the
/// remaining planes, except the source window (`sx`, `sy`, `sw`, `sh`) where
/// a missing plane inherits the resolved window of the previous plane.
#[derive(Debug, Clone, Default)]
pub struct ResampleParams {
    /// Output width, in luma pixels.
    pub w: Option<i64>,
    /// Output height, in luma pixels.
    pub h: Option<i64>,
    pub scale: Option<f64>,
    pub scaleh: Option<f64>,
    pub scalev: Option<f64>,

    pub sx: Vec<f64>,
    pub sy: Vec<f64>,
    pub sw: Vec<f64>,
    pub sh: Vec<f64>,

    pub kernel: Vec<String>,
    pub kernelh: Vec<String>,
    pub kernelv: Vec<String>,
    pub impulse: Vec<f64>,
    pub impulseh: Option<Vec<f64>>,
    pub impulsev: Option<Vec<f64>>,
    pub taps: Vec<i64>,
    pub tapsh: Vec<i64>,
    pub tapsv: Vec<i64>,
    pub a1: Vec<f64>,
    pub a2: Vec<f64>,
    pub a3: Vec<f64>,
    pub a1h: Vec<f64>,
    pub a2h: Vec<f64>,
    pub a3h: Vec<f64>,
    pub a1v: Vec<f64>,
    pub a2v: Vec<f64>,
    pub a3v: Vec<f64>,
    pub totalh: Vec<f64>,
    pub totalv: Vec<f64>,
    pub kovrspl: Vec<i64>,
    pub invks: Vec<bool>,
    pub invksh: Vec<bool>,
    pub invksv: Vec<bool>,
    pub invkstaps: Vec<i64>,
    pub invkstapsh: Vec<i64>,
    pub invkstapsv: Vec<i64>,
    /// Kernel scale. Negative values bypass the automatic adaptation to the
    /// downscaling ratio.
    pub fh: Vec<f64>,
    pub fv: Vec<f64>,
    pub center: Vec<bool>,

    pub cplace: Option<String>,
    pub cplaces: Option<String>,
    pub cplaced: Option<String>,
    pub interlaced: Option<i64>,
    pub interlacedd: Option<i64>,
    pub tff: Option<i64>,
    pub tffd: Option<i64>,
    /// Forces the floating point path for integer to integer conversions.
    pub flt: bool,
    pub cnorm: Option<bool>,
    pub fulls: Option<bool>,
    pub fulld: Option<bool>,

    /// Output bit depth, 16 or 32.
    pub bits: Option<u8>,
    pub sample_type: Option<SampleType>,
    /// Output chroma subsampling, such as `"420"`.
    pub css: Option<String>,
    /// Plane modes, see [`PlaneMode`].
    pub planes: Vec<f64>,
}

/// Frame property updates for the output frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputProps {
    /// `_ColorRange`: 0 full, 1 limited.
    pub color_range: Option<i64>,
    pub chroma_location: Option<i64>,
    pub field_based: Option<i64>,
    pub field: Option<i64>,
    /// `_Field` must be removed.
    pub delete_field: bool,
}

/// Source window in luma pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Win {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

#[derive(Debug)]
struct PlaneData {
    mode: PlaneMode,
    kernel_h: KernelData,
    kernel_v: KernelData,
    is_chroma: bool,
    specs: SpecTable,
}

/// A configured resampling job.
///
/// Built once from the clip format and the user options, then shared by all
/// the threads processing frames.
#[derive(Debug)]
pub struct Resample {
    src_format: ClipFormat,
    dst_format: ClipFormat,
    src_width: usize,
    src_height: usize,
    dst_width: usize,
    dst_height: usize,
    src_pixel: PixelFormat,
    dst_pixel: PixelFormat,
    planes: SmallVec<[PlaneData; 3]>,
    interlaced_src: InterlacingParam,
    interlaced_dst: InterlacingParam,
    field_order_src: FieldOrder,
    field_order_dst: FieldOrder,
    force_float: bool,
    normalize: bool,
    range_set_out: bool,
    full_range_out: bool,
    cplace_d: ChromaPlacement,
    cplace_d_set: bool,
    cpu: CpuFeatures,
    cache: FilterCache,
}

impl Resample {
    pub fn new(src_format: ClipFormat, src_width: usize, src_height: usize, params: &ResampleParams) -> Result<Self> {
        Self::with_cpu_features(src_format, src_width, src_height, params, CpuFeatures::detect())
    }

    /// Same as [`Resample::new`], restricted to the given instruction sets.
    pub fn with_cpu_features(
        src_format: ClipFormat,
        src_width: usize,
        src_height: usize,
        params: &ResampleParams,
        cpu: CpuFeatures,
    ) -> Result<Self> {
        if src_width == 0 || src_height == 0 {
            bail!(ResampleError::invalid_arg("source clip must not be empty."));
        }
        if src_width % (1 << src_format.ss_w) != 0 || src_height % (1 << src_format.ss_h) != 0 {
            bail!(ResampleError::invalid_arg(
                "source dimensions are not compatible with the chroma subsampling."
            ));
        }

        let dst_format = output_format(&src_format, params)?;

        let interlaced_src = InterlacingParam::try_from(params.interlaced.unwrap_or(2))?;
        let interlaced_dst = match params.interlacedd {
            Some(val) => InterlacingParam::try_from(val)?,
            None => interlaced_src,
        };
        let field_order_src = FieldOrder::try_from(params.tff.unwrap_or(2))?;
        let field_order_dst = match params.tffd {
            Some(val) => FieldOrder::try_from(val)?,
            None => field_order_src,
        };

        let full_range_in = params.fulls.unwrap_or(src_format.is_full_range_default());
        let full_range_out = params.fulld.unwrap_or(full_range_in);
        let src_pixel = src_format.pixel_format(full_range_in);
        let dst_pixel = dst_format.pixel_format(full_range_out);

        let (dst_width, dst_height) = output_size(&dst_format, src_width, src_height, params)?;

        let cplace = params.cplace.as_deref().unwrap_or("mpeg2");
        let cplace_s: ChromaPlacement = params.cplaces.as_deref().unwrap_or(cplace).parse()?;
        let cplace_d: ChromaPlacement = params.cplaced.as_deref().unwrap_or(cplace).parse()?;

        let mut resample = Self {
            src_format,
            dst_format,
            src_width,
            src_height,
            dst_width,
            dst_height,
            src_pixel,
            dst_pixel,
            planes: SmallVec::new(),
            interlaced_src,
            interlaced_dst,
            field_order_src,
            field_order_dst,
            force_float: params.flt,
            normalize: params.cnorm.unwrap_or(true),
            range_set_out: params.fulld.is_some(),
            full_range_out,
            cplace_d,
            cplace_d_set: params.cplaced.is_some(),
            cpu,
            cache: FilterCache::new(),
        };

        let mut win = Win::default();
        for plane in 0..src_format.plane_count() {
            win = resample.source_window(plane, win, params)?;
            let data = resample.create_plane(plane, win, cplace_s, params)?;
            resample.planes.push(data);
        }

        debug!(
            "resample {}x{} {:?} -> {}x{} {:?}, {} path, cpu {:?}",
            src_width,
            src_height,
            src_pixel,
            dst_width,
            dst_height,
            dst_pixel,
            if resample.force_float || src_pixel.is_float() || dst_pixel.is_float() {
                "float"
            } else {
                "integer"
            },
            cpu
        );

        Ok(resample)
    }

    #[must_use]
    pub const fn src_format(&self) -> &ClipFormat {
        &self.src_format
    }

    #[must_use]
    pub const fn dst_format(&self) -> &ClipFormat {
        &self.dst_format
    }

    #[must_use]
    pub const fn dst_pixel_format(&self) -> &PixelFormat {
        &self.dst_pixel
    }

    /// Output size in luma pixels.
    #[must_use]
    pub const fn dst_size(&self) -> (usize, usize) {
        (self.dst_width, self.dst_height)
    }

    /// Output size of `plane`.
    #[must_use]
    pub const fn dst_plane_size(&self, plane: usize) -> (usize, usize) {
        (
            self.dst_format.plane_width(plane, self.dst_width),
            self.dst_format.plane_height(plane, self.dst_height),
        )
    }

    #[must_use]
    pub fn plane_specs(&self, plane: usize) -> Option<&SpecTable> {
        self.planes.get(plane).map(|p| &p.specs)
    }

    #[must_use]
    pub const fn filter_cache(&self) -> &FilterCache {
        &self.cache
    }

    /// Resamples frame `n`. `src` and `dst` hold one plane each, in plane
    /// order, sized for the source and the output format.
    ///
    /// An error only affects this frame.
    pub fn process_frame(
        &self,
        n: usize,
        props: Option<&FrameProps>,
        src: &[PlaneRef<'_>],
        dst: &mut [PlaneMut<'_>],
    ) -> Result<OutputProps> {
        let plane_count = self.planes.len();
        if src.len() != plane_count || dst.len() != plane_count {
            bail!(ResampleError::processing(format!(
                "expected {} planes, got {} source and {} destination planes.",
                plane_count,
                src.len(),
                dst.len()
            )));
        }

        let info_src = resolve_interlacing(n, props, self.interlaced_src, self.field_order_src);
        let info_dst = resolve_interlacing(n, props, self.interlaced_dst, self.field_order_dst);
        let pair = FieldPair::new(info_dst.interlacing_type(), info_src.interlacing_type());

        for (plane, ((data, src_plane), dst_plane)) in self.planes.iter().zip(src).zip(dst.iter_mut()).enumerate() {
            if let Err(err) = self.process_plane(plane, data, pair, src_plane, dst_plane) {
                warn!("frame {} plane {}: {:#}", n, plane, err);
                return Err(err);
            }
        }

        Ok(self.output_props(info_dst))
    }

    fn process_plane(
        &self,
        plane: usize,
        data: &PlaneData,
        pair: FieldPair,
        src: &PlaneRef<'_>,
        dst: &mut PlaneMut<'_>,
    ) -> Result<()> {
        let (dst_w, dst_h) = self.dst_plane_size(plane);
        match data.mode {
            PlaneMode::Process => {
                let filter = self.cache.get_or_create(data.specs.get(pair), |spec| {
                    FilterResize::new(
                        spec,
                        &data.kernel_h,
                        &data.kernel_v,
                        self.normalize,
                        self.src_pixel,
                        self.dst_pixel,
                        self.force_float,
                        self.cpu,
                    )
                })?;
                filter.process_plane(dst.data.reborrow(), dst.stride, src.data, src.stride, data.is_chroma)
            }
            PlaneMode::Copy => {
                let spec = data.specs.get(pair);
                let src_w = self.src_format.plane_width(plane, self.src_width);
                let src_h = self.src_format.plane_height(plane, self.src_height);
                bitblt_scaled(
                    dst.data.reborrow(),
                    dst.stride,
                    src.data,
                    src.stride,
                    src_w.min(dst_w),
                    src_h.min(dst_h),
                    spec.gain,
                    spec.add_cst,
                    &self.dst_pixel,
                )
            }
            PlaneMode::Skip => Ok(()),
            PlaneMode::Fill(val) => fill_plane(dst.data.reborrow(), dst.stride, dst_w, dst_h, val, &self.dst_pixel),
        }
    }

    fn output_props(&self, info_dst: FieldInfo) -> OutputProps {
        let mut props = OutputProps::default();
        if self.range_set_out {
            props.color_range = Some(if self.full_range_out { 0 } else { 1 });
        }
        if self.cplace_d_set {
            props.chroma_location = self
                .cplace_d
                .chroma_location(self.dst_format.ss_w, self.dst_format.ss_h);
        }
        if self.interlaced_dst != InterlacingParam::Auto {
            if info_dst.interlaced {
                if self.field_order_dst != FieldOrder::Auto {
                    props.field_based = Some(if self.field_order_dst == FieldOrder::Tff { 1 } else { 2 });
                    props.field = Some(i64::from(info_dst.top));
                }
            } else {
                props.field_based = Some(0);
                props.delete_field = true;
            }
        }
        props
    }

    /// Resolves the source window of `plane`, starting from the window of
    /// the previous plane.
    fn source_window(&self, plane: usize, prev: Win, params: &ResampleParams) -> Result<Win> {
        let mut s = if plane == 0 { Win::default() } else { prev };
        if let Some(&x) = params.sx.get(plane) {
            s.x = x;
        }
        if let Some(&y) = params.sy.get(plane) {
            s.y = y;
        }
        if let Some(&w) = params.sw.get(plane) {
            s.w = w;
        }
        if let Some(&h) = params.sh.get(plane) {
            s.h = h;
        }
        if ![s.x, s.y, s.w, s.h].iter().all(|v| v.is_finite()) {
            bail!(ResampleError::invalid_arg("sx, sy, sw and sh must be finite."));
        }

        if s.w.abs() < EPS {
            s.w = self.src_width as f64;
        } else if s.w < 0.0 {
            s.w += self.src_width as f64 - s.x;
            if s.w <= 0.0 {
                bail!(ResampleError::invalid_arg("sw must be positive."));
            }
        }

        if s.h.abs() < EPS {
            s.h = self.src_height as f64;
        } else if s.h < 0.0 {
            s.h += self.src_height as f64 - s.y;
            if s.h <= 0.0 {
                bail!(ResampleError::invalid_arg("sh must be positive."));
            }
        }

        Ok(s)
    }

    fn create_plane(
        &self,
        plane: usize,
        win: Win,
        cplace_s: ChromaPlacement,
        params: &ResampleParams,
    ) -> Result<PlaneData> {
        let mode = match per_plane(&params.planes, plane) {
            Some(val) => PlaneMode::try_from(val)?,
            None => PlaneMode::Process,
        };

        let kernel = per_plane_ref(&params.kernel, plane).map_or("spline36", String::as_str);
        let name_h = per_plane_ref(&params.kernelh, plane).map_or(kernel, String::as_str);
        let name_v = per_plane_ref(&params.kernelv, plane).map_or(kernel, String::as_str);
        let impulse_h = params.impulseh.as_deref().unwrap_or(&params.impulse);
        let impulse_v = params.impulsev.as_deref().unwrap_or(&params.impulse);

        let taps = per_plane(&params.taps, plane).unwrap_or(4);
        let taps_h = per_plane(&params.tapsh, plane).unwrap_or(taps);
        let taps_v = per_plane(&params.tapsv, plane).unwrap_or(taps);
        let coefs = |a1: &[f64], a2: &[f64], a3: &[f64]| KernelCoefs {
            a1: per_plane(a1, plane).or_else(|| per_plane(&params.a1, plane)),
            a2: per_plane(a2, plane).or_else(|| per_plane(&params.a2, plane)),
            a3: per_plane(a3, plane).or_else(|| per_plane(&params.a3, plane)),
        };
        let total_h = per_plane(&params.totalh, plane).unwrap_or(0.0);
        let total_v = per_plane(&params.totalv, plane).unwrap_or(0.0);
        let kovrspl = per_plane(&params.kovrspl, plane).unwrap_or(0);
        let invks = per_plane(&params.invks, plane).unwrap_or(false);
        let invks_h = per_plane(&params.invksh, plane).unwrap_or(invks);
        let invks_v = per_plane(&params.invksv, plane).unwrap_or(invks);
        let invks_taps = per_plane(&params.invkstaps, plane).unwrap_or(4);
        let invks_taps_h = per_plane(&params.invkstapsh, plane).unwrap_or(invks_taps);
        let invks_taps_v = per_plane(&params.invkstapsv, plane).unwrap_or(invks_taps);
        let kernel_scale_h = per_plane(&params.fh, plane).unwrap_or(1.0);
        let kernel_scale_v = per_plane(&params.fv, plane).unwrap_or(1.0);
        let preserve_center = per_plane(&params.center, plane).unwrap_or(true);

        if !kernel_scale_h.is_finite() || !kernel_scale_v.is_finite() {
            bail!(ResampleError::invalid_arg("fh and fv must be finite."));
        }
        if kernel_scale_h.abs() < EPS {
            bail!(ResampleError::invalid_arg("fh cannot be null."));
        }
        if kernel_scale_v.abs() < EPS {
            bail!(ResampleError::invalid_arg("fv cannot be null."));
        }
        if total_h < 0.0 {
            bail!(ResampleError::invalid_arg("totalh must be positive or null."));
        }
        if total_v < 0.0 {
            bail!(ResampleError::invalid_arg("totalv must be positive or null."));
        }

        let kernel_h = KernelData::create_kernel(
            name_h,
            impulse_h,
            taps_h,
            coefs(&params.a1h, &params.a2h, &params.a3h),
            kovrspl,
            invks_h,
            invks_taps_h,
            total_h,
        )?;
        let kernel_v = KernelData::create_kernel(
            name_v,
            impulse_v,
            taps_v,
            coefs(&params.a1v, &params.a2v, &params.a3v),
            kovrspl,
            invks_v,
            invks_taps_v,
            total_v,
        )?;

        let src_w = self.src_format.plane_width(plane, self.src_width);
        let src_h = self.src_format.plane_height(plane, self.src_height);
        let subspl_h = (self.src_width / src_w) as f64;
        let subspl_v = (self.src_height / src_h) as f64;
        let is_chroma = self.src_format.is_chroma_plane(plane);
        let (gain, add_cst) = compute_fmt_mac_cst(&self.dst_pixel, &self.src_pixel, is_chroma);

        let base = ResampleSpecPlane {
            src_width: src_w,
            src_height: src_h,
            dst_width: self.dst_format.plane_width(plane, self.dst_width),
            dst_height: self.dst_format.plane_height(plane, self.dst_height),
            win_x: win.x / subspl_h,
            win_y: win.y / subspl_v,
            win_w: win.w / subspl_h,
            win_h: win.h / subspl_v,
            kernel_scale_h,
            kernel_scale_v,
            kernel_hash_h: kernel_h.hash(),
            kernel_hash_v: kernel_v.hash(),
            gain,
            add_cst,
            ..ResampleSpecPlane::default()
        };

        let src_rgb = self.src_format.color_family == ColorFamily::Rgb;
        let dst_rgb = self.dst_format.color_family == ColorFamily::Rgb;
        let specs = SpecTable::from_fn(|pair| {
            let mut spec = base;
            if preserve_center {
                (spec.center_pos_src_h, spec.center_pos_src_v) = cplace_s.compute_cplace(
                    plane,
                    self.src_format.ss_w,
                    self.src_format.ss_h,
                    src_rgb,
                    pair.src.is_field(),
                    pair.src.is_top(),
                );
                (spec.center_pos_dst_h, spec.center_pos_dst_v) = self.cplace_d.compute_cplace(
                    plane,
                    self.dst_format.ss_w,
                    self.dst_format.ss_h,
                    dst_rgb,
                    pair.dst.is_field(),
                    pair.dst.is_top(),
                );
            }
            spec
        });

        debug!(
            "plane {}: {:?}, kernels {}/{}, window {:?}, {}x{} -> {}x{}",
            plane, mode, name_h, name_v, win, src_w, src_h, base.dst_width, base.dst_height
        );

        Ok(PlaneData {
            mode,
            kernel_h,
            kernel_v,
            is_chroma,
            specs,
        })
    }
}

/// Output clip format: the source format with the requested sample type, bit
/// depth and subsampling. Integer sources default to 16 bits.
fn output_format(src: &ClipFormat, params: &ResampleParams) -> Result<ClipFormat> {
    let sample_type = params.sample_type.unwrap_or(match params.bits {
        Some(32) => SampleType::Float,
        Some(_) => SampleType::Integer,
        None => src.sample_type,
    });
    let bits = params.bits.unwrap_or(match sample_type {
        SampleType::Float => 32,
        SampleType::Integer if src.sample_type == SampleType::Integer => src.bits.max(16),
        SampleType::Integer => 16,
    });

    if sample_type == SampleType::Integer && bits < 16 {
        bail!(ResampleError::invalid_arg(
            "cannot output 8-, 9-, 10- or 12-bit data directly. Output to 16 bits then dither."
        ));
    }
    let supported = match sample_type {
        SampleType::Integer => bits == 16,
        SampleType::Float => bits == 32,
    };
    if !supported {
        bail!(ResampleError::invalid_arg(
            "specified output pixel bitdepth not supported."
        ));
    }

    let (ss_w, ss_h) = match params.css.as_deref() {
        Some(css) if !css.is_empty() => parse_chroma_subsampling(css)?,
        _ => (src.ss_w, src.ss_h),
    };

    ClipFormat::new(src.color_family, sample_type, bits, ss_w, ss_h)
}

/// Output size in luma pixels, from the scale factors then the explicit
/// dimensions.
fn output_size(
    dst: &ClipFormat,
    src_width: usize,
    src_height: usize,
    params: &ResampleParams,
) -> Result<(usize, usize)> {
    let scale = params.scale.unwrap_or(0.0);
    let scale_h = params.scaleh.unwrap_or(scale);
    let scale_v = params.scalev.unwrap_or(scale);
    let valid = |v: f64| v.is_finite() && v >= 0.0;
    if !valid(scale_h) || !valid(scale_v) {
        bail!(ResampleError::invalid_arg(
            "scale parameters must be finite and positive or 0."
        ));
    }

    let css_h = 1i64 << dst.ss_w;
    let css_v = 1i64 << dst.ss_h;
    let mut width = src_width as i64;
    let mut height = src_height as i64;
    if scale_h > 0.0 {
        let tmp = (width as f64 * scale_h / css_h as f64 + 0.5).floor() as i64;
        width = tmp.max(1) * css_h;
    }
    if scale_v > 0.0 {
        let tmp = (height as f64 * scale_v / css_v as f64 + 0.5).floor() as i64;
        height = tmp.max(1) * css_v;
    }

    let width = params.w.unwrap_or(width);
    if width < 1 {
        bail!(ResampleError::invalid_arg("w must be positive."));
    }
    if width % css_h != 0 {
        bail!(ResampleError::invalid_arg(
            "w is not compatible with the output chroma subsampling."
        ));
    }

    let height = params.h.unwrap_or(height);
    if height < 1 {
        bail!(ResampleError::invalid_arg("h must be positive."));
    }
    if height % css_v != 0 {
        bail!(ResampleError::invalid_arg(
            "h is not compatible with the output chroma subsampling."
        ));
    }

    Ok((width as usize, height as usize))
}
