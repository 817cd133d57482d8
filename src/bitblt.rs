
use anyhow::Result;

use crate::{
    format::{PixelFormat, PlaneBuf, PlaneBufMut, check_plane_extent},
    util::Pixel,
};

/// Calls `$body` with `$src` and `$dst` bound to the typed slices of a
/// source and a destination plane buffer.
macro_rules! with_typed_planes {
    ($src_buf:expr, $dst_buf:expr, |$src:ident, $dst:ident| $body:expr) => {
        match ($src_buf, $dst_buf) {
            (PlaneBuf::U8($src), PlaneBufMut::U8($dst)) => $body,
            (PlaneBuf::U8($src), PlaneBufMut::U16($dst)) => $body,
            (PlaneBuf::U8($src), PlaneBufMut::F32($dst)) => $body,
            (PlaneBuf::U16($src), PlaneBufMut::U8($dst)) => $body,
            (PlaneBuf::U16($src), PlaneBufMut::U16($dst)) => $body,
            (PlaneBuf::U16($src), PlaneBufMut::F32($dst)) => $body,
            (PlaneBuf::F32($src), PlaneBufMut::U8($dst)) => $body,
            (PlaneBuf::F32($src), PlaneBufMut::U16($dst)) => $body,
            (PlaneBuf::F32($src), PlaneBufMut::F32($dst)) => $body,
        }
    };
}

pub(crate) use with_typed_planes;

/// Copies a `width` x `height` area, applying `out = in * gain + add_cst`.
///
/// Integer destinations are rounded half to even and clamped to the range of
/// `dst_fmt`.
pub fn bitblt_scaled(
    dst: PlaneBufMut<'_>,
    dst_stride: usize,
    src: PlaneBuf<'_>,
    src_stride: usize,
    width: usize,
    height: usize,
    gain: f64,
    add_cst: f64,
    dst_fmt: &PixelFormat,
) -> Result<()> {
    check_plane_extent(src.len(), src_stride, width, height)?;
    check_plane_extent(dst.len(), dst_stride, width, height)?;

    let max_val = dst_fmt.max_value();
    with_typed_planes!(src, dst, |s, d| {
        bitblt_typed(d, dst_stride, s, src_stride, width, height, gain, add_cst, max_val);
    });

    Ok(())
}

fn bitblt_typed<T: Pixel, U: Pixel>(
    dst: &mut [U],
    dst_stride: usize,
    src: &[T],
    src_stride: usize,
    width: usize,
    height: usize,
    gain: f64,
    add_cst: f64,
    max_val: f64,
) {
    for (dst_row, src_row) in dst
        .chunks_mut(dst_stride)
        .zip(src.chunks(src_stride))
        .take(height)
    {
        for (d, &s) in dst_row[..width].iter_mut().zip(&src_row[..width]) {
            *d = U::from_f64(f64::from(s.to_f32()).mul_add(gain, add_cst), max_val);
        }
    }
}

/// Sets a `width` x `height` area to `value`, rounded and clamped like the
/// output of the filters.
pub fn fill_plane(
    dst: PlaneBufMut<'_>,
    dst_stride: usize,
    width: usize,
    height: usize,
    value: f64,
    dst_fmt: &PixelFormat,
) -> Result<()> {
    check_plane_extent(dst.len(), dst_stride, width, height)?;

    let max_val = dst_fmt.max_value();
    match dst {
        PlaneBufMut::U8(d) => fill_typed(d, dst_stride, width, height, u8::from_f64(value, max_val)),
        PlaneBufMut::U16(d) => fill_typed(d, dst_stride, width, height, u16::from_f64(value, max_val)),
        PlaneBufMut::F32(d) => fill_typed(d, dst_stride, width, height, f32::from_f64(value, max_val)),
    }

    Ok(())
}

fn fill_typed<U: Pixel>(dst: &mut [U], dst_stride: usize, width: usize, height: usize, value: U) {
    for row in dst.chunks_mut(dst_stride).take(height) {
        row[..width].fill(value);
    }
}
