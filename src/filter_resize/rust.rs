#![allow(clippy::suboptimal_flops, reason = "must round like the unfused AVX2 kernels")]

use super::TapSpan;
use crate::util::Pixel;

/// Horizontal fixed-point pass over one row. The result keeps
/// `FIXED_BITS - shift` fractional bits.
pub fn horizontal_int<T: Pixel>(dst: &mut [i32], src: &[T], taps: &[TapSpan], shift: u32) {
    let round = 1i64 << (shift - 1);
    for (d, span) in dst.iter_mut().zip(taps) {
        let row = &src[span.start..span.start + span.len()];
        let acc: i64 = row
            .iter()
            .zip(&span.fixed)
            .map(|(&s, &w)| i64::from(s.to_i32()) * i64::from(w))
            .sum();
        *d = ((acc + round) >> shift) as i32;
    }
}

pub fn horizontal_flt<T: Pixel>(dst: &mut [f32], src: &[T], taps: &[TapSpan]) {
    for (d, span) in dst.iter_mut().zip(taps) {
        let row = &src[span.start..span.start + span.len()];
        let mut acc = 0f32;
        for (&s, &w) in row.iter().zip(&span.weights) {
            acc += s.to_f32() * w;
        }
        *d = acc;
    }
}

/// `acc[i] += row[i] * w`
pub fn accumulate_row_f32(acc: &mut [f32], row: &[f32], w: f32) {
    for (a, &r) in acc.iter_mut().zip(row) {
        *a += r * w;
    }
}

/// `acc[i] += row[i] * w`, widened to 64 bits.
pub fn accumulate_row_i64(acc: &mut [i64], row: &[i32], w: i32) {
    let w = i64::from(w);
    for (a, &r) in acc.iter_mut().zip(row) {
        *a += i64::from(r) * w;
    }
}
