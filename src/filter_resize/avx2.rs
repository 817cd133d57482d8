#![allow(clippy::undocumented_unsafe_blocks)]

use std::arch::x86_64::*;

use super::rust;

/// `acc[i] += row[i] * w`, eight lanes at a time.
///
/// Multiply and add stay separate so the result matches the scalar loop bit
/// for bit.
#[target_feature(enable = "avx2")]
pub fn accumulate_row_f32(acc: &mut [f32], row: &[f32], w: f32) {
    let len = acc.len().min(row.len());
    let body = len - len % 8;

    unsafe {
        accumulate_f32_ptr(acc.as_mut_ptr(), row.as_ptr(), body, w);
    }
    rust::accumulate_row_f32(&mut acc[body..len], &row[body..len], w);
}

#[target_feature(enable = "avx2")]
unsafe fn accumulate_f32_ptr(acc: *mut f32, row: *const f32, len: usize, w: f32) {
    let weight = _mm256_set1_ps(w);
    for x in (0..len).step_by(8) {
        let a = _mm256_loadu_ps(acc.add(x));
        let r = _mm256_loadu_ps(row.add(x));
        _mm256_storeu_ps(acc.add(x), _mm256_add_ps(a, _mm256_mul_ps(r, weight)));
    }
}

/// `acc[i] += row[i] * w` with 64-bit accumulators, four lanes at a time.
#[target_feature(enable = "avx2")]
pub fn accumulate_row_i64(acc: &mut [i64], row: &[i32], w: i32) {
    let len = acc.len().min(row.len());
    let body = len - len % 4;

    unsafe {
        accumulate_i64_ptr(acc.as_mut_ptr(), row.as_ptr(), body, w);
    }
    rust::accumulate_row_i64(&mut acc[body..len], &row[body..len], w);
}

#[target_feature(enable = "avx2")]
unsafe fn accumulate_i64_ptr(acc: *mut i64, row: *const i32, len: usize, w: i32) {
    // _mm256_mul_epi32 reads the low, sign-extended half of each lane
    let weight = _mm256_set1_epi64x(i64::from(w));
    for x in (0..len).step_by(4) {
        let r = _mm256_cvtepi32_epi64(_mm_loadu_si128(row.add(x) as *const __m128i));
        let a = _mm256_loadu_si256(acc.add(x) as *const __m256i);
        let sum = _mm256_add_epi64(a, _mm256_mul_epi32(r, weight));
        _mm256_storeu_si256(acc.add(x) as *mut __m256i, sum);
    }
}
