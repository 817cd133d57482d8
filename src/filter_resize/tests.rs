#![allow(clippy::unwrap_used, reason = "allow in test files")]
#![allow(clippy::undocumented_unsafe_blocks, reason = "allow in test files")]
#![allow(unused_unsafe)]

use pastey::paste;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro128StarStar;

use super::*;
use crate::{
    format::{SampleType, compute_fmt_mac_cst},
    kernel::KernelCoefs,
};

fn kernel(name: &str) -> KernelData {
    KernelData::create_kernel(name, &[], 4, KernelCoefs::default(), 0, false, 4, 0.0).unwrap()
}

fn int_fmt(bits: u8) -> PixelFormat {
    PixelFormat::new(SampleType::Integer, bits, true).unwrap()
}

fn float_fmt() -> PixelFormat {
    PixelFormat::new(SampleType::Float, 32, true).unwrap()
}

fn plane_spec(
    (src_width, src_height): (usize, usize),
    (dst_width, dst_height): (usize, usize),
    kernel: &KernelData,
    (gain, add_cst): (f64, f64),
) -> ResampleSpecPlane {
    ResampleSpecPlane {
        src_width,
        src_height,
        dst_width,
        dst_height,
        win_x: 0.0,
        win_y: 0.0,
        win_w: src_width as f64,
        win_h: src_height as f64,
        center_pos_src_h: 0.0,
        center_pos_src_v: 0.0,
        center_pos_dst_h: 0.0,
        center_pos_dst_v: 0.0,
        kernel_scale_h: 1.0,
        kernel_scale_v: 1.0,
        kernel_hash_h: kernel.hash(),
        kernel_hash_v: kernel.hash(),
        gain,
        add_cst,
    }
}

fn random_u8(len: usize) -> Vec<u8> {
    let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");
    (0..len).map(|_| rng.random()).collect()
}

#[test]
fn identity_spec_is_a_bypass() {
    let k = kernel("spline36");
    let src_fmt = int_fmt(8);
    let dst_fmt = int_fmt(16);
    let spec = plane_spec((5, 3), (5, 3), &k, compute_fmt_mac_cst(&dst_fmt, &src_fmt, false));
    let filter =
        FilterResize::new(&spec, &k, &k, true, src_fmt, dst_fmt, false, CpuFeatures::detect())
            .unwrap();
    assert!(filter.is_bypass());

    let src: Vec<u8> = (0..15).map(|v| v * 17).collect();
    let mut dst = vec![0u16; 15];
    filter
        .process_plane(PlaneBufMut::U16(&mut dst), 5, PlaneBuf::U8(&src), 5, false)
        .unwrap();
    let expected: Vec<u16> = src.iter().map(|&v| u16::from(v) * 257).collect();
    assert_eq!(dst, expected);
}

#[test]
fn border_taps_are_omitted_float() {
    let k = kernel("linear");
    let spec = plane_spec((2, 1), (4, 1), &k, (1.0, 0.0));
    let filter = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        float_fmt(),
        float_fmt(),
        false,
        CpuFeatures::empty(),
    )
    .unwrap();
    assert!(!filter.is_int_path());

    let src = [10.0f32, 20.0];
    let mut dst = [0f32; 4];
    filter
        .process_plane(PlaneBufMut::F32(&mut dst), 4, PlaneBuf::F32(&src), 2, false)
        .unwrap();
    // The last output loses the weight of the missing third sample
    assert_eq!(dst, [10.0, 15.0, 20.0, 10.0]);
}

#[test]
fn border_taps_are_omitted_integer_horizontal() {
    let k = kernel("linear");
    let spec = plane_spec((2, 1), (4, 1), &k, (1.0, 0.0));
    let filter = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        int_fmt(16),
        int_fmt(16),
        false,
        CpuFeatures::empty(),
    )
    .unwrap();
    assert!(filter.is_int_path());

    let src = [1000u16, 2000];
    let mut dst = [0u16; 4];
    filter
        .process_plane(PlaneBufMut::U16(&mut dst), 4, PlaneBuf::U16(&src), 2, false)
        .unwrap();
    assert_eq!(dst, [1000, 1500, 2000, 1000]);
}

#[test]
fn border_taps_are_omitted_integer_vertical() {
    let k = kernel("linear");
    let spec = plane_spec((1, 2), (1, 4), &k, (1.0, 0.0));
    let filter = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        int_fmt(16),
        int_fmt(16),
        false,
        CpuFeatures::empty(),
    )
    .unwrap();

    let src = [1000u16, 2000];
    let mut dst = [0u16; 4];
    filter
        .process_plane(PlaneBufMut::U16(&mut dst), 1, PlaneBuf::U16(&src), 1, false)
        .unwrap();
    assert_eq!(dst, [1000, 1500, 2000, 1000]);
}

#[test]
fn constant_interior_is_preserved_on_downscale() {
    let k = kernel("spline36");
    let spec = plane_spec((64, 64), (17, 13), &k, (1.0, 0.0));
    let filter = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        int_fmt(8),
        int_fmt(8),
        false,
        CpuFeatures::detect(),
    )
    .unwrap();

    let src = vec![100u8; 64 * 64];
    let mut dst = vec![0u8; 17 * 13];
    filter
        .process_plane(PlaneBufMut::U8(&mut dst), 17, PlaneBuf::U8(&src), 64, false)
        .unwrap();
    // Outputs whose taps all fall inside the source
    for y in 5..=8 {
        for x in 4..=13 {
            assert_eq!(dst[y * 17 + x], 100, "at {x},{y}");
        }
    }
}

#[test]
fn integer_and_float_paths_agree() {
    let k = kernel("spline36");
    let spec = plane_spec((37, 23), (53, 41), &k, (1.0, 0.0));
    let src = random_u8(37 * 23);

    let mut results = Vec::new();
    for force_float in [false, true] {
        let filter = FilterResize::new(
            &spec,
            &k,
            &k,
            true,
            int_fmt(8),
            int_fmt(8),
            force_float,
            CpuFeatures::detect(),
        )
        .unwrap();
        assert_eq!(filter.is_int_path(), !force_float);

        let mut dst = vec![0u8; 53 * 41];
        filter
            .process_plane(PlaneBufMut::U8(&mut dst), 53, PlaneBuf::U8(&src), 37, false)
            .unwrap();
        results.push(dst);
    }

    for (a, b) in results[0].iter().zip(&results[1]) {
        assert!(a.abs_diff(*b) <= 1, "{a} vs {b}");
    }
}

#[test]
fn integer_and_float_paths_agree_on_16_bit_output() {
    let k = kernel("spline36");
    let dst_fmt = int_fmt(16);
    let mut rng = Xoshiro128StarStar::from_seed(*b"deadbeeflolcakes");

    for src_bits in [8u8, 10, 16] {
        let src_fmt = int_fmt(src_bits);
        let spec = plane_spec((72, 48), (160, 90), &k, compute_fmt_mac_cst(&dst_fmt, &src_fmt, false));
        let max = (1u32 << src_bits) - 1;
        let src: Vec<u16> = (0..72 * 48).map(|_| (rng.random::<u32>() % (max + 1)) as u16).collect();

        let run = |force_float: bool| {
            let filter =
                FilterResize::new(&spec, &k, &k, true, src_fmt, dst_fmt, force_float, CpuFeatures::detect())
                    .unwrap();
            let mut dst = vec![0u16; 160 * 90];
            if src_bits == 8 {
                let src8: Vec<u8> = src.iter().map(|&v| v as u8).collect();
                filter
                    .process_plane(PlaneBufMut::U16(&mut dst), 160, PlaneBuf::U8(&src8), 72, false)
                    .unwrap();
            } else {
                filter
                    .process_plane(PlaneBufMut::U16(&mut dst), 160, PlaneBuf::U16(&src), 72, false)
                    .unwrap();
            }
            dst
        };

        let int = run(false);
        let flt = run(true);
        for (i, (a, b)) in int.iter().zip(&flt).enumerate() {
            assert!(a.abs_diff(*b) <= 1, "{src_bits} bits, sample {i}: {a} vs {b}");
        }
    }
}

#[test]
fn shifted_single_tap_runs_the_engine() {
    let k = KernelData::create_kernel("point", &[], 1, KernelCoefs::default(), 0, false, 4, 0.0).unwrap();
    let src_fmt = int_fmt(8);
    let dst_fmt = int_fmt(16);
    let mut spec = plane_spec((6, 4), (6, 4), &k, compute_fmt_mac_cst(&dst_fmt, &src_fmt, false));
    // One sample right and one sample up, in half-sample units
    spec.center_pos_dst_h = 2.0;
    spec.center_pos_dst_v = -2.0;
    let src: Vec<u8> = (0..24).map(|v| v * 10 + 3).collect();

    let mut expected = vec![0u16; 24];
    for y in 1..4 {
        for x in 0..5 {
            expected[y * 6 + x] = u16::from(src[(y - 1) * 6 + x + 1]) * 257;
        }
    }

    for force_float in [false, true] {
        let filter =
            FilterResize::new(&spec, &k, &k, true, src_fmt, dst_fmt, force_float, CpuFeatures::detect())
                .unwrap();
        assert!(!filter.is_bypass());
        assert_eq!(filter.is_int_path(), !force_float);

        let mut dst = vec![0xFFFFu16; 24];
        filter
            .process_plane(PlaneBufMut::U16(&mut dst), 6, PlaneBuf::U8(&src), 6, false)
            .unwrap();
        assert_eq!(dst, expected, "float path: {force_float}");
    }
}

#[test]
fn simd_matches_scalar() {
    let k = kernel("spline36");
    let spec = plane_spec((45, 31), (70, 19), &k, (257.0, 0.0));
    let src = random_u8(45 * 31);

    for force_float in [false, true] {
        let mut results = Vec::new();
        for cpu in [CpuFeatures::empty(), CpuFeatures::AVX2] {
            let filter = FilterResize::new(
                &spec,
                &k,
                &k,
                true,
                int_fmt(8),
                int_fmt(16),
                force_float,
                cpu,
            )
            .unwrap();
            let mut dst = vec![0u16; 70 * 19];
            filter
                .process_plane(PlaneBufMut::U16(&mut dst), 70, PlaneBuf::U8(&src), 45, false)
                .unwrap();
            results.push(dst);
        }
        assert_eq!(results[0], results[1]);
    }
}

#[test]
fn unsupported_cpu_features_are_masked() {
    let k = kernel("linear");
    let spec = plane_spec((4, 4), (8, 8), &k, (1.0, 0.0));
    let filter = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        int_fmt(8),
        int_fmt(8),
        false,
        CpuFeatures::all(),
    )
    .unwrap();
    assert!(CpuFeatures::detect().contains(filter.cpu_features()));
}

#[test]
fn mismatched_storage_is_rejected() {
    let k = kernel("linear");
    let spec = plane_spec((4, 4), (8, 8), &k, (1.0, 0.0));
    let filter = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        int_fmt(8),
        int_fmt(8),
        false,
        CpuFeatures::empty(),
    )
    .unwrap();

    let src = vec![0u16; 16];
    let mut dst = vec![0u8; 64];
    let err = filter
        .process_plane(PlaneBufMut::U8(&mut dst), 8, PlaneBuf::U16(&src), 4, false)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResampleError>(),
        Some(ResampleError::ProcessingException(_))
    ));
}

#[test]
fn short_buffers_are_rejected() {
    let k = kernel("linear");
    let spec = plane_spec((4, 4), (8, 8), &k, (1.0, 0.0));
    let filter = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        int_fmt(8),
        int_fmt(8),
        false,
        CpuFeatures::empty(),
    )
    .unwrap();

    let src = vec![0u8; 16];
    let mut dst = vec![0u8; 63];
    let err = filter
        .process_plane(PlaneBufMut::U8(&mut dst), 8, PlaneBuf::U8(&src), 4, false)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResampleError>(),
        Some(ResampleError::ProcessingException(_))
    ));
}

#[test]
fn empty_plane_cannot_be_built() {
    let k = kernel("linear");
    let spec = plane_spec((4, 4), (0, 8), &k, (1.0, 0.0));
    let err = FilterResize::new(
        &spec,
        &k,
        &k,
        true,
        int_fmt(8),
        int_fmt(8),
        false,
        CpuFeatures::empty(),
    )
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResampleError>(),
        Some(ResampleError::RuntimeFailure(_))
    ));
}

#[test]
fn unbounded_window_cannot_be_built() {
    let k = kernel("linear");
    for win_w in [f64::INFINITY, f64::NAN] {
        let mut spec = plane_spec((4, 4), (8, 8), &k, (1.0, 0.0));
        spec.win_w = win_w;
        let err = FilterResize::new(
            &spec,
            &k,
            &k,
            true,
            int_fmt(8),
            int_fmt(8),
            false,
            CpuFeatures::empty(),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResampleError>(),
            Some(ResampleError::RuntimeFailure(_))
        ));
    }
}

#[test]
fn clipped_taps_drop_outside_weights() {
    let k = kernel("linear");
    let spec = plane_spec((2, 1), (4, 1), &k, (1.0, 0.0));
    let table = WeightTable::build(k.kernel(), &spec.axis(Dir::H), true, 1.0);
    let taps = clip_taps(&table, 2);
    assert_eq!(taps.len(), 4);
    assert_eq!(taps[3].start, 1);
    assert_eq!(taps[3].weights.as_slice(), [0.5]);
    assert_eq!(taps[3].fixed.as_slice(), [1 << (FIXED_BITS - 1)]);
}

macro_rules! accumulate_tests {
    ($module:ident) => {
        paste! {
            #[test]
            fn [<accumulate_f32_ $module>]() {
                for len in [1usize, 7, 8, 9, 31, 64] {
                    let row: Vec<f32> = (0..len).map(|i| i as f32 * 0.37 - 3.0).collect();
                    let mut acc: Vec<f32> = (0..len).map(|i| i as f32 * 1.5).collect();
                    let expected: Vec<f32> = acc.iter().zip(&row).map(|(&a, &r)| a + r * -0.671).collect();
                    unsafe { $module::accumulate_row_f32(&mut acc, &row, -0.671) };
                    assert_eq!(acc, expected, "failed at {len}");
                }
            }

            #[test]
            fn [<accumulate_i64_ $module>]() {
                for len in [1usize, 3, 4, 5, 17, 64] {
                    let row: Vec<i32> = (0..len).map(|i| i as i32 * 4099 - 60_000).collect();
                    let mut acc: Vec<i64> = (0..len).map(|i| i as i64 * 1_000_003).collect();
                    let expected: Vec<i64> = acc
                        .iter()
                        .zip(&row)
                        .map(|(&a, &r)| a + i64::from(r) * -5123)
                        .collect();
                    unsafe { $module::accumulate_row_i64(&mut acc, &row, -5123) };
                    assert_eq!(acc, expected, "failed at {len}");
                }
            }
        }
    };
}

accumulate_tests!(rust);
#[cfg(all(target_arch = "x86_64", target_feature = "avx2", not(feature = "no_simd")))]
accumulate_tests!(avx2);
