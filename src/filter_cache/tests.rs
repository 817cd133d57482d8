#![allow(clippy::unwrap_used, reason = "allow in test files")]

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;

use super::*;
use crate::{
    format::{PixelFormat, SampleType},
    kernel::KernelCoefs,
    kernel_data::KernelData,
    util::CpuFeatures,
};

fn kernel() -> KernelData {
    KernelData::create_kernel("bicubic", &[], 4, KernelCoefs::default(), 0, false, 4, 0.0).unwrap()
}

fn spec(dst_width: usize, k: &KernelData) -> ResampleSpecPlane {
    ResampleSpecPlane {
        src_width: 16,
        src_height: 16,
        dst_width,
        dst_height: 24,
        win_w: 16.0,
        win_h: 16.0,
        kernel_scale_h: 1.0,
        kernel_scale_v: 1.0,
        kernel_hash_h: k.hash(),
        kernel_hash_v: k.hash(),
        gain: 1.0,
        ..ResampleSpecPlane::default()
    }
}

fn build(spec: &ResampleSpecPlane, k: &KernelData) -> Result<FilterResize> {
    let fmt = PixelFormat::new(SampleType::Integer, 8, false)?;
    FilterResize::new(spec, k, k, true, fmt, fmt, false, CpuFeatures::empty())
}

#[test]
fn same_spec_is_built_once() {
    let k = kernel();
    let cache = FilterCache::new();
    let builds = AtomicUsize::new(0);
    let make = |s: &ResampleSpecPlane| {
        builds.fetch_add(1, Ordering::SeqCst);
        build(s, &k)
    };

    let a = cache.get_or_create(&spec(20, &k), make).unwrap();
    let b = cache.get_or_create(&spec(20, &k), make).unwrap();
    let c = cache.get_or_create(&spec(28, &k), make).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(!Arc::ptr_eq(&a, &c));
    assert_eq!(builds.load(Ordering::SeqCst), 2);
    assert_eq!(cache.len(), 2);
}

#[test]
fn concurrent_requests_share_one_filter() {
    let k = kernel();
    let cache = FilterCache::new();
    let builds = AtomicUsize::new(0);
    let key = spec(40, &k);

    let filters: Vec<Arc<FilterResize>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    cache
                        .get_or_create(&key, |s| {
                            builds.fetch_add(1, Ordering::SeqCst);
                            build(s, &k)
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(builds.load(Ordering::SeqCst), 1);
    assert_eq!(cache.constructed(), 1);
    assert_eq!(cache.len(), 1);
    for filter in &filters[1..] {
        assert!(Arc::ptr_eq(&filters[0], filter));
    }
}

#[test]
fn failed_build_is_not_cached() {
    let k = kernel();
    let cache = FilterCache::new();

    let err = cache
        .get_or_create(&spec(20, &k), |_| Err(anyhow!("out of memory")))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResampleError>(),
        Some(ResampleError::RuntimeFailure(_))
    ));
    assert!(cache.is_empty());

    cache.get_or_create(&spec(20, &k), |s| build(s, &k)).unwrap();
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.constructed(), 2);
}

#[test]
fn empty_plane_build_error_is_kept() {
    let k = kernel();
    let cache = FilterCache::new();
    let err = cache
        .get_or_create(&spec(0, &k), |s| build(s, &k))
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResampleError>(),
        Some(ResampleError::RuntimeFailure(_))
    ));
    assert!(cache.is_empty());
}
