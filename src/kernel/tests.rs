#![allow(clippy::unwrap_used, reason = "allow in test files")]

use super::*;

const ALL_NAMES: &[&str] = &[
    "point",
    "rect",
    "box",
    "nearest",
    "linear",
    "bilinear",
    "triangle",
    "cubic",
    "bicubic",
    "lanczos",
    "blackman",
    "blackmanminlobe",
    "sinc",
    "spline16",
    "spline36",
    "spline64",
    "spline",
    "gauss",
    "gaussian",
];

fn kernel(name: &str, taps: usize) -> Box<dyn ContFir> {
    create_kernel_fnc(name, &[], taps, KernelCoefs::default()).unwrap()
}

#[test]
fn all_kernels_peak_at_zero() {
    // the default cubic is not interpolating
    for name in ALL_NAMES.iter().filter(|name| !name.contains("cubic")) {
        let k = kernel(name, 4);
        assert!((k.eval(0.0) - 1.0).abs() < 1e-12, "{name} at 0");
        assert!(k.support() > 0.0, "{name} support");
    }
}

#[test]
fn all_kernels_are_even_and_bounded() {
    for name in ALL_NAMES {
        let k = kernel(name, 3);
        let support = k.support();
        let mut x = 0.0;
        while x <= support + 1.0 {
            assert!((k.eval(x) - k.eval(-x)).abs() < 1e-12, "{name} at {x}");
            x += 0.0625;
        }
        assert_eq!(k.eval(support + 0.01), 0.0, "{name} outside its support");
    }
}

#[test]
fn names_are_case_insensitive() {
    let k = kernel("Spline36", 4);
    assert_eq!(k.support(), 3.0);
    let k = kernel("LANCZOS", 3);
    assert_eq!(k.support(), 3.0);
}

#[test]
fn unknown_kernel_is_rejected() {
    let err = create_kernel_fnc("mitchell", &[], 4, KernelCoefs::default()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ResampleError>(),
        Some(ResampleError::InvalidArgument(_))
    ));
}

#[test]
fn interpolating_kernels_vanish_on_integers() {
    for name in ["linear", "lanczos", "blackman", "sinc", "spline16", "spline36", "spline64", "spline"] {
        let k = kernel(name, 4);
        for i in 1..=4 {
            assert!(k.eval(f64::from(i)).abs() < 1e-12, "{name} at {i}");
        }
    }
}

#[test]
fn rect_values() {
    assert_eq!(Rect.eval(0.25), 1.0);
    assert_eq!(Rect.eval(-0.5), 0.5);
    assert_eq!(Rect.eval(0.75), 0.0);
}

#[test]
fn cubic_defaults_to_mitchell() {
    let k = kernel("bicubic", 4);
    // (6 - 2B) / 6 and B / 6 with B = 1/3
    assert!((k.eval(0.0) - 8.0 / 9.0).abs() < 1e-12);
    assert!((k.eval(1.0) - 1.0 / 18.0).abs() < 1e-12);
    assert_eq!(k.eval(2.0), 0.0);
}

#[test]
fn catmull_rom_interpolates() {
    let coefs = KernelCoefs {
        a1: Some(0.0),
        a2: Some(0.5),
        a3: None,
    };
    let k = create_kernel_fnc("cubic", &[], 4, coefs).unwrap();
    assert!((k.eval(0.0) - 1.0).abs() < 1e-12);
    assert!(k.eval(1.0).abs() < 1e-12);
    assert!((k.eval(0.5) - 0.5625).abs() < 1e-12);
}

#[test]
fn generic_spline_matches_named_splines() {
    let pairs: [(usize, Box<dyn ContFir>); 3] =
        [(2, Box::new(Spline16)), (3, Box::new(Spline36)), (4, Box::new(Spline64))];
    for (taps, named) in pairs {
        let generic = Spline::new(taps);
        assert_eq!(generic.support(), named.support());
        let mut x = 0.0;
        while x < named.support() {
            assert!(
                (generic.eval(x) - named.eval(x)).abs() < 1e-9,
                "taps {taps} at {x}: {} vs {}",
                generic.eval(x),
                named.eval(x)
            );
            x += 0.05;
        }
    }
}

#[test]
fn one_tap_spline_is_linear() {
    let k = Spline::new(1);
    assert!((k.eval(0.25) - 0.75).abs() < 1e-12);
    assert_eq!(k.eval(1.5), 0.0);
}

#[test]
fn gauss_parameter_domain() {
    let bad = KernelCoefs {
        a1: Some(0.5),
        ..KernelCoefs::default()
    };
    assert!(create_kernel_fnc("gauss", &[], 4, bad).is_err());

    let good = KernelCoefs {
        a1: Some(10.0),
        ..KernelCoefs::default()
    };
    let k = create_kernel_fnc("gauss", &[], 4, good).unwrap();
    // p = 10 gives 2^(-x^2)
    assert!((k.eval(1.0) - 0.5).abs() < 1e-12);
    assert!((k.eval(2.0) - 1.0 / 16.0).abs() < 1e-12);
}

#[test]
fn impulse_interpolates_samples() {
    let k = create_kernel_fnc("impulse", &[0.25, 1.0, 0.25], 4, KernelCoefs::default()).unwrap();
    assert_eq!(k.eval(0.0), 1.0);
    assert_eq!(k.eval(1.0), 0.25);
    assert_eq!(k.eval(-0.5), 0.625);
    assert_eq!(k.eval(1.5), 0.125);
    assert_eq!(k.eval(2.0), 0.0);
    assert_eq!(k.support(), 2.0);
}

#[test]
fn impulse_requires_odd_non_empty_samples() {
    assert!(create_kernel_fnc("impulse", &[], 4, KernelCoefs::default()).is_err());
    assert!(create_kernel_fnc("impulse", &[0.5, 0.5], 4, KernelCoefs::default()).is_err());
}
