#![allow(clippy::unwrap_used, reason = "allow in test files")]

use anyhow::{Context, bail};

use super::*;

#[test]
fn messages_carry_the_filter_prefix() {
    assert_eq!(
        ResampleError::invalid_arg("w must be positive.").to_string(),
        "resample: w must be positive."
    );
    assert_eq!(
        ResampleError::processing("empty plane.").to_string(),
        "resample: empty plane."
    );
}

#[test]
fn error_message_renders_the_chain() {
    let err = (|| -> anyhow::Result<()> {
        bail!(ResampleError::runtime("cannot build filter."));
    })()
    .context("plane 1")
    .unwrap_err();
    assert_eq!(error_message(&err), "plane 1: resample: cannot build filter.");
}

#[test]
fn kind_survives_propagation() {
    let err: anyhow::Error = ResampleError::processing("bad stride.").into();
    assert!(matches!(
        err.downcast_ref::<ResampleError>(),
        Some(ResampleError::ProcessingException(_))
    ));
}
