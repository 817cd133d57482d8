#[cfg(test)]
mod tests;

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::{Result, bail};
use log::{debug, warn};
use parking_lot::Mutex;

use crate::{error::ResampleError, filter_resize::FilterResize, resample_spec::ResampleSpecPlane};

/// Filters shared by all frames of one instance, keyed by plane spec.
///
/// A filter is built at most once per distinct spec. Concurrent callers
/// asking for the same spec wait for the first build and share its result.
#[derive(Debug, Default)]
pub struct FilterCache {
    filters: Mutex<HashMap<ResampleSpecPlane, Arc<FilterResize>>>,
    /// Calls to a build closure, failed ones included.
    constructed: AtomicUsize,
}

impl FilterCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the filter for `spec`, calling `build` if there is none yet.
    /// A failed build leaves the cache unchanged.
    pub fn get_or_create(
        &self,
        spec: &ResampleSpecPlane,
        build: impl FnOnce(&ResampleSpecPlane) -> Result<FilterResize>,
    ) -> Result<Arc<FilterResize>> {
        let mut filters = self.filters.lock();
        if let Some(filter) = filters.get(spec) {
            return Ok(Arc::clone(filter));
        }

        self.constructed.fetch_add(1, Ordering::Relaxed);
        let filter = match build(spec) {
            Ok(filter) => Arc::new(filter),
            Err(err) => {
                warn!("filter construction failed: {err:#}");
                if err.downcast_ref::<ResampleError>().is_some() {
                    return Err(err);
                }
                bail!(ResampleError::runtime(format!("cannot build filter: {err:#}")));
            }
        };
        filters.insert(*spec, Arc::clone(&filter));
        debug!("filter cache holds {} entries", filters.len());

        Ok(filter)
    }

    /// Number of distinct filters built so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.lock().len()
    }

    #[must_use]
    pub fn constructed(&self) -> usize {
        self.constructed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
