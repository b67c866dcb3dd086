//! Opening many sources at once

use crate::adapter::{AdapterOptions, RadarAdapter};
use crate::io::DatasetOpener;
use crate::types::{RadarError, RadarResult};

/// What to do when some sources of a batch fail to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Fail the whole batch
    Abort,
    /// Log the failures and keep the adapters that opened
    ContinueWithGood,
}

/// Outcome of opening a batch of sources
pub struct BatchOpen {
    /// Adapters in source order
    pub adapters: Vec<RadarAdapter>,
    /// Sources that failed, with their errors
    pub failures: Vec<(String, RadarError)>,
}

impl BatchOpen {
    pub fn total(&self) -> usize {
        self.adapters.len() + self.failures.len()
    }

    pub fn into_result(self, policy: FailurePolicy) -> RadarResult<Vec<RadarAdapter>> {
        let total = self.total();
        let BatchOpen { adapters, mut failures } = self;

        if failures.is_empty() {
            return Ok(adapters);
        }
        if adapters.is_empty() {
            log::error!("All {} sources failed to open", total);
            let (source, err) = failures.remove(0);
            log::debug!("First failure was {}", source);
            return Err(err);
        }

        match policy {
            FailurePolicy::Abort => Err(RadarError::Batch {
                failed: failures.into_iter().map(|(source, _)| source).collect(),
                total,
            }),
            FailurePolicy::ContinueWithGood => {
                for (source, err) in &failures {
                    log::warn!("Skipping {}: {}", source, err);
                }
                log::info!("Continuing with {} of {} sources", adapters.len(), total);
                Ok(adapters)
            }
        }
    }
}

/// Open one adapter per source. A failing source never stops the others.
pub fn open_adapters<S>(opener: &dyn DatasetOpener, sources: &[S], options: &AdapterOptions) -> BatchOpen
where
    S: AsRef<str> + Sync,
{
    log::info!("Opening {} radar sources", sources.len());

    let open = |source: &S| {
        let source = source.as_ref();
        (source.to_string(), RadarAdapter::open(opener, source, options))
    };

    #[cfg(feature = "parallel")]
    let results: Vec<(String, RadarResult<RadarAdapter>)> = {
        use rayon::prelude::*;
        sources.par_iter().map(open).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let results: Vec<(String, RadarResult<RadarAdapter>)> = sources.iter().map(open).collect();

    let mut batch = BatchOpen {
        adapters: Vec::with_capacity(results.len()),
        failures: Vec::new(),
    };
    for (source, result) in results {
        match result {
            Ok(adapter) => batch.adapters.push(adapter),
            Err(e) => {
                log::warn!("Failed to open {}: {}", source, e);
                batch.failures.push((source, e));
            }
        }
    }
    batch
}
