//! Last-intent-wins refresh
//!
//! Each refresh of a dashboard takes a generation token before it starts
//! fetching. When it finishes, its result is kept only if no newer refresh
//! has already landed, so a slow early fetch cannot overwrite a fast later one.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::SheetError;

/// Token handed out by [`DashboardView::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

struct Committed<T> {
    generation: Generation,
    result: Result<T, SheetError>,
}

/// Latest committed state of one dashboard.
pub struct DashboardView<T> {
    issued: AtomicU64,
    latest: Mutex<Option<Committed<T>>>,
}

impl<T: Clone> Default for DashboardView<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> DashboardView<T> {
    pub fn new() -> Self {
        DashboardView {
            issued: AtomicU64::new(0),
            latest: Mutex::new(None),
        }
    }

    /// Start a refresh.
    pub fn begin(&self) -> Generation {
        Generation(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Finish a refresh.
    ///
    /// # Arguments
    /// * `generation` - Token from [`DashboardView::begin`]
    /// * `result` - What this refresh produced
    ///
    /// # Returns
    /// * `Result<T, SheetError>` - The freshest committed result: this one,
    ///   unless a newer refresh already landed
    pub fn resolve(&self, generation: Generation, result: Result<T, SheetError>) -> Result<T, SheetError> {
        let mut latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        match latest.as_ref() {
            Some(committed) if committed.generation > generation => {
                log::debug!(
                    "Discarding refresh {} superseded by {}",
                    generation.value(),
                    committed.generation.value()
                );
                committed.result.clone()
            }
            _ => {
                *latest = Some(Committed {
                    generation,
                    result: result.clone(),
                });
                result
            }
        }
    }

    /// The committed result, if any refresh has finished.
    pub fn current(&self) -> Option<Result<T, SheetError>> {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.as_ref().map(|c| c.result.clone())
    }

    /// Generation of the committed result.
    pub fn committed_generation(&self) -> Option<Generation> {
        let latest = self.latest.lock().unwrap_or_else(|e| e.into_inner());
        latest.as_ref().map(|c| c.generation)
    }
}
