//! Error types for sheet loading and reminder storage
//!
//! Loader failures are page-level and retryable by hand (a "Refresh" action);
//! nothing in the crate retries on its own. Normalizers never fail, so they
//! have no error type.

use thiserror::Error;

use crate::sheets::GvizDiagnostics;

/// Guidance appended to every loader failure.
pub const SHARING_GUIDANCE: &str =
    "Make sure the spreadsheet is shared as \"Anyone with the link can view\".";

/// Failure to turn a sheet reference into rows.
#[derive(Debug, Clone, Error)]
pub enum SheetError {
    /// The export endpoint could not be reached, answered with an error
    /// status, or sent back an HTML page instead of CSV.
    #[error("Failed to load sheet \"{sheet}\"{}: {reason}. {}", range_suffix(.range), SHARING_GUIDANCE)]
    Unavailable {
        sheet: String,
        range: Option<String>,
        reason: String,
        diagnostics: Option<GvizDiagnostics>,
    },

    /// The response parsed, but held a header row and no data rows.
    #[error("Sheet \"{sheet}\"{} returned no data rows. {}", range_suffix(.range), SHARING_GUIDANCE)]
    Empty {
        sheet: String,
        range: Option<String>,
        diagnostics: Option<GvizDiagnostics>,
    },
}

fn range_suffix(range: &Option<String>) -> String {
    match range {
        Some(r) => format!(" (range {})", r),
        None => String::new(),
    }
}

impl SheetError {
    /// Every loader failure may go away on a manual refresh.
    pub fn is_retryable(&self) -> bool {
        true
    }

    /// Message shown to the user. Unavailable and empty sheets share one
    /// message class; the detailed `Display` text goes to the logs.
    pub fn user_message(&self) -> String {
        format!(
            "Unable to load data from sheet \"{}\". Please try refreshing. {}",
            self.sheet(),
            SHARING_GUIDANCE
        )
    }

    pub fn sheet(&self) -> &str {
        match self {
            SheetError::Unavailable { sheet, .. } | SheetError::Empty { sheet, .. } => sheet,
        }
    }

    pub fn diagnostics(&self) -> Option<&GvizDiagnostics> {
        match self {
            SheetError::Unavailable { diagnostics, .. } | SheetError::Empty { diagnostics, .. } => {
                diagnostics.as_ref()
            }
        }
    }

    pub(crate) fn with_diagnostics(mut self, found: Option<GvizDiagnostics>) -> Self {
        match &mut self {
            SheetError::Unavailable { diagnostics, .. } | SheetError::Empty { diagnostics, .. } => {
                *diagnostics = found;
            }
        }
        self
    }
}

/// Failure to persist reminders.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
