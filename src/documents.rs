//! Names for generated documents
//!
//! Inspection reports, contracts and certificates are rendered elsewhere; this
//! module only decides the file name, which is built from the form fields.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentKind {
    InspectionReport,
    Contract,
    Certificate,
}

impl DocumentKind {
    pub fn label(self) -> &'static str {
        match self {
            DocumentKind::InspectionReport => "Inspection Report",
            DocumentKind::Contract => "Contract",
            DocumentKind::Certificate => "Certificate of Completion",
        }
    }

    pub fn from_segment(segment: &str) -> Option<Self> {
        match segment.to_lowercase().as_str() {
            "inspection-report" | "inspection" => Some(DocumentKind::InspectionReport),
            "contract" => Some(DocumentKind::Contract),
            "certificate" => Some(DocumentKind::Certificate),
            _ => None,
        }
    }
}

// Letters, digits, '-' and '.' survive; runs of anything else become one '_'
fn file_part(text: &str) -> String {
    let mut out = String::new();
    for c in text.trim().chars() {
        if c.is_alphanumeric() || c == '-' || c == '.' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// File name for a generated PDF.
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use claims_portal::documents::{DocumentKind, document_file_name};
///
/// let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
/// assert_eq!(
///     document_file_name("Jane Doe", "CLM-77", DocumentKind::Contract, date),
///     "Jane_Doe_CLM-77_Contract_2026-10-18.pdf"
/// );
/// ```
pub fn document_file_name(
    customer: &str,
    claim_number: &str,
    kind: DocumentKind,
    date: NaiveDate,
) -> String {
    let parts: Vec<String> = [customer, claim_number, kind.label()]
        .iter()
        .map(|p| file_part(p))
        .filter(|p| !p.is_empty())
        .collect();
    format!("{}_{}.pdf", parts.join("_"), date.format("%Y-%m-%d"))
}
