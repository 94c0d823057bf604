//! Project (job) listings
//!
//! Columns are found by header name, tolerating case, spacing and punctuation
//! differences between the tenants' sheets. Ids are derived from the claim
//! number and address so a detail link survives re-sorting of the sheet.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use crate::sheets::Row;

lazy_static! {
    static ref STAGE_NUMBER: Regex = Regex::new(r"(?i)stage\s*(\d+)").unwrap();
}

/// Completion percentage by stage number. Stage 7 closes the job.
const STAGE_PROGRESS: [(u32, u8); 7] = [
    (1, 15),
    (2, 30),
    (3, 45),
    (4, 60),
    (5, 75),
    (6, 90),
    (7, 100),
];

const HASH_ID_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FirstName,
    LastName,
    Phone,
    Email,
    Address,
    ClaimNumber,
    InsuranceCompany,
    Adjuster,
    Stage,
    Notes,
}

const FIELD_ALIASES: [(Field, &[&str]); 10] = [
    (Field::FirstName, &["first name", "first", "firstname", "customer first name"]),
    (Field::LastName, &["last name", "last", "lastname", "surname", "customer last name"]),
    (Field::Phone, &["phone", "phone number", "cell", "mobile"]),
    (Field::Email, &["email", "email address", "e-mail"]),
    (Field::Address, &["address", "property address", "street address", "job address"]),
    (Field::ClaimNumber, &["claim number", "claim #", "claim no", "claim"]),
    (Field::InsuranceCompany, &["insurance company", "insurance", "carrier", "insurer"]),
    (Field::Adjuster, &["adjuster", "adjuster name"]),
    (Field::Stage, &["stage", "current stage", "status"]),
    (Field::Notes, &["notes", "note", "comments"]),
];

/// Lower-case and keep only letters and digits, so `Claim #` and `claim` meet.
fn header_key(header: &str) -> String {
    header
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

fn field_value(row: &Row, field: Field) -> String {
    let aliases = FIELD_ALIASES
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, a)| *a)
        .unwrap_or(&[]);

    for alias in aliases {
        let wanted = header_key(alias);
        if let Some((_, value)) = row.iter().find(|(h, _)| header_key(h) == wanted) {
            return value.trim().to_string();
        }
    }
    String::new()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,

    /// 1-based position among the listed projects
    pub position: usize,

    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub claim_number: String,
    pub insurance_company: String,
    pub adjuster: String,
    pub stage: String,
    pub notes: String,
    pub progress_percent: u8,
}

impl Project {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Coarse completion for a stage cell such as `Stage 3 - Estimate`.
///
/// # Returns
/// * `u8` - The table percentage for stages 1 to 7, 0 for anything else
pub fn progress_for_stage(stage: &str) -> u8 {
    STAGE_NUMBER
        .captures(stage)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .and_then(|n| STAGE_PROGRESS.iter().find(|(s, _)| *s == n))
        .map(|(_, pct)| *pct)
        .unwrap_or(0)
}

/// Content-derived id: `<prefix>-<hash of claim number and address>`.
///
/// # Returns
/// * `Option<String>` - `None` when both parts are empty
pub fn content_id(prefix: &str, claim_number: &str, address: &str) -> Option<String> {
    let claim = claim_number.trim().to_lowercase();
    let address = address.trim().to_lowercase();
    if claim.is_empty() && address.is_empty() {
        return None;
    }

    let digest = Sha256::digest(format!("{}|{}", claim, address).as_bytes());
    let mut hash = hex::encode(digest);
    hash.truncate(HASH_ID_LEN);
    Some(format!("{}-{}", prefix, hash))
}

/// Map project rows to [`Project`] records.
///
/// # Arguments
/// * `rows` - Rows of a projects sheet
/// * `prefix` - Tenant id prefix, e.g. `job`
///
/// # Returns
/// * `Vec<Project>` - Rows with a first or last name, in sheet order. Rows
///   without claim number and address get the positional id
///   `<prefix>-<position>`; repeated ids get `-2`, `-3`... suffixes.
pub fn normalize_projects(rows: &[Row], prefix: &str) -> Vec<Project> {
    let mut projects = Vec::new();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (index, row) in rows.iter().enumerate() {
        let first_name = field_value(row, Field::FirstName);
        let last_name = field_value(row, Field::LastName);
        if first_name.is_empty() && last_name.is_empty() {
            debug!("Skipping project row {}: no customer name", index + 1);
            continue;
        }

        let position = projects.len() + 1;
        let address = field_value(row, Field::Address);
        let claim_number = field_value(row, Field::ClaimNumber);
        let base_id = content_id(prefix, &claim_number, &address)
            .unwrap_or_else(|| format!("{}-{}", prefix, position));

        let count = seen.entry(base_id.clone()).or_insert(0);
        *count += 1;
        let id = if *count == 1 {
            base_id
        } else {
            format!("{}-{}", base_id, count)
        };

        let stage = field_value(row, Field::Stage);
        projects.push(Project {
            id,
            position,
            progress_percent: progress_for_stage(&stage),
            first_name,
            last_name,
            phone: field_value(row, Field::Phone),
            email: field_value(row, Field::Email),
            address,
            claim_number,
            insurance_company: field_value(row, Field::InsuranceCompany),
            adjuster: field_value(row, Field::Adjuster),
            stage,
            notes: field_value(row, Field::Notes),
        });
    }

    projects
}

/// Detail lookup by id.
pub fn find_project<'a>(projects: &'a [Project], id: &str) -> Option<&'a Project> {
    projects.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(first: &str, last: &str, claim: &str, address: &str, stage: &str) -> Row {
        Row::from_pairs([
            ("First Name", first),
            ("Last Name", last),
            ("Claim #", claim),
            ("Property Address", address),
            ("Current Stage", stage),
        ])
    }

    #[test]
    fn nameless_rows_dropped_and_fields_mapped() {
        let rows = vec![
            job("Ada", "Lovelace", "CLM-1", "1 Main St", "Stage 2 - Inspection"),
            job("", " ", "CLM-2", "2 Main St", "Stage 1"),
            job("", "Hopper", "", "", "Stage 7 - Paid"),
        ];
        let projects = normalize_projects(&rows, "job");
        assert_eq!(projects.len(), 2);
        assert_eq!(projects[0].claim_number, "CLM-1");
        assert_eq!(projects[0].address, "1 Main St");
        assert_eq!(projects[0].progress_percent, 30);
        assert_eq!(projects[1].full_name(), "Hopper");
        assert_eq!(projects[1].id, "job-2");
        assert_eq!(projects[1].progress_percent, 100);
        assert_eq!(projects[1].phone, "");
    }

    #[test]
    fn ids_follow_content_not_position() {
        let a = job("Ada", "L", "CLM-1", "1 Main St", "");
        let b = job("Bob", "M", "CLM-9", "9 Elm St", "");
        let forward = normalize_projects(&[a.clone(), b.clone()], "project");
        let reversed = normalize_projects(&[b, a], "project");
        assert_eq!(forward[0].id, reversed[1].id);
        assert_eq!(forward[1].id, reversed[0].id);
        assert!(forward[0].id.starts_with("project-"));
        assert_eq!(forward[0].id.len(), "project-".len() + HASH_ID_LEN);
    }

    #[test]
    fn ids_identical_across_passes() {
        let rows = vec![
            job("Ada", "L", "CLM-1", "1 Main St", ""),
            job("Bob", "M", "", "", ""),
        ];
        let first: Vec<String> = normalize_projects(&rows, "job").into_iter().map(|p| p.id).collect();
        let second: Vec<String> = normalize_projects(&rows, "job").into_iter().map(|p| p.id).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn duplicate_keys_get_suffixes() {
        let rows = vec![
            job("Ada", "L", "CLM-1", "1 Main St", ""),
            job("Ada", "L", " clm-1 ", "1 MAIN ST", ""),
        ];
        let projects = normalize_projects(&rows, "job");
        assert_eq!(projects[1].id, format!("{}-2", projects[0].id));
        assert!(find_project(&projects, &projects[1].id).is_some());
        assert!(find_project(&projects, "job-404").is_none());
    }

    #[test]
    fn stage_progress_table() {
        assert_eq!(progress_for_stage("Stage 7 - Complete"), 100);
        assert_eq!(progress_for_stage("stage 1"), 15);
        assert_eq!(progress_for_stage("Stage 9"), 0);
        assert_eq!(progress_for_stage("Waiting"), 0);
        assert_eq!(progress_for_stage(""), 0);
    }

    #[test]
    fn empty_input() {
        assert!(normalize_projects(&[], "job").is_empty());
    }
}
