//! Portal configuration
//!
//! Everything that used to be a build-time constant (spreadsheet id, the
//! sheet-name-to-tab mapping, dashboard passwords) lives in one JSON file.
//! Every field has a default so an empty `{}` file is a valid config.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::normalize::financial::{MetricLabel, default_metric_labels};

/// Default public export host.
pub const DEFAULT_BASE_URL: &str = "https://docs.google.com";

/// Identifies what to fetch: a sheet (tab) name and an optional A1 range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRef {
    /// Tab name in the source spreadsheet
    pub sheet: String,

    /// A1-style range such as `E1:F10`
    #[serde(default)]
    pub range: Option<String>,
}

impl SheetRef {
    pub fn new(sheet: impl Into<String>) -> Self {
        SheetRef {
            sheet: sheet.into(),
            range: None,
        }
    }

    pub fn with_range(sheet: impl Into<String>, range: impl Into<String>) -> Self {
        SheetRef {
            sheet: sheet.into(),
            range: Some(range.into()),
        }
    }
}

/// A password gate in front of one or more dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Gate name, used in `/login/{name}`
    pub name: String,

    /// Argon2 PHC string; generate with `portal-cli hash-password`
    pub password_hash: String,
}

/// One business entity's copy of the financial and project dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantConfig {
    /// URL segment, e.g. `roofing`
    pub key: String,

    pub display_name: String,

    pub financial_sheet: SheetRef,

    pub projects_sheet: SheetRef,

    /// Prefix for synthetic project ids, e.g. `job` gives `job-3fa1...`
    pub id_prefix: String,

    /// Gate protecting this tenant's dashboards
    pub gate: String,

    /// Metric-name substrings, checked in order
    pub metric_labels: Vec<MetricLabel>,
}

impl Default for TenantConfig {
    fn default() -> Self {
        TenantConfig {
            key: "main".to_string(),
            display_name: "Main".to_string(),
            financial_sheet: SheetRef::with_range("NUMBERS", "E1:F10"),
            projects_sheet: SheetRef::new("PROJECTS"),
            id_prefix: "project".to_string(),
            gate: "staff".to_string(),
            metric_labels: default_metric_labels(),
        }
    }
}

/// Top-level configuration for the portal server and CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Id of the publicly shared spreadsheet
    pub spreadsheet_id: String,

    /// Export host; overridable so tests can serve CSV locally
    pub base_url: String,

    /// Address the web server listens on
    pub bind_addr: String,

    pub stages_sheet: SheetRef,

    pub tasks_sheet: SheetRef,

    /// Gate protecting the shared staff dashboards (stages, tasks, reminders)
    pub staff_gate: String,

    /// JSON file backing the reminder store
    pub reminders_path: String,

    pub gates: Vec<GateConfig>,

    pub tenants: Vec<TenantConfig>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        PortalConfig {
            spreadsheet_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            bind_addr: "127.0.0.1:3000".to_string(),
            stages_sheet: SheetRef::new("PROCESS"),
            tasks_sheet: SheetRef::new("TODO"),
            staff_gate: "staff".to_string(),
            reminders_path: "database/reminders.json".to_string(),
            gates: Vec::new(),
            tenants: vec![TenantConfig::default()],
        }
    }
}

impl PortalConfig {
    /// Read and parse a config file.
    ///
    /// # Arguments
    /// * `path` - Path to a JSON config file
    ///
    /// # Returns
    /// * `Result<PortalConfig, String>` - The parsed config or a readable error
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        Self::from_json(&contents)
            .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
    }

    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(contents)
    }

    pub fn tenant(&self, key: &str) -> Option<&TenantConfig> {
        self.tenants.iter().find(|t| t.key == key)
    }

    pub fn gate(&self, name: &str) -> Option<&GateConfig> {
        self.gates.iter().find(|g| g.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_gives_defaults() {
        let config = PortalConfig::from_json("{}").unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.tenants.len(), 1);
        assert_eq!(
            config.tenants[0].financial_sheet,
            SheetRef::with_range("NUMBERS", "E1:F10")
        );
        assert!(!config.tenants[0].metric_labels.is_empty());
    }

    #[test]
    fn tenants_are_parameterized() {
        let config = PortalConfig::from_json(
            r#"{
                "spreadsheet_id": "abc123",
                "tenants": [
                    { "key": "roofing", "id_prefix": "job",
                      "financial_sheet": { "sheet": "ROOF NUMBERS" } },
                    { "key": "claims", "projects_sheet": { "sheet": "CLAIMS", "range": "A1:K200" } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.spreadsheet_id, "abc123");
        let roofing = config.tenant("roofing").unwrap();
        assert_eq!(roofing.id_prefix, "job");
        assert_eq!(roofing.financial_sheet.range, None);
        let claims = config.tenant("claims").unwrap();
        assert_eq!(claims.id_prefix, "project");
        assert_eq!(claims.projects_sheet.range.as_deref(), Some("A1:K200"));
        assert!(config.tenant("missing").is_none());
    }
}
