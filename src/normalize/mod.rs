//! Record normalizers
//!
//! Pure functions from parsed sheet rows to typed dashboard records. They never
//! fail: rows that fit no rule are logged and dropped (or, for stages, listed
//! as unparsed), and empty input yields the empty record shape.

pub mod financial;
pub mod projects;
pub mod stages;
pub mod tasks;

pub use financial::{FinancialMetrics, Metric, MetricLabel, format_currency, normalize_financials};
pub use projects::{Project, find_project, normalize_projects};
pub use stages::{Stage, StageOutline, normalize_stages};
pub use tasks::{AdjusterMeeting, TaskBoard, TodoItem, normalize_tasks};
