#![cfg(feature = "web")]

mod common;

use claims_portal::config::SheetRef;
use claims_portal::error::SheetError;
use claims_portal::normalize::financial::default_metric_labels;
use claims_portal::normalize::{normalize_financials, normalize_projects};
use common::{MockSheet, local_loader, spawn_sheet_server};

const NUMBERS_CSV: &str = "\"Metric\",\"Value\"\n\
\"Total Revenue\",\"$120,000\"\n\
\"Total Profit\",\"45000\"\n\
\"Profit Margin\",\"37.5%\"\n";

const PROJECTS_CSV: &str = "First Name,Last Name,Claim #,Address,Stage\r\n\
Jane,Doe,CLM-77,12 Oak St,Stage 3\r\n\
,,,,\r\n\
John,Roe,CLM-78,4 Elm Ave,stage 5\r\n";

#[tokio::test]
async fn fetches_and_normalizes_numbers_sheet() {
    let base = spawn_sheet_server(vec![("NUMBERS", MockSheet::csv(NUMBERS_CSV))]).await;
    let loader = local_loader(&base);

    let rows = loader
        .fetch_rows(&SheetRef::with_range("NUMBERS", "E1:F10"))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].get("Value"), Some("$120,000"));

    let metrics = normalize_financials(&rows, &default_metric_labels());
    assert_eq!(metrics.total_revenue, "$120,000");
    assert_eq!(metrics.total_profit, "45000");
    assert_eq!(metrics.profit_margin, "37.5%");

    let display = metrics.formatted();
    assert_eq!(display.total_revenue, "$120,000");
    assert_eq!(display.total_profit, "$45,000.00");
    assert_eq!(display.total_expenses, "$0.00");
}

#[tokio::test]
async fn project_rows_without_names_are_dropped() {
    let base = spawn_sheet_server(vec![("PROJECTS", MockSheet::csv(PROJECTS_CSV))]).await;
    let loader = local_loader(&base);

    let rows = loader.fetch_rows(&SheetRef::new("PROJECTS")).await.unwrap();
    let projects = normalize_projects(&rows, "job");

    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].full_name(), "Jane Doe");
    assert_eq!(projects[0].progress_percent, 45);
    assert_eq!(projects[1].progress_percent, 75);
    assert!(projects.iter().all(|p| p.id.starts_with("job-")));
    assert_ne!(projects[0].id, projects[1].id);
}

#[tokio::test]
async fn html_page_is_a_failure_with_diagnostics() {
    let base = spawn_sheet_server(vec![]).await;
    let loader = local_loader(&base);

    let err = loader.fetch_rows(&SheetRef::new("PRIVATE")).await.unwrap_err();
    match &err {
        SheetError::Unavailable { sheet, reason, .. } => {
            assert_eq!(sheet, "PRIVATE");
            assert!(reason.contains("HTML"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.is_retryable());
    assert!(err.to_string().contains("Anyone with the link"));

    let diagnostics = err.diagnostics().expect("diagnostics attached");
    assert_eq!(diagnostics.status, "error");
    assert_eq!(diagnostics.messages, vec!["Invalid sheet: PRIVATE".to_string()]);
}

#[tokio::test]
async fn error_status_is_a_failure() {
    let base = spawn_sheet_server(vec![("GONE", MockSheet::failing(404, "not found"))]).await;
    let loader = local_loader(&base);

    let err = loader.fetch_rows(&SheetRef::new("GONE")).await.unwrap_err();
    match err {
        SheetError::Unavailable { reason, .. } => assert_eq!(reason, "HTTP 404"),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn header_only_sheet_is_empty() {
    let base = spawn_sheet_server(vec![("TODO", MockSheet::csv("Task,Owner\n"))]).await;
    let loader = local_loader(&base);

    let err = loader
        .fetch_rows(&SheetRef::with_range("TODO", "A1:B20"))
        .await
        .unwrap_err();
    assert!(matches!(err, SheetError::Empty { .. }));
    assert!(err.to_string().contains("(range A1:B20)"));

    let diagnostics = err.diagnostics().expect("diagnostics attached");
    assert_eq!(diagnostics.status, "ok");
    assert_eq!(diagnostics.column_labels, vec!["Task", "Owner"]);
}

#[tokio::test]
async fn unreachable_host_is_a_failure() {
    // Nothing listens on port 9 locally
    let loader = local_loader("http://127.0.0.1:9");
    let err = loader.fetch_rows(&SheetRef::new("NUMBERS")).await.unwrap_err();
    assert!(matches!(err, SheetError::Unavailable { .. }));
    assert!(err.diagnostics().is_none());
}
