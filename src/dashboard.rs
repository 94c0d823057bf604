//! Dashboard pipelines
//!
//! Each dashboard is fetch → parse → normalize, run from scratch on every
//! request. Tenant-scoped dashboards take their sheets, label table and id
//! prefix from a [`TenantConfig`].

use log::info;

use crate::config::{PortalConfig, TenantConfig};
use crate::error::SheetError;
use crate::normalize::{
    FinancialMetrics, Project, StageOutline, TaskBoard, normalize_financials, normalize_projects,
    normalize_stages, normalize_tasks,
};
use crate::sheets::SheetLoader;

pub async fn load_financials(
    loader: &SheetLoader,
    tenant: &TenantConfig,
) -> Result<FinancialMetrics, SheetError> {
    let rows = loader.fetch_rows(&tenant.financial_sheet).await?;
    let metrics = normalize_financials(&rows, &tenant.metric_labels);
    info!(
        "[{}] financials: revenue={:?} profit={:?}",
        tenant.key, metrics.total_revenue, metrics.total_profit
    );
    Ok(metrics)
}

pub async fn load_projects(
    loader: &SheetLoader,
    tenant: &TenantConfig,
) -> Result<Vec<Project>, SheetError> {
    let rows = loader.fetch_rows(&tenant.projects_sheet).await?;
    let projects = normalize_projects(&rows, &tenant.id_prefix);
    info!(
        "[{}] {} projects from {} rows",
        tenant.key,
        projects.len(),
        rows.len()
    );
    Ok(projects)
}

pub async fn load_stages(
    loader: &SheetLoader,
    config: &PortalConfig,
) -> Result<StageOutline, SheetError> {
    let rows = loader.fetch_rows(&config.stages_sheet).await?;
    let outline = normalize_stages(&rows);
    info!(
        "{} stages, {} unparsed lines",
        outline.stages.len(),
        outline.unparsed.len()
    );
    Ok(outline)
}

pub async fn load_tasks(
    loader: &SheetLoader,
    config: &PortalConfig,
) -> Result<TaskBoard, SheetError> {
    let rows = loader.fetch_rows(&config.tasks_sheet).await?;
    let board = normalize_tasks(&rows);
    info!(
        "{} to-dos, {} meetings",
        board.tasks.len(),
        board.meetings.len()
    );
    Ok(board)
}
