use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
};
use axum_extra::extract::cookie::CookieJar;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::config::{PortalConfig, TenantConfig};
use crate::dashboard;
use crate::error::SheetError;
use crate::login;
use crate::normalize::{FinancialMetrics, Project, StageOutline, TaskBoard, find_project};
use crate::refresh::DashboardView;
use crate::reminders::{FileStore, KeyValueStore, ReminderItem, ReminderKind, ReminderStore, newest_first};
use crate::sheets::SheetLoader;

/// Per-tenant dashboard views
#[derive(Default)]
pub struct TenantViews {
    pub financials: DashboardView<FinancialMetrics>,
    pub projects: DashboardView<Vec<Project>>,
}

pub struct AppState {
    pub config: PortalConfig,
    pub loader: SheetLoader,
    pub storage: Arc<dyn KeyValueStore>,
    pub tenants: HashMap<String, TenantViews>,
    pub stages: DashboardView<StageOutline>,
    pub tasks: DashboardView<TaskBoard>,
}

impl AppState {
    pub fn new(config: PortalConfig, storage: Arc<dyn KeyValueStore>) -> Self {
        let tenants = config
            .tenants
            .iter()
            .map(|t| (t.key.clone(), TenantViews::default()))
            .collect();
        AppState {
            loader: SheetLoader::new(&config),
            config,
            storage,
            tenants,
            stages: DashboardView::new(),
            tasks: DashboardView::new(),
        }
    }

    fn tenant(&self, key: &str) -> Result<(&TenantConfig, &TenantViews), ApiError> {
        match (self.config.tenant(key), self.tenants.get(key)) {
            (Some(tenant), Some(views)) => Ok((tenant, views)),
            _ => Err(ApiError::new(StatusCode::NOT_FOUND, format!("Unknown dashboard: {}", key))),
        }
    }

    /// A gate with no configured password can never be unlocked.
    fn require_gate(&self, jar: &CookieJar, gate: &str) -> Result<(), ApiError> {
        if self.config.gate(gate).is_none() {
            warn!("Refusing access through unconfigured gate \"{}\"", gate);
            return Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "This dashboard has no password configured",
            ));
        }
        if login::jar_has_gate(jar, gate) {
            Ok(())
        } else {
            Err(ApiError::new(StatusCode::UNAUTHORIZED, "Please log in to view this dashboard"))
        }
    }
}

/// JSON error body for API routes
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub code: StatusCode,
    pub status: &'static str,
    pub message: String,
    pub retryable: bool,
}

impl ApiError {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            status: "error",
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<SheetError> for ApiError {
    fn from(err: SheetError) -> Self {
        warn!("{}", err);
        ApiError {
            code: StatusCode::BAD_GATEWAY,
            status: "error",
            message: err.user_message(),
            retryable: err.is_retryable(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.code;
        (code, Json(self)).into_response()
    }
}

#[derive(Serialize)]
struct FinancialsResponse {
    raw: FinancialMetrics,
    display: FinancialMetrics,
}

#[derive(Deserialize)]
struct NewReminder {
    description: String,
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(serve_landing))
        .route("/login", get(login::serve_login_page))
        .route("/login/:gate", post(login::handle_login))
        .route("/logout", get(login::handle_logout))
        .route("/api/stages", get(get_stages))
        .route("/api/tasks", get(get_tasks))
        .route("/api/reminders/:kind", get(list_reminders).post(add_reminder))
        .route("/api/reminders/:kind/:id", delete(delete_reminder))
        .route("/api/tenants/:tenant/financials", get(get_financials))
        .route("/api/tenants/:tenant/projects", get(get_projects))
        .route("/api/tenants/:tenant/projects/:id", get(get_project))
        .nest_service("/static", ServeDir::new("static"))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

pub async fn run(config: PortalConfig) -> Result<(), Box<dyn std::error::Error>> {
    for gate in config.tenants.iter().map(|t| &t.gate).chain([&config.staff_gate]) {
        if config.gate(gate).is_none() {
            warn!("Gate \"{}\" has no password configured; its dashboards stay locked", gate);
        }
    }

    let storage: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.reminders_path));
    let bind_addr = config.bind_addr.clone();
    let app_state = Arc::new(AppState::new(config, storage));
    let app = router(app_state);

    let listener = TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    info!("{} {} -> {}", method, uri, response.status().as_u16());
    response
}

async fn serve_landing() -> Html<&'static str> {
    Html(include_str!("./static/landing.html"))
}

async fn get_financials(
    State(state): State<Arc<AppState>>,
    Path(tenant_key): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (tenant, views) = state.tenant(&tenant_key)?;
    state.require_gate(&jar, &tenant.gate)?;

    let generation = views.financials.begin();
    let result = dashboard::load_financials(&state.loader, tenant).await;
    let metrics = views.financials.resolve(generation, result)?;

    Ok(Json(FinancialsResponse {
        display: metrics.formatted(),
        raw: metrics,
    }))
}

async fn refreshed_projects(
    state: &AppState,
    tenant: &TenantConfig,
    views: &TenantViews,
) -> Result<Vec<Project>, ApiError> {
    let generation = views.projects.begin();
    let result = dashboard::load_projects(&state.loader, tenant).await;
    Ok(views.projects.resolve(generation, result)?)
}

async fn get_projects(
    State(state): State<Arc<AppState>>,
    Path(tenant_key): Path<String>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (tenant, views) = state.tenant(&tenant_key)?;
    state.require_gate(&jar, &tenant.gate)?;
    Ok(Json(refreshed_projects(&state, tenant, views).await?))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path((tenant_key, id)): Path<(String, String)>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    let (tenant, views) = state.tenant(&tenant_key)?;
    state.require_gate(&jar, &tenant.gate)?;

    let projects = refreshed_projects(&state, tenant, views).await?;
    match find_project(&projects, &id) {
        Some(project) => Ok(Json(project.clone())),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, format!("Project not found: {}", id))),
    }
}

async fn get_stages(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.require_gate(&jar, &state.config.staff_gate)?;
    let generation = state.stages.begin();
    let result = dashboard::load_stages(&state.loader, &state.config).await;
    Ok(Json(state.stages.resolve(generation, result)?))
}

async fn get_tasks(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<impl IntoResponse, ApiError> {
    state.require_gate(&jar, &state.config.staff_gate)?;
    let generation = state.tasks.begin();
    let result = dashboard::load_tasks(&state.loader, &state.config).await;
    Ok(Json(state.tasks.resolve(generation, result)?))
}

fn reminder_kind(segment: &str) -> Result<ReminderKind, ApiError> {
    ReminderKind::from_segment(segment).ok_or_else(|| {
        ApiError::new(StatusCode::NOT_FOUND, format!("Unknown reminder list: {}", segment))
    })
}

async fn list_reminders(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    jar: CookieJar,
) -> Result<Json<Vec<ReminderItem>>, ApiError> {
    state.require_gate(&jar, &state.config.staff_gate)?;
    let store = ReminderStore::new(state.storage.as_ref(), reminder_kind(&kind)?);
    Ok(Json(newest_first(store.load())))
}

async fn add_reminder(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    jar: CookieJar,
    Json(payload): Json<NewReminder>,
) -> Result<(StatusCode, Json<ReminderItem>), ApiError> {
    state.require_gate(&jar, &state.config.staff_gate)?;
    if payload.description.trim().is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "Description cannot be empty"));
    }

    let store = ReminderStore::new(state.storage.as_ref(), reminder_kind(&kind)?);
    match store.add(&payload.description) {
        Ok(item) => Ok((StatusCode::CREATED, Json(item))),
        Err(e) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to save reminder: {}", e),
        )),
    }
}

async fn delete_reminder(
    State(state): State<Arc<AppState>>,
    Path((kind, id)): Path<(String, String)>,
    jar: CookieJar,
) -> Result<StatusCode, ApiError> {
    state.require_gate(&jar, &state.config.staff_gate)?;
    let store = ReminderStore::new(state.storage.as_ref(), reminder_kind(&kind)?);
    match store.remove(&id) {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(ApiError::new(StatusCode::NOT_FOUND, format!("Reminder not found: {}", id))),
        Err(e) => Err(ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to save reminders: {}", e),
        )),
    }
}
