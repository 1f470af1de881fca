use axum::Json;
use axum::extract::{Extension, Query, State};
use chrono::{Datelike, NaiveDate};
use installdesk_core::{CalendarMonth, DashboardSummary, Identity, calendar_month};
use installdesk_runtime::Workspace;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::today;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    /// Reference date, defaults to the current UTC date.
    pub today: Option<NaiveDate>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardSummary>, ApiError> {
    let workspace = Workspace::new(state.store().clone(), identity)
        .with_upcoming_horizon(state.upcoming_horizon_days());
    workspace.refresh().await?;
    let summary = workspace.dashboard(query.today.unwrap_or_else(today)).await;
    Ok(Json(summary))
}

#[derive(Debug, Default, Deserialize)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Month grid; the current month when `year`/`month` are omitted.
pub async fn calendar(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<CalendarMonth>, ApiError> {
    let now = today();
    let year = query.year.unwrap_or(now.year());
    let month = query.month.unwrap_or(now.month());

    let orders = state.store().list_orders(&identity.scope()).await?;
    let grid = calendar_month(&orders, year, month)
        .ok_or_else(|| ApiError::BadRequest(format!("invalid month: {year}-{month}")))?;
    Ok(Json(grid))
}
