use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;

use crate::{
    errors::AppError,
    services::reports::{self, ClientSummary, GuardHistory, MonthlyQuery, MonthlySummary, SystemOverview},
    state::AppState,
};

pub async fn overview(State(state): State<AppState>) -> Result<Json<SystemOverview>, AppError> {
    Ok(Json(reports::system_overview(state.store.as_ref(), Utc::now()).await?))
}

pub async fn monthly_summary(
    State(state): State<AppState>,
    Query(query): Query<MonthlyQuery>,
) -> Result<Json<MonthlySummary>, AppError> {
    Ok(Json(reports::monthly_summary(state.store.as_ref(), query).await?))
}

pub async fn client_summary(
    State(state): State<AppState>,
    Path(client_id): Path<i64>,
) -> Result<Json<ClientSummary>, AppError> {
    Ok(Json(
        reports::client_summary(state.store.as_ref(), client_id, Utc::now()).await?,
    ))
}

pub async fn guard_history(
    State(state): State<AppState>,
    Path(guard_id): Path<i64>,
) -> Result<Json<GuardHistory>, AppError> {
    Ok(Json(reports::guard_history(state.store.as_ref(), guard_id).await?))
}
