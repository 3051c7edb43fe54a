use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use log::info;
use serde_json::{json, Value};
use validator::Validate;

use crate::{
    errors::AppError,
    models::{CreateDutyAssignment, DutyAssignment, ReassignGuard, UpdateDutyAssignment},
    services::views::{self, ClientRoster},
    state::AppState,
    store::{page_size, AssignmentFilter},
};

pub async fn assign_duty(
    State(state): State<AppState>,
    Json(input): Json<CreateDutyAssignment>,
) -> Result<(StatusCode, Json<DutyAssignment>), AppError> {
    input.validate()?;
    let assignment = state.store.assign_duty(input).await?;
    info!(
        "Assigned guard {} to client {} (assignment {})",
        assignment.guard_id, assignment.client_id, assignment.id
    );
    Ok((StatusCode::CREATED, Json(assignment)))
}

pub async fn reassign_guard(
    State(state): State<AppState>,
    Path(guard_id): Path<i64>,
    Json(input): Json<ReassignGuard>,
) -> Result<Json<DutyAssignment>, AppError> {
    input.validate()?;
    let assignment = state.store.reassign_guard(guard_id, input).await?;
    info!("Reassigned guard {} to client {}", guard_id, assignment.client_id);
    Ok(Json(assignment))
}

pub async fn list_assignments(
    State(state): State<AppState>,
    Query(mut filter): Query<AssignmentFilter>,
) -> Result<Json<Vec<DutyAssignment>>, AppError> {
    filter.limit = Some(page_size(filter.limit));
    Ok(Json(state.store.list_assignments(&filter).await?))
}

pub async fn assignments_by_client(State(state): State<AppState>) -> Result<Json<Vec<ClientRoster>>, AppError> {
    Ok(Json(views::assignments_by_client(state.store.as_ref()).await?))
}

pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<DutyAssignment>, AppError> {
    Ok(Json(state.store.get_assignment(id).await?))
}

pub async fn update_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateDutyAssignment>,
) -> Result<Json<DutyAssignment>, AppError> {
    update.validate()?;
    let assignment = state.store.update_assignment(id, update).await?;
    info!("Updated duty assignment {}", id);
    Ok(Json(assignment))
}

pub async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.store.delete_assignment(id).await?;
    info!("Deleted duty assignment {}", id);
    Ok(Json(json!({ "message": "Duty assignment deleted successfully" })))
}
