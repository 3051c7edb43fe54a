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
    models::{CreateGuard, Guard, UpdateGuard},
    state::AppState,
    store::{page_size, GuardFilter},
};

pub async fn create_guard(
    State(state): State<AppState>,
    Json(input): Json<CreateGuard>,
) -> Result<(StatusCode, Json<Guard>), AppError> {
    input.validate()?;
    let guard = state.store.create_guard(input).await?;
    info!("Created guard {} ({})", guard.id, guard.contact_number);
    Ok((StatusCode::CREATED, Json(guard)))
}

pub async fn list_guards(
    State(state): State<AppState>,
    Query(mut filter): Query<GuardFilter>,
) -> Result<Json<Vec<Guard>>, AppError> {
    filter.limit = Some(page_size(filter.limit));
    Ok(Json(state.store.list_guards(&filter).await?))
}

pub async fn get_guard(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Guard>, AppError> {
    Ok(Json(state.store.get_guard(id).await?))
}

pub async fn get_guard_by_contact(
    State(state): State<AppState>,
    Path(contact_number): Path<String>,
) -> Result<Json<Guard>, AppError> {
    Ok(Json(state.store.get_guard_by_contact(&contact_number).await?))
}

pub async fn update_guard(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateGuard>,
) -> Result<Json<Guard>, AppError> {
    update.validate()?;
    let guard = state.store.update_guard(id, update).await?;
    info!("Updated guard {}", id);
    Ok(Json(guard))
}

pub async fn delete_guard(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, AppError> {
    state.store.delete_guard(id).await?;
    info!("Deleted guard {}", id);
    Ok(Json(json!({ "message": "Guard deleted successfully" })))
}
