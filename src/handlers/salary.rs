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
    models::{CreateSalaryRecord, SalaryRecord, UpdateSalaryRecord},
    state::AppState,
    store::{page_size, SalaryFilter},
};

pub async fn create_salary_record(
    State(state): State<AppState>,
    Json(input): Json<CreateSalaryRecord>,
) -> Result<(StatusCode, Json<SalaryRecord>), AppError> {
    input.validate()?;
    let record = state.store.create_salary_record(input).await?;
    info!(
        "Created salary record {} for guard {} ({}/{}), uniform deduction {}",
        record.id, record.guard_id, record.month, record.year, record.uniform_deduction
    );
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_salary_records(
    State(state): State<AppState>,
    Query(mut filter): Query<SalaryFilter>,
) -> Result<Json<Vec<SalaryRecord>>, AppError> {
    filter.limit = Some(page_size(filter.limit));
    Ok(Json(state.store.list_salary_records(&filter).await?))
}

pub async fn get_salary_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<SalaryRecord>, AppError> {
    Ok(Json(state.store.get_salary_record(id).await?))
}

pub async fn update_salary_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateSalaryRecord>,
) -> Result<Json<SalaryRecord>, AppError> {
    update.validate()?;
    let record = state.store.update_salary_record(id, update).await?;
    info!("Updated salary record {}", id);
    Ok(Json(record))
}

pub async fn delete_salary_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.store.delete_salary_record(id).await?;
    info!("Deleted salary record {}", id);
    Ok(Json(json!({ "message": "Salary record deleted successfully" })))
}
