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
    models::{InventoryChange, InventoryRecord, IssueInventory, MarkInventoryLost, ReturnInventory, UpdateInventory},
    services::views::{self, GuardInventory},
    state::AppState,
    store::{page_size, InventoryFilter},
};

pub async fn issue_inventory(
    State(state): State<AppState>,
    Json(input): Json<IssueInventory>,
) -> Result<(StatusCode, Json<InventoryRecord>), AppError> {
    input.validate()?;
    let record = state.store.issue_inventory(input).await?;
    info!("Issued {} x{} to guard {}", record.item_name, record.quantity, record.guard_id);
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn list_inventory(
    State(state): State<AppState>,
    Query(mut filter): Query<InventoryFilter>,
) -> Result<Json<Vec<InventoryRecord>>, AppError> {
    filter.limit = Some(page_size(filter.limit));
    Ok(Json(state.store.list_inventory(&filter).await?))
}

pub async fn get_inventory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<InventoryRecord>, AppError> {
    Ok(Json(state.store.get_inventory(id).await?))
}

pub async fn update_inventory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateInventory>,
) -> Result<Json<InventoryRecord>, AppError> {
    let record = state.store.change_inventory(id, InventoryChange::Update(update)).await?;
    info!("Updated inventory record {}", id);
    Ok(Json(record))
}

pub async fn return_inventory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<ReturnInventory>>,
) -> Result<Json<InventoryRecord>, AppError> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let record = state.store.change_inventory(id, InventoryChange::Return(input)).await?;
    info!("Inventory record {} returned", id);
    Ok(Json(record))
}

pub async fn mark_inventory_lost(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    body: Option<Json<MarkInventoryLost>>,
) -> Result<Json<InventoryRecord>, AppError> {
    let input = body.map(|Json(input)| input).unwrap_or_default();
    let record = state.store.change_inventory(id, InventoryChange::Lost(input)).await?;
    info!("Inventory record {} marked lost", id);
    Ok(Json(record))
}

pub async fn delete_inventory(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.store.delete_inventory(id).await?;
    info!("Deleted inventory record {}", id);
    Ok(Json(json!({ "message": "Inventory record deleted successfully" })))
}

pub async fn guard_inventory(
    State(state): State<AppState>,
    Path(guard_id): Path<i64>,
) -> Result<Json<GuardInventory>, AppError> {
    Ok(Json(views::guard_inventory(state.store.as_ref(), guard_id).await?))
}
