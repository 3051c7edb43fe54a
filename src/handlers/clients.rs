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
    models::{Client, CreateClient, UpdateClient},
    services::views::{self, ClientGuards},
    state::AppState,
    store::{page_size, ClientFilter},
};

pub async fn create_client(
    State(state): State<AppState>,
    Json(input): Json<CreateClient>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    input.validate()?;
    let client = state.store.create_client(input).await?;
    info!("Created client {} ({})", client.id, client.name);
    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Query(mut filter): Query<ClientFilter>,
) -> Result<Json<Vec<Client>>, AppError> {
    filter.limit = Some(page_size(filter.limit));
    Ok(Json(state.store.list_clients(&filter).await?))
}

pub async fn get_client(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Client>, AppError> {
    Ok(Json(state.store.get_client(id).await?))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<UpdateClient>,
) -> Result<Json<Client>, AppError> {
    update.validate()?;
    let client = state.store.update_client(id, update).await?;
    info!("Updated client {}", id);
    Ok(Json(client))
}

pub async fn delete_client(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Value>, AppError> {
    state.store.delete_client(id).await?;
    info!("Deleted client {}", id);
    Ok(Json(json!({ "message": "Client deleted successfully" })))
}

pub async fn client_guards(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ClientGuards>, AppError> {
    Ok(Json(views::client_guards(state.store.as_ref(), id).await?))
}
