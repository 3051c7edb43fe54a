use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    errors::AppError,
    models::{Client, DutyAssignment},
    services::search::{self, AssignmentSearch, ClientSearch, GuardSearch, GuardSearchHit},
    state::AppState,
};

pub async fn search_guards(
    State(state): State<AppState>,
    Query(query): Query<GuardSearch>,
) -> Result<Json<Vec<GuardSearchHit>>, AppError> {
    Ok(Json(search::search_guards(state.store.as_ref(), &query).await?))
}

pub async fn search_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientSearch>,
) -> Result<Json<Vec<Client>>, AppError> {
    Ok(Json(search::search_clients(state.store.as_ref(), &query).await?))
}

pub async fn search_assignments(
    State(state): State<AppState>,
    Query(query): Query<AssignmentSearch>,
) -> Result<Json<Vec<DutyAssignment>>, AppError> {
    Ok(Json(search::search_assignments(state.store.as_ref(), &query).await?))
}
