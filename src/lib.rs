pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_cookies::CookieManagerLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use state::AppState;

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    match origin.and_then(|o| o.parse::<HeaderValue>().ok()) {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(tower_http::cors::Any)
            .allow_headers(tower_http::cors::Any),
        None => CorsLayer::permissive(),
    }
}

pub fn create_router(state: AppState, cors_origin: Option<&str>) -> Router {
    let protected = Router::new()
        // Guards
        .route("/guards", post(handlers::guards::create_guard).get(handlers::guards::list_guards))
        .route(
            "/guards/:id",
            get(handlers::guards::get_guard)
                .put(handlers::guards::update_guard)
                .delete(handlers::guards::delete_guard),
        )
        .route(
            "/guards/by-contact/:contact_number",
            get(handlers::guards::get_guard_by_contact),
        )
        // Clients
        .route(
            "/clients",
            post(handlers::clients::create_client).get(handlers::clients::list_clients),
        )
        .route(
            "/clients/:id",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        )
        .route("/clients/:id/guards", get(handlers::clients::client_guards))
        // Duty assignments
        .route(
            "/duty-assignments",
            post(handlers::duty::assign_duty).get(handlers::duty::list_assignments),
        )
        .route("/duty-assignments/by-client", get(handlers::duty::assignments_by_client))
        .route(
            "/duty-assignments/:id",
            get(handlers::duty::get_assignment)
                .put(handlers::duty::update_assignment)
                .delete(handlers::duty::delete_assignment),
        )
        .route(
            "/duty-assignments/reassign/:guard_id",
            post(handlers::duty::reassign_guard),
        )
        // Salary records
        .route(
            "/salary-records",
            post(handlers::salary::create_salary_record).get(handlers::salary::list_salary_records),
        )
        .route(
            "/salary-records/:id",
            get(handlers::salary::get_salary_record)
                .put(handlers::salary::update_salary_record)
                .delete(handlers::salary::delete_salary_record),
        )
        // Inventory
        .route(
            "/inventory-records",
            post(handlers::inventory::issue_inventory).get(handlers::inventory::list_inventory),
        )
        .route(
            "/inventory-records/:id",
            get(handlers::inventory::get_inventory)
                .put(handlers::inventory::update_inventory)
                .delete(handlers::inventory::delete_inventory),
        )
        .route("/inventory-records/:id/return", post(handlers::inventory::return_inventory))
        .route("/inventory-records/:id/lost", post(handlers::inventory::mark_inventory_lost))
        .route(
            "/inventory-records/guard/:guard_id",
            get(handlers::inventory::guard_inventory),
        )
        // Reports
        .route("/stats/overview", get(handlers::reports::overview))
        .route("/reports/monthly-summary", get(handlers::reports::monthly_summary))
        .route("/reports/client-summary/:client_id", get(handlers::reports::client_summary))
        .route("/reports/guard-history/:guard_id", get(handlers::reports::guard_history))
        // Search
        .route("/search/guards", get(handlers::search::search_guards))
        .route("/search/clients", get(handlers::search::search_clients))
        .route("/search/assignments", get(handlers::search::search_assignments))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/logout", post(handlers::auth::logout))
        .merge(protected)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CookieManagerLayer::new())
                .layer(cors_layer(cors_origin))
                .layer(DefaultBodyLimit::max(2 * 1024 * 1024)),
        )
        .with_state(state)
}
