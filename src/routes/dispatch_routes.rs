use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::controllers::dispatch_controller::DispatchController;
use crate::dto::dispatch_dto::{
    ActiveRoutesQuery, ActiveRoutesResponse, AddDropRequest, ApiResponse, CancelRouteRequest,
    CreateRouteRequest, DeliverDropRequest, DropMutationResponse, EarningsResponse,
    PendingJobsQuery, PendingJobsResponse, RemoveDropRequest, RouteDetailResponse,
    RouteSuggestionsResponse,
};
use crate::models::route::RouteResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_dispatch_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/pending-jobs", get(pending_jobs))
        .route("/route-suggestions", get(route_suggestions))
        .route("/routes", post(create_route))
        .route("/routes/active", get(active_routes))
        .route("/routes/:id", get(get_route))
        .route("/routes/:id/start", post(start_route))
        .route("/routes/:id/complete", post(complete_route))
        .route("/routes/:id/cancel", post(cancel_route))
        .route("/routes/:id/earnings", get(route_earnings))
        .route("/routes/:id/drops", post(add_drop))
        .route("/routes/:id/drops/:drop_id", delete(remove_drop))
        .route("/routes/:id/drops/:drop_id/deliver", post(deliver_drop))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "dispatch",
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

async fn pending_jobs(
    State(state): State<AppState>,
    Query(query): Query<PendingJobsQuery>,
) -> Result<Json<ApiResponse<PendingJobsResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.pending_jobs(query).await?;
    Ok(Json(response))
}

async fn route_suggestions(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RouteSuggestionsResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.route_suggestions().await?;
    Ok(Json(response))
}

async fn create_route(
    State(state): State<AppState>,
    Json(request): Json<CreateRouteRequest>,
) -> Result<Json<ApiResponse<RouteDetailResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.create_route(request).await?;
    Ok(Json(response))
}

async fn active_routes(
    State(state): State<AppState>,
    Query(query): Query<ActiveRoutesQuery>,
) -> Result<Json<ApiResponse<ActiveRoutesResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.active_routes(query).await?;
    Ok(Json(response))
}

async fn get_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RouteDetailResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.get_route(id).await?;
    Ok(Json(response))
}

async fn start_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RouteResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.start_route(id).await?;
    Ok(Json(response))
}

async fn complete_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<RouteResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.complete_route(id).await?;
    Ok(Json(response))
}

async fn cancel_route(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<CancelRouteRequest>,
) -> Result<Json<ApiResponse<RouteResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.cancel_route(id, request).await?;
    Ok(Json(response))
}

async fn route_earnings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<EarningsResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.route_earnings(id).await?;
    Ok(Json(response))
}

async fn add_drop(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AddDropRequest>,
) -> Result<Json<ApiResponse<DropMutationResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.add_drop(id, request).await?;
    Ok(Json(response))
}

async fn remove_drop(
    State(state): State<AppState>,
    Path((id, drop_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<RemoveDropRequest>,
) -> Result<Json<ApiResponse<DropMutationResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.remove_drop(id, drop_id, request).await?;
    Ok(Json(response))
}

async fn deliver_drop(
    State(state): State<AppState>,
    Path((id, drop_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<DeliverDropRequest>,
) -> Result<Json<ApiResponse<DropMutationResponse>>, AppError> {
    let controller = DispatchController::new(&state);
    let response = controller.deliver_drop(id, drop_id, request).await?;
    Ok(Json(response))
}
