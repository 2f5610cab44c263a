use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::engine::clustering::JobCluster;
use crate::engine::earnings::RouteEarnings;
use crate::engine::pending::PendingStats;
use crate::engine::progress::{ActiveRouteStats, RouteProgress};
use crate::models::drop::DropResponse;
use crate::models::job::JobResponse;
use crate::models::route::{RouteResponse, RouteStatus};
use crate::services::dispatch_service::{
    ClusterRun, CreateRoute, DropMutation, DropSpec, RouteDetails, RouteWithDrops,
};

// Response genérica
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            message: Some(message),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: String) -> Self {
        Self {
            success: false,
            message: Some(message),
            data: None,
        }
    }
}

// Query del pool pendiente
#[derive(Debug, Deserialize)]
pub struct PendingJobsQuery {
    pub eligible_only: Option<bool>,
    pub region: Option<String>,
    pub date: Option<NaiveDate>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

// Response del pool pendiente con estadísticas agregadas
#[derive(Debug, Serialize)]
pub struct PendingJobsResponse {
    pub jobs: Vec<JobResponse>,
    pub stats: PendingStats,
    pub limit: usize,
    pub offset: usize,
}

// Response de sugerencias de clustering
#[derive(Debug, Serialize)]
pub struct RouteSuggestionsResponse {
    pub clusters: Vec<JobCluster>,
    pub pool_size: usize,
    pub eligible: usize,
    pub radius_miles: f64,
}

impl From<ClusterRun> for RouteSuggestionsResponse {
    fn from(run: ClusterRun) -> Self {
        Self {
            clusters: run.clusters,
            pool_size: run.pool_size,
            eligible: run.eligible,
            radius_miles: run.radius_miles,
        }
    }
}

// Drop declarado manualmente en una creación de ruta o alta posterior
#[derive(Debug, Deserialize, Validate)]
pub struct DropSpecRequest {
    pub job_id: Option<Uuid>,
    pub customer_id: Uuid,

    #[validate(length(min = 5, max = 500))]
    pub pickup_address: String,

    #[validate(length(min = 5, max = 500))]
    pub delivery_address: String,

    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,

    pub quoted_price: Decimal,

    #[validate(length(max = 1000))]
    pub special_instructions: Option<String>,
}

impl From<DropSpecRequest> for DropSpec {
    fn from(request: DropSpecRequest) -> Self {
        Self {
            job_id: request.job_id,
            customer_id: request.customer_id,
            pickup_address: request.pickup_address,
            delivery_address: request.delivery_address,
            window_start: request.window_start,
            window_end: request.window_end,
            quoted_price: request.quoted_price,
            special_instructions: request.special_instructions,
        }
    }
}

// Request para crear una ruta: cluster de jobs o lista manual de drops
#[derive(Debug, Deserialize, Validate)]
pub struct CreateRouteRequest {
    pub driver_id: Uuid,

    #[serde(default)]
    pub job_ids: Vec<Uuid>,

    #[serde(default)]
    #[validate]
    pub drops: Vec<DropSpecRequest>,
}

impl From<CreateRouteRequest> for CreateRoute {
    fn from(request: CreateRouteRequest) -> Self {
        Self {
            driver_id: request.driver_id,
            job_ids: request.job_ids,
            drops: request.drops.into_iter().map(DropSpec::from).collect(),
        }
    }
}

// Request para añadir un drop a una ruta viva
#[derive(Debug, Deserialize, Validate)]
pub struct AddDropRequest {
    #[validate]
    pub drop: DropSpecRequest,

    #[validate(length(max = 500))]
    pub reason: Option<String>,
}

// Request para retirar un drop; el motivo queda en la nota de auditoría
#[derive(Debug, Deserialize, Validate)]
pub struct RemoveDropRequest {
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

// Request para cancelar una ruta
#[derive(Debug, Deserialize, Validate)]
pub struct CancelRouteRequest {
    #[validate(length(min = 3, max = 500))]
    pub reason: String,
}

// Request para marcar un drop como entregado
#[derive(Debug, Deserialize)]
pub struct DeliverDropRequest {
    pub settled_amount: Option<Decimal>,
}

// Query del panel de rutas activas
#[derive(Debug, Deserialize)]
pub struct ActiveRoutesQuery {
    pub status: Option<RouteStatus>,
    pub driver_id: Option<Uuid>,
}

// Detalle de ruta con drops y progreso
#[derive(Debug, Serialize)]
pub struct RouteDetailResponse {
    pub route: RouteResponse,
    pub drops: Vec<DropResponse>,
    pub progress: RouteProgress,
}

impl From<RouteDetails> for RouteDetailResponse {
    fn from(details: RouteDetails) -> Self {
        Self {
            route: RouteResponse::from(details.route),
            drops: details.drops.into_iter().map(DropResponse::from).collect(),
            progress: details.progress,
        }
    }
}

impl From<RouteWithDrops> for RouteDetailResponse {
    fn from(created: RouteWithDrops) -> Self {
        let progress = crate::engine::progress::route_progress(&created.drops);
        Self {
            route: RouteResponse::from(created.route),
            drops: created.drops.into_iter().map(DropResponse::from).collect(),
            progress,
        }
    }
}

// Panel de rutas activas
#[derive(Debug, Serialize)]
pub struct ActiveRoutesResponse {
    pub routes: Vec<RouteDetailResponse>,
    pub stats: ActiveRouteStats,
}

// Resultado de una mutación sobre un drop
#[derive(Debug, Serialize)]
pub struct DropMutationResponse {
    pub route: RouteResponse,
    pub drop: DropResponse,
}

impl From<DropMutation> for DropMutationResponse {
    fn from(mutation: DropMutation) -> Self {
        Self {
            route: RouteResponse::from(mutation.route),
            drop: DropResponse::from(mutation.drop),
        }
    }
}

// Ganancias de una ruta
#[derive(Debug, Serialize)]
pub struct EarningsResponse {
    pub route_id: Uuid,
    pub earnings: RouteEarnings,
}
