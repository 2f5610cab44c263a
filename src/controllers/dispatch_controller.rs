use uuid::Uuid;
use validator::Validate;

use crate::dto::dispatch_dto::{
    ActiveRoutesQuery, ActiveRoutesResponse, AddDropRequest, ApiResponse, CancelRouteRequest,
    CreateRouteRequest, DeliverDropRequest, DropMutationResponse, EarningsResponse,
    PendingJobsQuery, PendingJobsResponse, RemoveDropRequest, RouteDetailResponse,
    RouteSuggestionsResponse,
};
use crate::engine::pending::PendingFilter;
use crate::models::job::JobResponse;
use crate::models::route::RouteResponse;
use crate::services::dispatch_service::DispatchService;
use crate::state::AppState;
use crate::utils::errors::AppError;

const DEFAULT_PAGE_SIZE: usize = 50;
const MAX_PAGE_SIZE: usize = 200;

pub struct DispatchController {
    service: DispatchService,
}

impl DispatchController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: DispatchService::new(
                state.pool.clone(),
                state.notifier.clone(),
                state.config.clone(),
            ),
        }
    }

    pub async fn pending_jobs(
        &self,
        query: PendingJobsQuery,
    ) -> Result<ApiResponse<PendingJobsResponse>, AppError> {
        let filter = PendingFilter {
            eligible_only: query.eligible_only,
            region: query.region,
            date: query.date,
        };

        let aggregation = self.service.pending_jobs(&filter).await?;

        // Las estadísticas cubren el conjunto filtrado completo; la
        // paginación solo recorta la lista devuelta
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
        let offset = query.offset.unwrap_or(0);

        let jobs = aggregation
            .jobs
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(JobResponse::from)
            .collect();

        Ok(ApiResponse::success(PendingJobsResponse {
            jobs,
            stats: aggregation.stats,
            limit,
            offset,
        }))
    }

    pub async fn route_suggestions(
        &self,
    ) -> Result<ApiResponse<RouteSuggestionsResponse>, AppError> {
        let run = self.service.route_suggestions().await?;
        Ok(ApiResponse::success(RouteSuggestionsResponse::from(run)))
    }

    pub async fn create_route(
        &self,
        request: CreateRouteRequest,
    ) -> Result<ApiResponse<RouteDetailResponse>, AppError> {
        request.validate()?;

        let created = self.service.create_route(request.into()).await?;

        Ok(ApiResponse::success_with_message(
            RouteDetailResponse::from(created),
            "Ruta creada y asignada exitosamente".to_string(),
        ))
    }

    pub async fn get_route(
        &self,
        route_id: Uuid,
    ) -> Result<ApiResponse<RouteDetailResponse>, AppError> {
        let details = self.service.get_route(route_id).await?;
        Ok(ApiResponse::success(RouteDetailResponse::from(details)))
    }

    pub async fn active_routes(
        &self,
        query: ActiveRoutesQuery,
    ) -> Result<ApiResponse<ActiveRoutesResponse>, AppError> {
        let view = self
            .service
            .active_routes(query.status, query.driver_id)
            .await?;

        Ok(ApiResponse::success(ActiveRoutesResponse {
            routes: view
                .routes
                .into_iter()
                .map(RouteDetailResponse::from)
                .collect(),
            stats: view.stats,
        }))
    }

    pub async fn start_route(
        &self,
        route_id: Uuid,
    ) -> Result<ApiResponse<RouteResponse>, AppError> {
        let route = self.service.start_route(route_id).await?;

        Ok(ApiResponse::success_with_message(
            RouteResponse::from(route),
            "Ruta iniciada exitosamente".to_string(),
        ))
    }

    pub async fn complete_route(
        &self,
        route_id: Uuid,
    ) -> Result<ApiResponse<RouteResponse>, AppError> {
        let route = self.service.complete_route(route_id).await?;

        Ok(ApiResponse::success_with_message(
            RouteResponse::from(route),
            "Ruta completada y liquidada exitosamente".to_string(),
        ))
    }

    pub async fn cancel_route(
        &self,
        route_id: Uuid,
        request: CancelRouteRequest,
    ) -> Result<ApiResponse<RouteResponse>, AppError> {
        request.validate()?;

        let route = self.service.cancel_route(route_id, &request.reason).await?;

        Ok(ApiResponse::success_with_message(
            RouteResponse::from(route),
            "Ruta cancelada exitosamente".to_string(),
        ))
    }

    pub async fn add_drop(
        &self,
        route_id: Uuid,
        request: AddDropRequest,
    ) -> Result<ApiResponse<DropMutationResponse>, AppError> {
        request.validate()?;

        let reason = request
            .reason
            .clone()
            .unwrap_or_else(|| "added by dispatcher".to_string());

        let mutation = self
            .service
            .add_drop(route_id, request.drop.into(), &reason)
            .await?;

        Ok(ApiResponse::success_with_message(
            DropMutationResponse::from(mutation),
            "Drop añadido exitosamente".to_string(),
        ))
    }

    pub async fn remove_drop(
        &self,
        route_id: Uuid,
        drop_id: Uuid,
        request: RemoveDropRequest,
    ) -> Result<ApiResponse<DropMutationResponse>, AppError> {
        request.validate()?;

        let mutation = self
            .service
            .remove_drop(route_id, drop_id, &request.reason)
            .await?;

        Ok(ApiResponse::success_with_message(
            DropMutationResponse::from(mutation),
            "Drop retirado exitosamente".to_string(),
        ))
    }

    pub async fn deliver_drop(
        &self,
        route_id: Uuid,
        drop_id: Uuid,
        request: DeliverDropRequest,
    ) -> Result<ApiResponse<DropMutationResponse>, AppError> {
        let mutation = self
            .service
            .deliver_drop(route_id, drop_id, request.settled_amount)
            .await?;

        Ok(ApiResponse::success_with_message(
            DropMutationResponse::from(mutation),
            "Drop entregado exitosamente".to_string(),
        ))
    }

    pub async fn route_earnings(
        &self,
        route_id: Uuid,
    ) -> Result<ApiResponse<EarningsResponse>, AppError> {
        let earnings = self.service.route_earnings(route_id).await?;

        Ok(ApiResponse::success(EarningsResponse {
            route_id,
            earnings,
        }))
    }
}
