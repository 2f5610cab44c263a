//! Servicio de despacho
//!
//! Orquesta las operaciones de ciclo de vida sobre rutas y drops: carga el
//! estado con bloqueo, pide el plan al núcleo puro, aplica las mutaciones
//! dentro de una transacción y publica el evento correspondiente después
//! del commit. Las notificaciones nunca afectan el resultado de la
//! operación.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::environment::EnvironmentConfig;
use crate::engine::clustering::{cluster_jobs, clustering_radius_miles, ClusterableJob, JobCluster};
use crate::engine::earnings::{audit_stored_total, compute_earnings, RouteEarnings, TotalRepair};
use crate::engine::lifecycle;
use crate::engine::pending::{aggregate_pending, PendingAggregation, PendingFilter};
use crate::engine::progress::{active_route_stats, route_progress, ActiveRouteStats, RouteProgress};
use crate::models::drop::RouteDrop;
use crate::models::job::{Job, JobStatus};
use crate::models::money::Money;
use crate::models::route::{Route, RouteStatus};
use crate::repositories::driver_repository::DriverRepository;
use crate::repositories::drop_repository::{DropRepository, NewDrop};
use crate::repositories::job_repository::JobRepository;
use crate::repositories::route_repository::{NewRoute, RouteRepository};
use crate::services::notification_service::{DispatchEvent, Notifier};
use crate::utils::errors::{
    bad_request_error, not_found_error, validation_error, AppError, AppResult,
};
use crate::utils::geo::GeoPoint;

/// Especificación de un drop en la creación de ruta o en el alta manual
#[derive(Debug, Clone)]
pub struct DropSpec {
    pub job_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub delivery_address: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub quoted_price: Decimal,
    pub special_instructions: Option<String>,
}

/// Parámetros de creación de ruta: un cluster de jobs o una lista manual
#[derive(Debug, Clone)]
pub struct CreateRoute {
    pub driver_id: Uuid,
    pub job_ids: Vec<Uuid>,
    pub drops: Vec<DropSpec>,
}

/// Resultado de un pase de clustering sobre el pool actual
#[derive(Debug)]
pub struct ClusterRun {
    pub clusters: Vec<JobCluster>,
    pub pool_size: usize,
    pub eligible: usize,
    pub radius_miles: f64,
}

/// Ruta con sus drops
#[derive(Debug)]
pub struct RouteWithDrops {
    pub route: Route,
    pub drops: Vec<RouteDrop>,
}

/// Detalle completo de una ruta
#[derive(Debug)]
pub struct RouteDetails {
    pub route: Route,
    pub drops: Vec<RouteDrop>,
    pub progress: RouteProgress,
}

/// Resultado de una mutación sobre un drop
#[derive(Debug)]
pub struct DropMutation {
    pub route: Route,
    pub drop: RouteDrop,
}

/// Panel de rutas activas
#[derive(Debug)]
pub struct ActiveRoutesView {
    pub routes: Vec<RouteDetails>,
    pub stats: ActiveRouteStats,
}

pub struct DispatchService {
    pool: PgPool,
    routes: RouteRepository,
    drops: DropRepository,
    jobs: JobRepository,
    drivers: DriverRepository,
    notifier: Arc<dyn Notifier>,
    config: EnvironmentConfig,
}

impl DispatchService {
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>, config: EnvironmentConfig) -> Self {
        Self {
            routes: RouteRepository::new(pool.clone()),
            drops: DropRepository::new(pool.clone()),
            jobs: JobRepository::new(pool.clone()),
            drivers: DriverRepository::new(pool.clone()),
            pool,
            notifier,
            config,
        }
    }

    /// Pool pendiente filtrado con sus estadísticas
    pub async fn pending_jobs(&self, filter: &PendingFilter) -> AppResult<PendingAggregation> {
        let pool_jobs = self.jobs.find_pending().await?;
        Ok(aggregate_pending(
            pool_jobs,
            filter,
            self.config.multi_drop_savings_rate,
        ))
    }

    /// Ejecuta el clustering sobre el pool actual sin materializar nada
    pub async fn route_suggestions(&self) -> AppResult<ClusterRun> {
        let pending = self.jobs.find_pending().await?;

        let eligible: Vec<ClusterableJob> = pending
            .iter()
            .filter_map(|job| {
                job.pickup_point().map(|pickup| ClusterableJob {
                    id: job.id,
                    pickup,
                })
            })
            .collect();

        log::info!(
            "🧭 Clustering sobre {} jobs elegibles de {} pendientes",
            eligible.len(),
            pending.len()
        );

        let radius_miles = clustering_radius_miles(eligible.len());
        let clusters = cluster_jobs(&eligible);

        Ok(ClusterRun {
            clusters,
            pool_size: pending.len(),
            eligible: eligible.len(),
            radius_miles,
        })
    }

    /// Crea una ruta asignada a un conductor desde un cluster de jobs o
    /// desde una lista manual de drops
    pub async fn create_route(&self, request: CreateRoute) -> AppResult<RouteWithDrops> {
        if request.job_ids.is_empty() && request.drops.is_empty() {
            return Err(bad_request_error("route requires job_ids or drops"));
        }
        if !request.job_ids.is_empty() && !request.drops.is_empty() {
            return Err(bad_request_error("provide either job_ids or drops, not both"));
        }

        if !self.drivers.exists(request.driver_id).await? {
            return Err(not_found_error("Driver", &request.driver_id.to_string()));
        }

        for spec in &request.drops {
            self.validate_drop_spec(spec)?;
        }

        let mut tx = self.pool.begin().await?;

        let (specs, routed_jobs, distance) = if request.job_ids.is_empty() {
            (request.drops.clone(), Vec::new(), None)
        } else {
            let mut unique_ids = request.job_ids.clone();
            unique_ids.sort();
            unique_ids.dedup();

            let jobs = self
                .jobs
                .find_by_ids_for_update_tx(&mut tx, &unique_ids)
                .await?;

            if jobs.len() != unique_ids.len() {
                let found: Vec<Uuid> = jobs.iter().map(|j| j.id).collect();
                let missing = unique_ids
                    .iter()
                    .find(|id| !found.contains(id))
                    .copied()
                    .unwrap_or(unique_ids[0]);
                return Err(not_found_error("Job", &missing.to_string()));
            }

            for job in &jobs {
                if job.status != JobStatus::Confirmed || job.route_id.is_some() {
                    return Err(AppError::Conflict(format!(
                        "job {} is not available for routing",
                        job.id
                    )));
                }
            }

            let distance = chained_pickup_distance(&jobs);
            let specs = self.specs_from_jobs(&jobs);
            (specs, jobs, distance)
        };

        let created = self
            .routes
            .create_tx(
                &mut tx,
                &NewRoute {
                    driver_id: request.driver_id,
                    total_drops: specs.len() as i32,
                    total_distance_miles: distance,
                },
            )
            .await?;

        // La ruta nace planned y se asigna en el acto: el conductor es
        // obligatorio desde la creación
        lifecycle::ensure_route_transition(&created, RouteStatus::Assigned)?;
        let route = self
            .routes
            .update_status_tx(&mut tx, created.id, RouteStatus::Assigned, None, None)
            .await?;

        let mut drops = Vec::with_capacity(specs.len());
        for (index, spec) in specs.iter().enumerate() {
            let drop = self
                .drops
                .create_tx(
                    &mut tx,
                    &NewDrop {
                        route_id: route.id,
                        job_id: spec.job_id,
                        customer_id: spec.customer_id,
                        pickup_address: spec.pickup_address.clone(),
                        delivery_address: spec.delivery_address.clone(),
                        window_start: spec.window_start,
                        window_end: spec.window_end,
                        quoted_price: spec.quoted_price,
                        special_instructions: spec.special_instructions.clone(),
                        position: (index + 1) as i32,
                    },
                )
                .await?;
            drops.push(drop);
        }

        if !routed_jobs.is_empty() {
            let job_ids: Vec<Uuid> = routed_jobs.iter().map(|j| j.id).collect();
            self.jobs
                .mark_routed_tx(&mut tx, &job_ids, route.id, request.driver_id)
                .await?;
        }

        tx.commit().await?;

        log::info!(
            "🚚 Ruta {} creada y asignada a {} con {} drops",
            route.id,
            request.driver_id,
            drops.len()
        );

        self.notifier
            .notify(&DispatchEvent::route_assigned(
                route.id,
                request.driver_id,
                &format!("route assigned with {} drops", drops.len()),
            ))
            .await;

        Ok(RouteWithDrops { route, drops })
    }

    /// Cancela una ruta: la cierra, libera sus jobs y regresa a pending
    /// todos los drops no entregados
    pub async fn cancel_route(&self, route_id: Uuid, reason: &str) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let route = self
            .routes
            .find_by_id_for_update_tx(&mut tx, route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        let jobs = self.jobs.find_by_route_for_update_tx(&mut tx, route_id).await?;
        let drops = self
            .drops
            .find_by_route_for_update_tx(&mut tx, route_id)
            .await?;

        let plan = lifecycle::plan_cancellation(&route, &jobs, &drops, reason, Utc::now())?;

        self.drops
            .reset_to_pending_tx(&mut tx, &plan.reset_drop_ids)
            .await?;
        self.jobs.release_from_route_tx(&mut tx, route_id).await?;

        let notes = lifecycle::append_admin_note(route.admin_notes.as_deref(), &plan.admin_note);
        let closed = self
            .routes
            .close_cancelled_tx(&mut tx, route_id, plan.ended_at, &notes)
            .await?;

        tx.commit().await?;

        log::info!(
            "🛑 Ruta {} cancelada: {} jobs liberados, {} drops a pending, {} entregados intactos",
            route_id,
            plan.released_job_ids.len(),
            plan.reset_drop_ids.len(),
            plan.preserved_drop_ids.len()
        );

        self.notifier
            .notify(&DispatchEvent::route_cancelled(
                route_id,
                route.driver_id,
                reason,
            ))
            .await;

        Ok(closed)
    }

    /// Alta administrativa de un drop en una ruta viva
    pub async fn add_drop(
        &self,
        route_id: Uuid,
        spec: DropSpec,
        reason: &str,
    ) -> AppResult<DropMutation> {
        self.validate_drop_spec(&spec)?;

        let mut tx = self.pool.begin().await?;

        let route = self
            .routes
            .find_by_id_for_update_tx(&mut tx, route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        lifecycle::ensure_route_mutable(&route)?;

        let attached = self
            .drops
            .find_by_route_for_update_tx(&mut tx, route_id)
            .await?;
        let next_position = attached.iter().map(|d| d.position).max().unwrap_or(0) + 1;

        let drop = self
            .drops
            .create_tx(
                &mut tx,
                &NewDrop {
                    route_id,
                    job_id: spec.job_id,
                    customer_id: spec.customer_id,
                    pickup_address: spec.pickup_address.clone(),
                    delivery_address: spec.delivery_address.clone(),
                    window_start: spec.window_start,
                    window_end: spec.window_end,
                    quoted_price: spec.quoted_price,
                    special_instructions: spec.special_instructions.clone(),
                    position: next_position,
                },
            )
            .await?;

        let note = lifecycle::stamped_note(
            Utc::now(),
            &format!("Drop {} added: {}", drop.id, reason),
        );
        let notes = lifecycle::append_admin_note(route.admin_notes.as_deref(), &note);
        let updated = self
            .routes
            .set_admin_modified_tx(&mut tx, route_id, &notes, attached.len() as i32 + 1)
            .await?;

        tx.commit().await?;

        log::info!("➕ Drop {} añadido a la ruta {} por administración", drop.id, route_id);

        self.notifier
            .notify(&DispatchEvent::drop_added(
                route_id,
                drop.id,
                updated.driver_id,
                reason,
            ))
            .await;

        Ok(DropMutation {
            route: updated,
            drop,
        })
    }

    /// Retiro administrativo de un drop: lo desliga y lo deja cancelado
    pub async fn remove_drop(
        &self,
        route_id: Uuid,
        drop_id: Uuid,
        reason: &str,
    ) -> AppResult<DropMutation> {
        let mut tx = self.pool.begin().await?;

        let route = self
            .routes
            .find_by_id_for_update_tx(&mut tx, route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        // La fila bloqueada decide: entregado y pertenencia se re-validan
        // sobre el estado que realmente se va a mutar
        let drop = self
            .drops
            .find_by_id_for_update_tx(&mut tx, drop_id)
            .await?
            .ok_or_else(|| not_found_error("Drop", &drop_id.to_string()))?;

        let attached = self
            .drops
            .find_by_route_for_update_tx(&mut tx, route_id)
            .await?;

        let plan = lifecycle::plan_drop_removal(
            &route,
            &drop,
            attached.len() as i32,
            reason,
            Utc::now(),
        )?;

        let removed = self.drops.detach_and_cancel_tx(&mut tx, drop_id).await?;

        if let Some(job_id) = removed.job_id {
            self.jobs.release_one_tx(&mut tx, job_id).await?;
        }

        let notes = lifecycle::append_admin_note(route.admin_notes.as_deref(), &plan.admin_note);
        let updated = self
            .routes
            .set_admin_modified_tx(&mut tx, route_id, &notes, plan.remaining_drops)
            .await?;

        tx.commit().await?;

        log::info!(
            "➖ Drop {} retirado de la ruta {} ({} drops restantes)",
            drop_id,
            route_id,
            plan.remaining_drops
        );

        self.notifier
            .notify(&DispatchEvent::drop_removed(
                route_id,
                drop_id,
                updated.driver_id,
                reason,
                plan.remaining_drops,
            ))
            .await;

        Ok(DropMutation {
            route: updated,
            drop: removed,
        })
    }

    /// Transición assigned -> in_progress con sellado de inicio
    pub async fn start_route(&self, route_id: Uuid) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let route = self
            .routes
            .find_by_id_for_update_tx(&mut tx, route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        lifecycle::ensure_route_transition(&route, RouteStatus::InProgress)?;

        let started = self
            .routes
            .update_status_tx(
                &mut tx,
                route_id,
                RouteStatus::InProgress,
                Some(Utc::now()),
                None,
            )
            .await?;

        tx.commit().await?;

        log::info!("▶️ Ruta {} iniciada", route_id);

        Ok(started)
    }

    /// Transición in_progress -> completed con liquidación de ganancias
    pub async fn complete_route(&self, route_id: Uuid) -> AppResult<Route> {
        let mut tx = self.pool.begin().await?;

        let route = self
            .routes
            .find_by_id_for_update_tx(&mut tx, route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        let drops = self
            .drops
            .find_by_route_for_update_tx(&mut tx, route_id)
            .await?;

        lifecycle::ensure_route_completable(&route, &drops)?;

        let completed = self
            .routes
            .update_status_tx(
                &mut tx,
                route_id,
                RouteStatus::Completed,
                None,
                Some(Utc::now()),
            )
            .await?;

        // Las ganancias se liquidan sobre la ruta ya sellada para que la
        // duración entre en las métricas derivadas
        let earnings = compute_earnings(&completed, &drops, self.config.earnings_ceiling);
        let settled = self
            .routes
            .settle_earnings_tx(&mut tx, route_id, earnings.total)
            .await?;

        self.jobs.complete_for_route_tx(&mut tx, route_id).await?;

        tx.commit().await?;

        log::info!(
            "🏁 Ruta {} completada con ganancias {}",
            route_id,
            earnings.total
        );

        Ok(settled)
    }

    /// Marca un drop como entregado y actualiza el contador de la ruta
    pub async fn deliver_drop(
        &self,
        route_id: Uuid,
        drop_id: Uuid,
        settled_amount: Option<Decimal>,
    ) -> AppResult<DropMutation> {
        if let Some(amount) = settled_amount {
            Money::new(amount, self.config.earnings_ceiling)?;
        }

        let mut tx = self.pool.begin().await?;

        let route = self
            .routes
            .find_by_id_for_update_tx(&mut tx, route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        let drop = self
            .drops
            .find_by_id_for_update_tx(&mut tx, drop_id)
            .await?
            .ok_or_else(|| not_found_error("Drop", &drop_id.to_string()))?;

        lifecycle::ensure_drop_deliverable(&route, &drop)?;

        let delivered = self
            .drops
            .mark_delivered_tx(&mut tx, drop_id, Utc::now(), settled_amount)
            .await?;
        let updated = self
            .routes
            .increment_completed_drops_tx(&mut tx, route_id)
            .await?;

        tx.commit().await?;

        log::info!("📦 Drop {} entregado en la ruta {}", drop_id, route_id);

        Ok(DropMutation {
            route: updated,
            drop: delivered,
        })
    }

    /// Detalle de una ruta con drops y progreso derivado
    pub async fn get_route(&self, route_id: Uuid) -> AppResult<RouteDetails> {
        let route = self
            .routes
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        let drops = self.drops.find_by_route(route_id).await?;
        let progress = route_progress(&drops);

        Ok(RouteDetails {
            route,
            drops,
            progress,
        })
    }

    /// Panel de rutas activas con progreso y estadísticas agregadas
    pub async fn active_routes(
        &self,
        status: Option<RouteStatus>,
        driver_id: Option<Uuid>,
    ) -> AppResult<ActiveRoutesView> {
        let routes = self.routes.find_active(status, driver_id).await?;

        let mut entries = Vec::with_capacity(routes.len());
        for route in routes {
            let drops = self.drops.find_by_route(route.id).await?;
            let progress = route_progress(&drops);
            entries.push(RouteDetails {
                route,
                drops,
                progress,
            });
        }

        let stats = active_route_stats(
            &entries
                .iter()
                .map(|e| e.progress.clone())
                .collect::<Vec<_>>(),
        );

        Ok(ActiveRoutesView {
            routes: entries,
            stats,
        })
    }

    /// Ganancias de una ruta, con reparación del agregado almacenado.
    ///
    /// Un total almacenado que no pasa la validación nunca se devuelve:
    /// se recomputa desde los drops y el valor recomputado lo reemplaza.
    pub async fn route_earnings(&self, route_id: Uuid) -> AppResult<RouteEarnings> {
        let route = self
            .routes
            .find_by_id(route_id)
            .await?
            .ok_or_else(|| not_found_error("Route", &route_id.to_string()))?;

        let drops = self.drops.find_by_route(route_id).await?;
        let earnings = compute_earnings(&route, &drops, self.config.earnings_ceiling);

        match audit_stored_total(
            route.total_earnings,
            earnings.total,
            self.config.earnings_ceiling,
        ) {
            TotalRepair::Keep => {}
            TotalRepair::RefreshStale => {
                self.routes
                    .update_total_earnings(route_id, earnings.total)
                    .await?;
                log::info!(
                    "♻️ Agregado de ganancias de la ruta {} refrescado: {} -> {}",
                    route_id,
                    route.total_earnings,
                    earnings.total
                );
            }
            TotalRepair::ReplaceCorrupt => {
                log::warn!(
                    "⚠️ Total de ganancias corrupto en la ruta {} ({}); reemplazado por {}",
                    route_id,
                    route.total_earnings,
                    earnings.total
                );
                self.routes
                    .update_total_earnings(route_id, earnings.total)
                    .await?;
            }
        }

        Ok(earnings)
    }

    /// Construye los drops de una ruta desde sus jobs, en orden de agenda
    fn specs_from_jobs(&self, jobs: &[Job]) -> Vec<DropSpec> {
        let window = Duration::hours(self.config.drop_window_hours);

        jobs.iter()
            .map(|job| DropSpec {
                job_id: Some(job.id),
                customer_id: job.customer_id,
                pickup_address: job.pickup_address.clone(),
                delivery_address: job.dropoff_address.clone(),
                window_start: job.scheduled_at,
                window_end: job.scheduled_at + window,
                quoted_price: Money::clamped(job.total_amount, self.config.earnings_ceiling)
                    .amount(),
                special_instructions: None,
            })
            .collect()
    }

    fn validate_drop_spec(&self, spec: &DropSpec) -> AppResult<()> {
        if spec.pickup_address.trim().is_empty() {
            return Err(validation_error("pickup_address", "must not be empty"));
        }
        if spec.delivery_address.trim().is_empty() {
            return Err(validation_error("delivery_address", "must not be empty"));
        }
        if spec.window_end <= spec.window_start {
            return Err(validation_error("window_end", "must be after window_start"));
        }
        Money::new(spec.quoted_price, self.config.earnings_ceiling)?;
        Ok(())
    }
}

/// Distancia encadenada entre las recogidas de los jobs, en su orden de
/// agenda; None si algún job no está geocodificado
fn chained_pickup_distance(jobs: &[Job]) -> Option<f64> {
    if jobs.is_empty() {
        return None;
    }

    let mut points: Vec<GeoPoint> = Vec::with_capacity(jobs.len());
    for job in jobs {
        points.push(job.pickup_point()?);
    }

    Some(
        points
            .windows(2)
            .map(|pair| pair[0].distance_miles(&pair[1]))
            .sum(),
    )
}
