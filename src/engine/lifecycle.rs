//! Guardas y planes de mutación del ciclo de vida
//!
//! Las reglas de transición de rutas y drops viven aquí como funciones
//! puras. Los servicios cargan el estado, piden un plan y aplican sus
//! mutaciones dentro de una única transacción; este módulo nunca toca
//! la base de datos.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::drop::{DropStatus, RouteDrop};
use crate::models::job::Job;
use crate::models::route::{Route, RouteStatus};
use crate::utils::errors::AppError;

/// Violaciones de las reglas de ciclo de vida
#[derive(Debug, Error, PartialEq)]
pub enum LifecycleViolation {
    #[error("route {route_id} is {status} and can no longer be modified")]
    RouteTerminal { route_id: Uuid, status: &'static str },

    #[error("drop {drop_id} has been delivered and is immutable")]
    DropDelivered { drop_id: Uuid },

    #[error("drop {drop_id} does not belong to route {route_id}")]
    NotOnRoute { drop_id: Uuid, route_id: Uuid },

    #[error("route {route_id} cannot transition from {from} to {to}")]
    InvalidTransition {
        route_id: Uuid,
        from: &'static str,
        to: &'static str,
    },

    #[error("drop {drop_id} is {status} and cannot be delivered")]
    DropNotOpen { drop_id: Uuid, status: &'static str },

    #[error("route {route_id} still has {open} undelivered drops")]
    OpenDrops { route_id: Uuid, open: usize },
}

impl From<LifecycleViolation> for AppError {
    fn from(violation: LifecycleViolation) -> Self {
        match violation {
            LifecycleViolation::RouteTerminal { .. } | LifecycleViolation::DropDelivered { .. } => {
                AppError::TerminalState(violation.to_string())
            }
            LifecycleViolation::NotOnRoute { .. } => {
                AppError::OwnershipMismatch(violation.to_string())
            }
            LifecycleViolation::InvalidTransition { .. }
            | LifecycleViolation::DropNotOpen { .. }
            | LifecycleViolation::OpenDrops { .. } => AppError::Conflict(violation.to_string()),
        }
    }
}

/// Verifica que la ruta todavía admite mutaciones
pub fn ensure_route_mutable(route: &Route) -> Result<(), LifecycleViolation> {
    if route.status.is_terminal() {
        return Err(LifecycleViolation::RouteTerminal {
            route_id: route.id,
            status: route.status.as_str(),
        });
    }
    Ok(())
}

/// Verifica una transición de estado de la ruta
///
/// Transiciones válidas: planned -> assigned -> in_progress -> completed,
/// más closed desde cualquier estado no terminal (cancelación).
pub fn ensure_route_transition(
    route: &Route,
    to: RouteStatus,
) -> Result<(), LifecycleViolation> {
    let valid = matches!(
        (&route.status, &to),
        (RouteStatus::Planned, RouteStatus::Assigned)
            | (RouteStatus::Assigned, RouteStatus::InProgress)
            | (RouteStatus::InProgress, RouteStatus::Completed)
    ) || (!route.status.is_terminal() && to == RouteStatus::Closed);

    if !valid {
        return Err(LifecycleViolation::InvalidTransition {
            route_id: route.id,
            from: route.status.as_str(),
            to: to.as_str(),
        });
    }
    Ok(())
}

/// Verifica que el drop pertenece a la ruta
pub fn ensure_drop_on_route(route: &Route, drop: &RouteDrop) -> Result<(), LifecycleViolation> {
    if drop.route_id != Some(route.id) {
        return Err(LifecycleViolation::NotOnRoute {
            drop_id: drop.id,
            route_id: route.id,
        });
    }
    Ok(())
}

/// Verifica que el drop puede marcarse como entregado
pub fn ensure_drop_deliverable(route: &Route, drop: &RouteDrop) -> Result<(), LifecycleViolation> {
    ensure_route_mutable(route)?;
    ensure_drop_on_route(route, drop)?;

    match drop.status {
        DropStatus::Pending | DropStatus::Booked => Ok(()),
        DropStatus::Delivered => Err(LifecycleViolation::DropDelivered { drop_id: drop.id }),
        DropStatus::Cancelled => Err(LifecycleViolation::DropNotOpen {
            drop_id: drop.id,
            status: drop.status.as_str(),
        }),
    }
}

/// Verifica que la ruta puede completarse: ningún drop sigue abierto
pub fn ensure_route_completable(
    route: &Route,
    drops: &[RouteDrop],
) -> Result<(), LifecycleViolation> {
    ensure_route_transition(route, RouteStatus::Completed)?;

    let open = drops
        .iter()
        .filter(|d| matches!(d.status, DropStatus::Pending | DropStatus::Booked))
        .count();

    if open > 0 {
        return Err(LifecycleViolation::OpenDrops {
            route_id: route.id,
            open,
        });
    }
    Ok(())
}

/// Nota administrativa con timestamp
pub fn stamped_note(now: DateTime<Utc>, text: &str) -> String {
    format!("[{}] {}", now.to_rfc3339(), text)
}

/// Concatena una nota administrativa al historial existente
pub fn append_admin_note(existing: Option<&str>, note: &str) -> String {
    match existing {
        Some(previous) if !previous.trim().is_empty() => format!("{}\n{}", previous, note),
        _ => note.to_string(),
    }
}

/// Mutaciones a aplicar al cancelar una ruta
///
/// El plan se calcula en memoria y el servicio de despacho lo aplica en
/// una única transacción: o se persiste completo o no se persiste nada.
#[derive(Debug, Clone, PartialEq)]
pub struct CancellationPlan {
    pub route_id: Uuid,
    pub ended_at: DateTime<Utc>,
    pub released_job_ids: Vec<Uuid>,
    pub reset_drop_ids: Vec<Uuid>,
    pub preserved_drop_ids: Vec<Uuid>,
    pub admin_note: String,
}

/// Calcula el plan de cancelación de una ruta.
///
/// Todo job que referencia la ruta vuelve al pool (route_id NULL, estado
/// confirmed). Todo drop no entregado se desliga y vuelve a pending. Los
/// drops entregados quedan intactos: la entrega es inmutable y prevalece
/// sobre el reseteo de la cancelación.
pub fn plan_cancellation(
    route: &Route,
    jobs: &[Job],
    drops: &[RouteDrop],
    reason: &str,
    now: DateTime<Utc>,
) -> Result<CancellationPlan, LifecycleViolation> {
    ensure_route_mutable(route)?;

    let released_job_ids = jobs
        .iter()
        .filter(|job| job.route_id == Some(route.id))
        .map(|job| job.id)
        .collect();

    let mut reset_drop_ids = Vec::new();
    let mut preserved_drop_ids = Vec::new();
    for drop in drops.iter().filter(|d| d.route_id == Some(route.id)) {
        if drop.is_delivered() {
            preserved_drop_ids.push(drop.id);
        } else {
            reset_drop_ids.push(drop.id);
        }
    }

    Ok(CancellationPlan {
        route_id: route.id,
        ended_at: now,
        released_job_ids,
        reset_drop_ids,
        preserved_drop_ids,
        admin_note: stamped_note(now, &format!("Route cancelled: {}", reason)),
    })
}

/// Mutaciones a aplicar al retirar un drop de una ruta
#[derive(Debug, Clone, PartialEq)]
pub struct RemovalPlan {
    pub route_id: Uuid,
    pub drop_id: Uuid,
    pub remaining_drops: i32,
    pub admin_note: String,
}

/// Calcula el plan de retiro de un drop.
///
/// `attached_count` es el número de drops ligados a la ruta antes del
/// retiro; el plan reporta cuántos quedan para el evento drop-removed.
pub fn plan_drop_removal(
    route: &Route,
    drop: &RouteDrop,
    attached_count: i32,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<RemovalPlan, LifecycleViolation> {
    ensure_route_mutable(route)?;
    ensure_drop_on_route(route, drop)?;

    if drop.is_delivered() {
        return Err(LifecycleViolation::DropDelivered { drop_id: drop.id });
    }

    Ok(RemovalPlan {
        route_id: route.id,
        drop_id: drop.id,
        remaining_drops: (attached_count - 1).max(0),
        admin_note: stamped_note(now, &format!("Drop {} removed: {}", drop.id, reason)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;
    use rust_decimal::Decimal;

    fn route_with_status(status: RouteStatus) -> Route {
        let now = Utc::now();
        Route {
            id: Uuid::from_u128(100),
            driver_id: Some(Uuid::from_u128(7)),
            status,
            started_at: None,
            ended_at: None,
            total_drops: 3,
            completed_drops: 0,
            total_earnings: Decimal::ZERO,
            performance_multiplier: Decimal::ONE,
            bonus_total: Decimal::ZERO,
            penalty_total: Decimal::ZERO,
            total_distance_miles: Some(42.0),
            admin_override: false,
            admin_notes: None,
            admin_price_adjustment: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn drop_on_route(n: u128, route_id: Option<Uuid>, status: DropStatus) -> RouteDrop {
        let now = Utc::now();
        RouteDrop {
            id: Uuid::from_u128(n),
            route_id,
            job_id: Some(Uuid::from_u128(n + 1000)),
            customer_id: Uuid::from_u128(n + 2000),
            pickup_address: "Depot, Bristol".to_string(),
            delivery_address: "14 Harbour Way, Cardiff".to_string(),
            window_start: now,
            window_end: now + chrono::Duration::hours(4),
            status,
            quoted_price: Decimal::from(90),
            settled_amount: None,
            special_instructions: None,
            position: n as i32,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn job_on_route(n: u128, route_id: Option<Uuid>) -> Job {
        let now = Utc::now();
        Job {
            id: Uuid::from_u128(n),
            customer_id: Uuid::from_u128(n + 500),
            status: if route_id.is_some() {
                JobStatus::Routed
            } else {
                JobStatus::Confirmed
            },
            route_id,
            driver_id: None,
            pickup_address: "3 Mill Road, Leeds".to_string(),
            pickup_postcode: "LS1 4AB".to_string(),
            pickup_lat: Some(53.8),
            pickup_lng: Some(-1.55),
            dropoff_address: "9 Kirkgate, York".to_string(),
            dropoff_postcode: "YO1 8BN".to_string(),
            dropoff_lat: Some(53.96),
            dropoff_lng: Some(-1.08),
            total_amount: Decimal::from(250),
            scheduled_at: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_terminal_route_refuses_any_mutation() {
        for status in [RouteStatus::Completed, RouteStatus::Closed] {
            let route = route_with_status(status);
            let result = ensure_route_mutable(&route);
            assert!(matches!(
                result,
                Err(LifecycleViolation::RouteTerminal { .. })
            ));
        }
    }

    #[test]
    fn test_valid_route_transitions() {
        let planned = route_with_status(RouteStatus::Planned);
        assert!(ensure_route_transition(&planned, RouteStatus::Assigned).is_ok());

        let assigned = route_with_status(RouteStatus::Assigned);
        assert!(ensure_route_transition(&assigned, RouteStatus::InProgress).is_ok());

        let in_progress = route_with_status(RouteStatus::InProgress);
        assert!(ensure_route_transition(&in_progress, RouteStatus::Completed).is_ok());

        // closed es alcanzable desde cualquier estado no terminal
        for status in [
            RouteStatus::Planned,
            RouteStatus::Assigned,
            RouteStatus::InProgress,
        ] {
            let route = route_with_status(status);
            assert!(ensure_route_transition(&route, RouteStatus::Closed).is_ok());
        }
    }

    #[test]
    fn test_invalid_route_transitions() {
        let planned = route_with_status(RouteStatus::Planned);
        assert!(ensure_route_transition(&planned, RouteStatus::InProgress).is_err());
        assert!(ensure_route_transition(&planned, RouteStatus::Completed).is_err());

        let completed = route_with_status(RouteStatus::Completed);
        assert!(ensure_route_transition(&completed, RouteStatus::Closed).is_err());

        let closed = route_with_status(RouteStatus::Closed);
        assert!(ensure_route_transition(&closed, RouteStatus::Assigned).is_err());
    }

    #[test]
    fn test_drop_ownership_is_enforced() {
        let route = route_with_status(RouteStatus::Assigned);
        let foreign = drop_on_route(1, Some(Uuid::from_u128(999)), DropStatus::Booked);

        let result = ensure_drop_on_route(&route, &foreign);
        assert!(matches!(result, Err(LifecycleViolation::NotOnRoute { .. })));
    }

    #[test]
    fn test_delivered_drop_cannot_be_removed() {
        let route = route_with_status(RouteStatus::InProgress);
        let delivered = drop_on_route(1, Some(route.id), DropStatus::Delivered);

        let result = plan_drop_removal(&route, &delivered, 3, "admin request", Utc::now());
        assert!(matches!(
            result,
            Err(LifecycleViolation::DropDelivered { .. })
        ));
    }

    #[test]
    fn test_removal_plan_reports_remaining_drops() {
        let route = route_with_status(RouteStatus::Assigned);
        let drop = drop_on_route(1, Some(route.id), DropStatus::Booked);

        let plan = plan_drop_removal(&route, &drop, 4, "customer cancelled", Utc::now()).unwrap();

        assert_eq!(plan.remaining_drops, 3);
        assert_eq!(plan.drop_id, drop.id);
        assert!(plan.admin_note.contains("customer cancelled"));
    }

    #[test]
    fn test_removal_refused_on_terminal_route() {
        let route = route_with_status(RouteStatus::Completed);
        let drop = drop_on_route(1, Some(route.id), DropStatus::Booked);

        let result = plan_drop_removal(&route, &drop, 3, "too late", Utc::now());
        assert!(matches!(
            result,
            Err(LifecycleViolation::RouteTerminal { .. })
        ));
    }

    #[test]
    fn test_cancellation_releases_jobs_and_resets_open_drops() {
        let route = route_with_status(RouteStatus::InProgress);
        let jobs = vec![
            job_on_route(1, Some(route.id)),
            job_on_route(2, Some(route.id)),
            job_on_route(3, None),
        ];
        let drops = vec![
            drop_on_route(10, Some(route.id), DropStatus::Pending),
            drop_on_route(11, Some(route.id), DropStatus::Booked),
            drop_on_route(12, Some(route.id), DropStatus::Delivered),
            drop_on_route(13, None, DropStatus::Cancelled),
        ];

        let plan =
            plan_cancellation(&route, &jobs, &drops, "driver unavailable", Utc::now()).unwrap();

        assert_eq!(
            plan.released_job_ids,
            vec![Uuid::from_u128(1), Uuid::from_u128(2)]
        );
        assert_eq!(
            plan.reset_drop_ids,
            vec![Uuid::from_u128(10), Uuid::from_u128(11)]
        );
        assert_eq!(plan.preserved_drop_ids, vec![Uuid::from_u128(12)]);
        assert!(plan.admin_note.contains("driver unavailable"));
    }

    #[test]
    fn test_cancellation_refused_on_terminal_route() {
        for status in [RouteStatus::Completed, RouteStatus::Closed] {
            let route = route_with_status(status);
            let result = plan_cancellation(&route, &[], &[], "no-op", Utc::now());
            assert!(matches!(
                result,
                Err(LifecycleViolation::RouteTerminal { .. })
            ));
        }
    }

    #[test]
    fn test_completion_refused_with_open_drops() {
        let route = route_with_status(RouteStatus::InProgress);
        let drops = vec![
            drop_on_route(1, Some(route.id), DropStatus::Delivered),
            drop_on_route(2, Some(route.id), DropStatus::Booked),
        ];

        let result = ensure_route_completable(&route, &drops);
        assert_eq!(
            result,
            Err(LifecycleViolation::OpenDrops {
                route_id: route.id,
                open: 1
            })
        );
    }

    #[test]
    fn test_completion_allowed_when_all_drops_resolved() {
        let route = route_with_status(RouteStatus::InProgress);
        let drops = vec![
            drop_on_route(1, Some(route.id), DropStatus::Delivered),
            drop_on_route(2, Some(route.id), DropStatus::Cancelled),
        ];

        assert!(ensure_route_completable(&route, &drops).is_ok());
    }

    #[test]
    fn test_deliverable_guard() {
        let route = route_with_status(RouteStatus::InProgress);

        let booked = drop_on_route(1, Some(route.id), DropStatus::Booked);
        assert!(ensure_drop_deliverable(&route, &booked).is_ok());

        let delivered = drop_on_route(2, Some(route.id), DropStatus::Delivered);
        assert!(matches!(
            ensure_drop_deliverable(&route, &delivered),
            Err(LifecycleViolation::DropDelivered { .. })
        ));

        let cancelled = drop_on_route(3, Some(route.id), DropStatus::Cancelled);
        assert!(matches!(
            ensure_drop_deliverable(&route, &cancelled),
            Err(LifecycleViolation::DropNotOpen { .. })
        ));
    }

    #[test]
    fn test_admin_note_appending() {
        let first = stamped_note(Utc::now(), "Route cancelled: duplicate");
        assert_eq!(append_admin_note(None, &first), first);
        assert_eq!(append_admin_note(Some(""), &first), first);

        let combined = append_admin_note(Some("older note"), &first);
        assert!(combined.starts_with("older note\n["));
    }

    #[test]
    fn test_violations_map_to_expected_errors() {
        let terminal: AppError = LifecycleViolation::RouteTerminal {
            route_id: Uuid::from_u128(1),
            status: "completed",
        }
        .into();
        assert!(matches!(terminal, AppError::TerminalState(_)));

        let delivered: AppError =
            LifecycleViolation::DropDelivered { drop_id: Uuid::from_u128(2) }.into();
        assert!(matches!(delivered, AppError::TerminalState(_)));

        let foreign: AppError = LifecycleViolation::NotOnRoute {
            drop_id: Uuid::from_u128(3),
            route_id: Uuid::from_u128(4),
        }
        .into();
        assert!(matches!(foreign, AppError::OwnershipMismatch(_)));

        let transition: AppError = LifecycleViolation::InvalidTransition {
            route_id: Uuid::from_u128(5),
            from: "planned",
            to: "completed",
        }
        .into();
        assert!(matches!(transition, AppError::Conflict(_)));
    }
}
