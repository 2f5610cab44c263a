//! Modelo de Route
//!
//! Este módulo contiene el struct Route multi-parada y su máquina de estados.
//! Mapea exactamente al schema PostgreSQL con primary key 'id'.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;

/// Estado de la ruta - mapea al ENUM route_status
///
/// `completed` y `closed` son terminales. `closed` solo se alcanza por
/// cancelación administrativa.
#[derive(Debug, Clone, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "route_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Planned,
    Assigned,
    InProgress,
    Completed,
    Closed,
}

impl RouteStatus {
    /// Una ruta terminal no admite ninguna mutación posterior
    pub fn is_terminal(&self) -> bool {
        matches!(self, RouteStatus::Completed | RouteStatus::Closed)
    }

    /// Rutas visibles en el panel de despacho activo
    pub fn is_active(&self) -> bool {
        matches!(self, RouteStatus::Assigned | RouteStatus::InProgress)
    }

    /// Etiqueta del estado tal como se persiste en el ENUM de PostgreSQL
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStatus::Planned => "planned",
            RouteStatus::Assigned => "assigned",
            RouteStatus::InProgress => "in_progress",
            RouteStatus::Completed => "completed",
            RouteStatus::Closed => "closed",
        }
    }
}

/// Route principal - mapea exactamente a la tabla routes
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Route {
    pub id: Uuid,
    pub driver_id: Option<Uuid>,
    pub status: RouteStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub total_drops: i32,
    pub completed_drops: i32,
    pub total_earnings: Decimal,
    pub performance_multiplier: Decimal,
    pub bonus_total: Decimal,
    pub penalty_total: Decimal,
    pub total_distance_miles: Option<f64>,
    pub admin_override: bool,
    pub admin_notes: Option<String>,
    pub admin_price_adjustment: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Route {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Duración en horas, solo cuando la ruta tiene inicio y fin registrados
    pub fn duration_hours(&self) -> Option<f64> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) if end > start => {
                Some((end - start).num_seconds() as f64 / 3600.0)
            }
            _ => None,
        }
    }
}

/// Response de ruta para la API
#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub id: String,
    pub driver_id: Option<String>,
    pub status: RouteStatus,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub total_drops: i32,
    pub completed_drops: i32,
    pub total_earnings: Decimal,
    pub performance_multiplier: Decimal,
    pub bonus_total: Decimal,
    pub penalty_total: Decimal,
    pub total_distance_miles: Option<f64>,
    pub admin_override: bool,
    pub admin_notes: Option<String>,
    pub admin_price_adjustment: Option<Decimal>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Route> for RouteResponse {
    fn from(route: Route) -> Self {
        Self {
            id: route.id.to_string(),
            driver_id: route.driver_id.map(|d| d.to_string()),
            status: route.status,
            started_at: route.started_at.map(|t| t.to_rfc3339()),
            ended_at: route.ended_at.map(|t| t.to_rfc3339()),
            total_drops: route.total_drops,
            completed_drops: route.completed_drops,
            total_earnings: route.total_earnings,
            performance_multiplier: route.performance_multiplier,
            bonus_total: route.bonus_total,
            penalty_total: route.penalty_total,
            total_distance_miles: route.total_distance_miles,
            admin_override: route.admin_override,
            admin_notes: route.admin_notes,
            admin_price_adjustment: route.admin_price_adjustment,
            created_at: route.created_at.to_rfc3339(),
            updated_at: route.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!RouteStatus::Planned.is_terminal());
        assert!(!RouteStatus::Assigned.is_terminal());
        assert!(!RouteStatus::InProgress.is_terminal());
        assert!(RouteStatus::Completed.is_terminal());
        assert!(RouteStatus::Closed.is_terminal());
    }

    #[test]
    fn test_active_states() {
        assert!(RouteStatus::Assigned.is_active());
        assert!(RouteStatus::InProgress.is_active());
        assert!(!RouteStatus::Planned.is_active());
        assert!(!RouteStatus::Completed.is_active());
        assert!(!RouteStatus::Closed.is_active());
    }

    #[test]
    fn test_duration_requires_both_timestamps() {
        let now = Utc::now();
        let mut route = Route {
            id: Uuid::new_v4(),
            driver_id: None,
            status: RouteStatus::InProgress,
            started_at: Some(now),
            ended_at: None,
            total_drops: 3,
            completed_drops: 0,
            total_earnings: Decimal::ZERO,
            performance_multiplier: Decimal::ONE,
            bonus_total: Decimal::ZERO,
            penalty_total: Decimal::ZERO,
            total_distance_miles: None,
            admin_override: false,
            admin_notes: None,
            admin_price_adjustment: None,
            created_at: now,
            updated_at: now,
        };

        assert!(route.duration_hours().is_none());

        route.ended_at = Some(now + chrono::Duration::hours(2));
        let hours = route.duration_hours().unwrap();
        assert!((hours - 2.0).abs() < 1e-9);
    }
}
