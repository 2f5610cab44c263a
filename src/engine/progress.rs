//! Progreso de rutas en curso
//!
//! El avance de una ruta se deriva por completo de sus drops: posiciones,
//! estados y timestamps de entrega. No se persiste ningún campo de
//! progreso aparte del contador completed_drops.

use serde::Serialize;
use uuid::Uuid;

use crate::models::drop::{DropStatus, RouteDrop};

/// Progreso de una ruta derivado de sus drops
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteProgress {
    pub total_stops: usize,
    pub completed_stops: usize,
    pub percent_complete: f64,
    pub current_stop_id: Option<Uuid>,
    pub next_stop_id: Option<Uuid>,
}

/// Deriva el progreso desde los drops ligados a la ruta.
///
/// La parada actual es la última entregada (mayor delivered_at, posición
/// como desempate); la siguiente es el primer drop abierto por posición.
/// Los drops cancelados no cuentan como paradas.
pub fn route_progress(drops: &[RouteDrop]) -> RouteProgress {
    let stops: Vec<&RouteDrop> = drops
        .iter()
        .filter(|d| d.status != DropStatus::Cancelled)
        .collect();

    let delivered: Vec<&RouteDrop> = stops
        .iter()
        .copied()
        .filter(|d| d.status == DropStatus::Delivered)
        .collect();

    let current_stop_id = delivered
        .iter()
        .max_by_key(|d| (d.delivered_at, d.position))
        .map(|d| d.id);

    let next_stop_id = stops
        .iter()
        .filter(|d| matches!(d.status, DropStatus::Pending | DropStatus::Booked))
        .min_by_key(|d| d.position)
        .map(|d| d.id);

    let percent = if stops.is_empty() {
        0.0
    } else {
        (delivered.len() as f64 / stops.len() as f64) * 100.0
    };

    RouteProgress {
        total_stops: stops.len(),
        completed_stops: delivered.len(),
        percent_complete: (percent * 10.0).round() / 10.0,
        current_stop_id,
        next_stop_id,
    }
}

/// Estadísticas agregadas del panel de rutas activas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveRouteStats {
    pub routes: usize,
    pub total_stops: usize,
    pub completed_stops: usize,
    pub overall_percent: f64,
}

/// Agrega el progreso de todas las rutas activas visibles
pub fn active_route_stats(progress: &[RouteProgress]) -> ActiveRouteStats {
    let total_stops: usize = progress.iter().map(|p| p.total_stops).sum();
    let completed_stops: usize = progress.iter().map(|p| p.completed_stops).sum();

    let overall = if total_stops == 0 {
        0.0
    } else {
        (completed_stops as f64 / total_stops as f64) * 100.0
    };

    ActiveRouteStats {
        routes: progress.len(),
        total_stops,
        completed_stops,
        overall_percent: (overall * 10.0).round() / 10.0,
    }
}
