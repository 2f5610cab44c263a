//! Calculadora de ganancias
//!
//! Las ganancias de una ruta se derivan siempre de sus drops; el campo
//! total_earnings de la tabla routes es solo un agregado materializado.
//! Cuando el agregado almacenado no pasa la validación se recomputa desde
//! los drops y el valor recomputado reemplaza al almacenado.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::drop::RouteDrop;
use crate::models::money::{is_valid_earnings, Money};
use crate::models::route::Route;

/// Desglose de ganancias de una ruta
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EarningsBreakdown {
    pub base: Decimal,
    pub multiplier: Decimal,
    pub bonuses: Decimal,
    pub penalties: Decimal,
    pub adjustment: Decimal,
}

/// Ganancias calculadas de una ruta, con métricas derivadas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteEarnings {
    pub total: Decimal,
    pub breakdown: EarningsBreakdown,
    pub per_stop: Decimal,
    pub per_mile: Decimal,
    pub per_hour: Decimal,
}

/// Calcula las ganancias de una ruta desde sus drops.
///
/// base = suma del importe efectivo de cada drop no cancelado (el
/// liquidado si existe, si no el cotizado). El total aplica el
/// multiplicador de rendimiento, suma bonos, resta penalizaciones y suma
/// el ajuste administrativo; el resultado se acota a [0, ceiling].
///
/// Mismos drops y misma ruta producen siempre el mismo resultado.
pub fn compute_earnings(route: &Route, drops: &[RouteDrop], ceiling: Decimal) -> RouteEarnings {
    let counted: Vec<&RouteDrop> = drops
        .iter()
        .filter(|d| d.status.counts_for_earnings())
        .collect();

    let base: Decimal = counted.iter().map(|d| d.effective_amount()).sum();
    let adjustment = route.admin_price_adjustment.unwrap_or(Decimal::ZERO);

    let gross = base * route.performance_multiplier + route.bonus_total - route.penalty_total
        + adjustment;
    let total = Money::clamped(gross, ceiling).amount();

    RouteEarnings {
        total,
        breakdown: EarningsBreakdown {
            base,
            multiplier: route.performance_multiplier,
            bonuses: route.bonus_total,
            penalties: route.penalty_total,
            adjustment,
        },
        per_stop: rate_over_count(total, counted.len()),
        per_mile: rate_over_f64(total, route.total_distance_miles),
        per_hour: rate_over_f64(total, route.duration_hours()),
    }
}

/// Decisión sobre el agregado total_earnings almacenado
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TotalRepair {
    /// El almacenado coincide con el recomputado
    Keep,
    /// Válido pero desactualizado: se refresca en silencio
    RefreshStale,
    /// Negativo o por encima del tope: se reemplaza y se deja traza
    ReplaceCorrupt,
}

/// Audita el total almacenado contra el recomputado
pub fn audit_stored_total(stored: Decimal, recomputed: Decimal, ceiling: Decimal) -> TotalRepair {
    if !is_valid_earnings(stored, ceiling) {
        TotalRepair::ReplaceCorrupt
    } else if stored != recomputed {
        TotalRepair::RefreshStale
    } else {
        TotalRepair::Keep
    }
}

/// Tarifa por unidad entera (paradas); 0 cuando el divisor es 0
fn rate_over_count(total: Decimal, count: usize) -> Decimal {
    if count == 0 {
        return Decimal::ZERO;
    }
    round_rate(total / Decimal::from(count as u64))
}

/// Tarifa por unidad fraccional (millas, horas); 0 cuando el divisor
/// falta o no es positivo
fn rate_over_f64(total: Decimal, divisor: Option<f64>) -> Decimal {
    match divisor {
        Some(value) if value > 0.0 => match Decimal::from_f64_retain(value) {
            Some(d) if d > Decimal::ZERO => round_rate(total / d),
            _ => Decimal::ZERO,
        },
        _ => Decimal::ZERO,
    }
}

fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}
