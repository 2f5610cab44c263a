//! Modelo de Money
//!
//! Importe monetario validado para ganancias y precios. La construcción
//! rechaza valores fuera del rango permitido; un importe almacenado que no
//! pasa la validación se repara recomputándolo desde los drops (ver
//! engine::earnings).

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::errors::AppError;

/// Errores de construcción de importes
#[derive(Debug, Error, PartialEq)]
pub enum MoneyError {
    #[error("amount is not a finite number")]
    NotFinite,

    #[error("amount {0} is negative")]
    Negative(Decimal),

    #[error("amount {0} exceeds the configured ceiling of {1}")]
    AboveCeiling(Decimal, Decimal),
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

/// Importe monetario validado: no negativo y por debajo del tope configurado
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Construye un importe validado contra el tope dado
    pub fn new(amount: Decimal, ceiling: Decimal) -> Result<Self, MoneyError> {
        if amount < Decimal::ZERO {
            return Err(MoneyError::Negative(amount));
        }
        if amount > ceiling {
            return Err(MoneyError::AboveCeiling(amount, ceiling));
        }
        Ok(Self(amount))
    }

    /// Construye desde f64. NaN e infinitos no pueden cruzar al dominio.
    pub fn from_f64(amount: f64, ceiling: Decimal) -> Result<Self, MoneyError> {
        let decimal = Decimal::from_f64_retain(amount).ok_or(MoneyError::NotFinite)?;
        Self::new(decimal, ceiling)
    }

    /// Repara un importe fuera de rango acotándolo a [0, ceiling]
    pub fn clamped(amount: Decimal, ceiling: Decimal) -> Self {
        Self(amount.clamp(Decimal::ZERO, ceiling))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Importe redondeado a 2 decimales para presentación (mitad hacia arriba)
    pub fn rounded(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

/// Comprueba si un importe almacenado es válido como ganancias
pub fn is_valid_earnings(amount: Decimal, ceiling: Decimal) -> bool {
    amount >= Decimal::ZERO && amount <= ceiling
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ceiling() -> Decimal {
        Decimal::from(1_000_000)
    }

    #[test]
    fn test_new_accepts_valid_amount() {
        let money = Money::new(Decimal::new(12550, 2), ceiling()).unwrap();
        assert_eq!(money.amount(), Decimal::new(12550, 2));
    }

    #[test]
    fn test_new_accepts_zero() {
        assert_eq!(Money::new(Decimal::ZERO, ceiling()).unwrap(), Money::ZERO);
    }

    #[test]
    fn test_new_rejects_negative() {
        let result = Money::new(Decimal::new(-1, 2), ceiling());
        assert!(matches!(result, Err(MoneyError::Negative(_))));
    }

    #[test]
    fn test_new_rejects_above_ceiling() {
        let result = Money::new(Decimal::from(1_000_001), ceiling());
        assert!(matches!(result, Err(MoneyError::AboveCeiling(_, _))));
    }

    #[test]
    fn test_from_f64_rejects_non_finite() {
        assert_eq!(
            Money::from_f64(f64::NAN, ceiling()),
            Err(MoneyError::NotFinite)
        );
        assert_eq!(
            Money::from_f64(f64::INFINITY, ceiling()),
            Err(MoneyError::NotFinite)
        );
        assert_eq!(
            Money::from_f64(f64::NEG_INFINITY, ceiling()),
            Err(MoneyError::NotFinite)
        );
    }

    #[test]
    fn test_from_f64_accepts_finite() {
        let money = Money::from_f64(99.99, ceiling()).unwrap();
        assert!(money.amount() > Decimal::ZERO);
    }

    #[test]
    fn test_clamped_repairs_out_of_range() {
        assert_eq!(
            Money::clamped(Decimal::from(-50), ceiling()),
            Money::ZERO
        );
        assert_eq!(
            Money::clamped(Decimal::from(2_000_000), ceiling()).amount(),
            ceiling()
        );
    }

    #[test]
    fn test_rounded_half_up() {
        let money = Money::new(Decimal::new(10125, 3), ceiling()).unwrap();
        assert_eq!(money.rounded(), Decimal::new(1013, 2));
    }

    #[test]
    fn test_is_valid_earnings() {
        assert!(is_valid_earnings(Decimal::ZERO, ceiling()));
        assert!(is_valid_earnings(Decimal::from(500), ceiling()));
        assert!(!is_valid_earnings(Decimal::from(-1), ceiling()));
        assert!(!is_valid_earnings(Decimal::from(1_000_001), ceiling()));
    }
}
