//! Modelo de Drop
//!
//! Este módulo contiene el struct RouteDrop (una parada de entrega dentro de
//! una ruta multi-parada) y su enum de estado. Mapea a la tabla drops.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;

/// Estado del drop - mapea al ENUM drop_status
///
/// `delivered` es inmutable: un drop entregado nunca se reabre ni se
/// desliga de su ruta.
#[derive(Debug, Clone, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "drop_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DropStatus {
    Pending,
    Booked,
    Delivered,
    Cancelled,
}

impl DropStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DropStatus::Delivered | DropStatus::Cancelled)
    }

    /// Los drops cancelados no aportan a las ganancias de la ruta
    pub fn counts_for_earnings(&self) -> bool {
        !matches!(self, DropStatus::Cancelled)
    }

    /// Etiqueta del estado tal como se persiste en el ENUM de PostgreSQL
    pub fn as_str(&self) -> &'static str {
        match self {
            DropStatus::Pending => "pending",
            DropStatus::Booked => "booked",
            DropStatus::Delivered => "delivered",
            DropStatus::Cancelled => "cancelled",
        }
    }
}

/// Parada de entrega - mapea exactamente a la tabla drops
///
/// Se llama RouteDrop para no chocar con std::ops::Drop.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RouteDrop {
    pub id: Uuid,
    pub route_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub delivery_address: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub status: DropStatus,
    pub quoted_price: Decimal,
    pub settled_amount: Option<Decimal>,
    pub special_instructions: Option<String>,
    pub position: i32,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RouteDrop {
    /// Importe efectivo: el liquidado si existe, si no el cotizado
    pub fn effective_amount(&self) -> Decimal {
        self.settled_amount.unwrap_or(self.quoted_price)
    }

    pub fn is_delivered(&self) -> bool {
        self.status == DropStatus::Delivered
    }
}

/// Response de drop para la API
#[derive(Debug, Serialize)]
pub struct DropResponse {
    pub id: String,
    pub route_id: Option<String>,
    pub job_id: Option<String>,
    pub customer_id: String,
    pub pickup_address: String,
    pub delivery_address: String,
    pub window_start: String,
    pub window_end: String,
    pub status: DropStatus,
    pub quoted_price: Decimal,
    pub settled_amount: Option<Decimal>,
    pub special_instructions: Option<String>,
    pub position: i32,
    pub delivered_at: Option<String>,
}

impl From<RouteDrop> for DropResponse {
    fn from(drop: RouteDrop) -> Self {
        Self {
            id: drop.id.to_string(),
            route_id: drop.route_id.map(|r| r.to_string()),
            job_id: drop.job_id.map(|j| j.to_string()),
            customer_id: drop.customer_id.to_string(),
            pickup_address: drop.pickup_address,
            delivery_address: drop.delivery_address,
            window_start: drop.window_start.to_rfc3339(),
            window_end: drop.window_end.to_rfc3339(),
            status: drop.status,
            quoted_price: drop.quoted_price,
            settled_amount: drop.settled_amount,
            special_instructions: drop.special_instructions,
            position: drop.position,
            delivered_at: drop.delivered_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_drop(status: DropStatus, settled: Option<Decimal>) -> RouteDrop {
        let now = Utc::now();
        RouteDrop {
            id: Uuid::new_v4(),
            route_id: Some(Uuid::new_v4()),
            job_id: None,
            customer_id: Uuid::new_v4(),
            pickup_address: "Warehouse A, Birmingham".to_string(),
            delivery_address: "22 Rose Lane, Liverpool".to_string(),
            window_start: now,
            window_end: now + chrono::Duration::hours(4),
            status,
            quoted_price: Decimal::from(120),
            settled_amount: settled,
            special_instructions: None,
            position: 1,
            delivered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_effective_amount_prefers_settled() {
        let drop = sample_drop(DropStatus::Delivered, Some(Decimal::from(110)));
        assert_eq!(drop.effective_amount(), Decimal::from(110));
    }

    #[test]
    fn test_effective_amount_falls_back_to_quoted() {
        let drop = sample_drop(DropStatus::Booked, None);
        assert_eq!(drop.effective_amount(), Decimal::from(120));
    }

    #[test]
    fn test_cancelled_drops_do_not_count_for_earnings() {
        assert!(DropStatus::Pending.counts_for_earnings());
        assert!(DropStatus::Booked.counts_for_earnings());
        assert!(DropStatus::Delivered.counts_for_earnings());
        assert!(!DropStatus::Cancelled.counts_for_earnings());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DropStatus::Pending.is_terminal());
        assert!(!DropStatus::Booked.is_terminal());
        assert!(DropStatus::Delivered.is_terminal());
        assert!(DropStatus::Cancelled.is_terminal());
    }
}
