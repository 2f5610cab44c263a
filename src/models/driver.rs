//! Modelo de Driver
//!
//! Este módulo contiene el struct Driver. El despacho solo consume la
//! disponibilidad y la última posición reportada; el tracking GPS en vivo
//! es responsabilidad de otro sistema.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

/// Disponibilidad del conductor - mapea al ENUM driver_availability
#[derive(Debug, Clone, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "driver_availability", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DriverAvailability {
    Available,
    OnRoute,
    Offline,
}

/// Driver principal - mapea exactamente a la tabla drivers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Driver {
    pub id: Uuid,
    pub full_name: String,
    pub availability_status: DriverAvailability,
    pub location_consent: bool,
    pub last_lat: Option<f64>,
    pub last_lng: Option<f64>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Driver {
    /// Última posición conocida, solo con consentimiento vigente
    pub fn last_position(&self) -> Option<GeoPoint> {
        if !self.location_consent {
            return None;
        }
        match (self.last_lat, self.last_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_driver(consent: bool) -> Driver {
        Driver {
            id: Uuid::new_v4(),
            full_name: "Sam Porter".to_string(),
            availability_status: DriverAvailability::Available,
            location_consent: consent,
            last_lat: Some(51.5),
            last_lng: Some(-0.12),
            last_seen_at: Some(Utc::now()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_position_hidden_without_consent() {
        assert!(sample_driver(false).last_position().is_none());
        assert!(sample_driver(true).last_position().is_some());
    }
}
