//! Modelo de Job
//!
//! Este módulo contiene el struct Job del marketplace y su enum de estado.
//! Mapea exactamente al schema PostgreSQL con primary key 'id'.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use rust_decimal::Decimal;

use crate::utils::geo::GeoPoint;

/// Estado del job - mapea al ENUM job_status
#[derive(Debug, Clone, Serialize, Deserialize, Type, PartialEq)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Confirmed,
    Routed,
    Completed,
    Cancelled,
}

impl JobStatus {
    /// Estados desde los que el job ya no vuelve al pool de asignación
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Cancelled)
    }
}

/// Job principal - mapea exactamente a la tabla jobs
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Job {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: JobStatus,
    pub route_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub pickup_address: String,
    pub pickup_postcode: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_address: String,
    pub dropoff_postcode: String,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    pub total_amount: Decimal,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Coordenadas de recogida, si el job está geocodificado
    pub fn pickup_point(&self) -> Option<GeoPoint> {
        match (self.pickup_lat, self.pickup_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    /// Coordenadas de entrega, si el job está geocodificado
    pub fn dropoff_point(&self) -> Option<GeoPoint> {
        match (self.dropoff_lat, self.dropoff_lng) {
            (Some(lat), Some(lng)) => Some(GeoPoint::new(lat, lng)),
            _ => None,
        }
    }

    /// Un job entra al clustering solo con recogida geocodificada
    pub fn is_cluster_eligible(&self) -> bool {
        self.pickup_point().is_some()
    }
}

/// Response de job para la API
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub customer_id: String,
    pub status: JobStatus,
    pub route_id: Option<String>,
    pub driver_id: Option<String>,
    pub pickup_address: String,
    pub pickup_postcode: String,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_address: String,
    pub dropoff_postcode: String,
    pub total_amount: Decimal,
    pub scheduled_at: String,
    pub created_at: String,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            customer_id: job.customer_id.to_string(),
            status: job.status,
            route_id: job.route_id.map(|r| r.to_string()),
            driver_id: job.driver_id.map(|d| d.to_string()),
            pickup_address: job.pickup_address,
            pickup_postcode: job.pickup_postcode,
            pickup_lat: job.pickup_lat,
            pickup_lng: job.pickup_lng,
            dropoff_address: job.dropoff_address,
            dropoff_postcode: job.dropoff_postcode,
            total_amount: job.total_amount,
            scheduled_at: job.scheduled_at.to_rfc3339(),
            created_at: job.created_at.to_rfc3339(),
        }
    }
}
