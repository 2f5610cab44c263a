//! Agregador de trabajos pendientes
//!
//! Vista operacional del pool de jobs confirmados sin asignar: conteos por
//! región y franja horaria, elegibilidad para clustering y ahorro potencial
//! por consolidación multi-parada. Alimenta el dashboard de despacho.

use chrono::{NaiveDate, Timelike};
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::job::Job;

/// Franja horaria de un job según su hora programada (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeWindow {
    Morning,
    Midday,
    Afternoon,
    Evening,
}

impl TimeWindow {
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            h if h < 10 => TimeWindow::Morning,
            h if h < 14 => TimeWindow::Midday,
            h if h < 18 => TimeWindow::Afternoon,
            _ => TimeWindow::Evening,
        }
    }
}

/// Región de despacho: letras iniciales del outward code, en mayúsculas
/// ("SW1A 2AA" -> "SW", "m1 4bt" -> "M")
pub fn postcode_region(postcode: &str) -> Option<String> {
    let re = Regex::new(r"^\s*([A-Za-z]{1,2})").unwrap();
    re.captures(postcode).map(|caps| caps[1].to_uppercase())
}

/// Conteo de jobs por franja horaria
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeWindowCounts {
    pub morning: usize,
    pub midday: usize,
    pub afternoon: usize,
    pub evening: usize,
}

impl TimeWindowCounts {
    fn bump(&mut self, window: TimeWindow) {
        match window {
            TimeWindow::Morning => self.morning += 1,
            TimeWindow::Midday => self.midday += 1,
            TimeWindow::Afternoon => self.afternoon += 1,
            TimeWindow::Evening => self.evening += 1,
        }
    }
}

/// Estadísticas agregadas del pool pendiente filtrado
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingStats {
    pub total: usize,
    pub eligible: usize,
    pub ineligible: usize,
    pub by_region: BTreeMap<String, usize>,
    pub by_time_window: TimeWindowCounts,
    pub potential_savings: Decimal,
}

/// Filtros del listado de pendientes
#[derive(Debug, Clone, Default)]
pub struct PendingFilter {
    pub eligible_only: Option<bool>,
    pub region: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Pool filtrado más sus estadísticas
#[derive(Debug)]
pub struct PendingAggregation {
    pub jobs: Vec<Job>,
    pub stats: PendingStats,
}

/// Filtra el pool pendiente y calcula sus estadísticas.
///
/// Las estadísticas describen el conjunto filtrado completo; la
/// paginación del listado se aplica después y no las altera. El ahorro
/// potencial es la suma de importes de los jobs elegibles multiplicada
/// por la tasa de consolidación configurada.
pub fn aggregate_pending(
    jobs: Vec<Job>,
    filter: &PendingFilter,
    savings_rate: Decimal,
) -> PendingAggregation {
    let wanted_region = filter.region.as_deref().map(str::to_uppercase);

    let filtered: Vec<Job> = jobs
        .into_iter()
        .filter(|job| match filter.eligible_only {
            Some(true) => job.is_cluster_eligible(),
            Some(false) => !job.is_cluster_eligible(),
            None => true,
        })
        .filter(|job| match &wanted_region {
            Some(region) => postcode_region(&job.pickup_postcode).as_deref() == Some(region),
            None => true,
        })
        .filter(|job| match filter.date {
            Some(date) => job.scheduled_at.date_naive() == date,
            None => true,
        })
        .collect();

    let mut by_region: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_time_window = TimeWindowCounts::default();
    let mut eligible = 0usize;
    let mut eligible_amount = Decimal::ZERO;

    for job in &filtered {
        let region =
            postcode_region(&job.pickup_postcode).unwrap_or_else(|| "unknown".to_string());
        *by_region.entry(region).or_insert(0) += 1;

        by_time_window.bump(TimeWindow::from_hour(job.scheduled_at.hour()));

        if job.is_cluster_eligible() {
            eligible += 1;
            eligible_amount += job.total_amount;
        }
    }

    let stats = PendingStats {
        total: filtered.len(),
        eligible,
        ineligible: filtered.len() - eligible,
        by_region,
        by_time_window,
        potential_savings: (eligible_amount * savings_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
    };

    PendingAggregation {
        jobs: filtered,
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobStatus;
    use chrono::{DateTime, TimeZone, Utc};
    use uuid::Uuid;

    fn scheduled(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, hour, 30, 0).unwrap()
    }

    fn pending_job(
        n: u128,
        postcode: &str,
        geocoded: bool,
        amount: i64,
        at: DateTime<Utc>,
    ) -> Job {
        Job {
            id: Uuid::from_u128(n),
            customer_id: Uuid::from_u128(n + 100),
            status: JobStatus::Confirmed,
            route_id: None,
            driver_id: None,
            pickup_address: "pickup".to_string(),
            pickup_postcode: postcode.to_string(),
            pickup_lat: if geocoded { Some(51.5) } else { None },
            pickup_lng: if geocoded { Some(-0.12) } else { None },
            dropoff_address: "dropoff".to_string(),
            dropoff_postcode: "B1 1AA".to_string(),
            dropoff_lat: None,
            dropoff_lng: None,
            total_amount: Decimal::from(amount),
            scheduled_at: at,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_time_window_boundaries() {
        assert_eq!(TimeWindow::from_hour(0), TimeWindow::Morning);
        assert_eq!(TimeWindow::from_hour(9), TimeWindow::Morning);
        assert_eq!(TimeWindow::from_hour(10), TimeWindow::Midday);
        assert_eq!(TimeWindow::from_hour(13), TimeWindow::Midday);
        assert_eq!(TimeWindow::from_hour(14), TimeWindow::Afternoon);
        assert_eq!(TimeWindow::from_hour(17), TimeWindow::Afternoon);
        assert_eq!(TimeWindow::from_hour(18), TimeWindow::Evening);
        assert_eq!(TimeWindow::from_hour(23), TimeWindow::Evening);
    }

    #[test]
    fn test_postcode_region_extraction() {
        assert_eq!(postcode_region("SW1A 2AA"), Some("SW".to_string()));
        assert_eq!(postcode_region("m1 4bt"), Some("M".to_string()));
        assert_eq!(postcode_region("E14 9GE"), Some("E".to_string()));
        assert_eq!(postcode_region("  LS1 4AB"), Some("LS".to_string()));
        assert_eq!(postcode_region("1234"), None);
        assert_eq!(postcode_region(""), None);
    }

    #[test]
    fn test_stats_counts_and_savings() {
        let jobs = vec![
            pending_job(1, "SW1A 2AA", true, 100, scheduled(8)),
            pending_job(2, "SW3 5EN", true, 200, scheduled(12)),
            pending_job(3, "M1 4BT", false, 400, scheduled(19)),
        ];

        let result = aggregate_pending(jobs, &PendingFilter::default(), Decimal::new(15, 2));

        assert_eq!(result.stats.total, 3);
        assert_eq!(result.stats.eligible, 2);
        assert_eq!(result.stats.ineligible, 1);
        assert_eq!(result.stats.by_region.get("SW"), Some(&2));
        assert_eq!(result.stats.by_region.get("M"), Some(&1));
        assert_eq!(result.stats.by_time_window.morning, 1);
        assert_eq!(result.stats.by_time_window.midday, 1);
        assert_eq!(result.stats.by_time_window.evening, 1);
        // Solo los elegibles ahorran: (100 + 200) * 0.15
        assert_eq!(result.stats.potential_savings, Decimal::from(45));
    }

    #[test]
    fn test_eligible_filter() {
        let jobs = vec![
            pending_job(1, "SW1A 2AA", true, 100, scheduled(8)),
            pending_job(2, "M1 4BT", false, 400, scheduled(19)),
        ];

        let only_eligible = aggregate_pending(
            jobs.clone(),
            &PendingFilter {
                eligible_only: Some(true),
                ..Default::default()
            },
            Decimal::new(15, 2),
        );
        assert_eq!(only_eligible.jobs.len(), 1);
        assert_eq!(only_eligible.jobs[0].id, Uuid::from_u128(1));

        let only_ineligible = aggregate_pending(
            jobs,
            &PendingFilter {
                eligible_only: Some(false),
                ..Default::default()
            },
            Decimal::new(15, 2),
        );
        assert_eq!(only_ineligible.jobs.len(), 1);
        assert_eq!(only_ineligible.jobs[0].id, Uuid::from_u128(2));
        assert_eq!(only_ineligible.stats.potential_savings, Decimal::ZERO);
    }

    #[test]
    fn test_region_filter_is_case_insensitive() {
        let jobs = vec![
            pending_job(1, "SW1A 2AA", true, 100, scheduled(8)),
            pending_job(2, "M1 4BT", true, 400, scheduled(9)),
        ];

        let result = aggregate_pending(
            jobs,
            &PendingFilter {
                region: Some("sw".to_string()),
                ..Default::default()
            },
            Decimal::new(15, 2),
        );

        assert_eq!(result.jobs.len(), 1);
        assert_eq!(result.stats.total, 1);
        assert_eq!(result.jobs[0].pickup_postcode, "SW1A 2AA");
    }

    #[test]
    fn test_date_filter() {
        let jobs = vec![
            pending_job(1, "SW1A 2AA", true, 100, scheduled(8)),
            pending_job(
                2,
                "SW3 5EN",
                true,
                200,
                Utc.with_ymd_and_hms(2026, 3, 11, 8, 0, 0).unwrap(),
            ),
        ];

        let result = aggregate_pending(
            jobs,
            &PendingFilter {
                date: Some(NaiveDate::from_ymd_opt(2026, 3, 10).unwrap()),
                ..Default::default()
            },
            Decimal::new(15, 2),
        );

        assert_eq!(result.jobs.len(), 1);
        assert_eq!(result.jobs[0].id, Uuid::from_u128(1));
    }

    #[test]
    fn test_unparseable_postcode_lands_in_unknown_bucket() {
        let jobs = vec![pending_job(1, "12345", true, 100, scheduled(8))];

        let result = aggregate_pending(jobs, &PendingFilter::default(), Decimal::new(15, 2));
        assert_eq!(result.stats.by_region.get("unknown"), Some(&1));
    }
}
