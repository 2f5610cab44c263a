//! Motor de clustering geográfico
//!
//! Agrupa jobs confirmados sin asignar en rutas multi-parada propuestas.
//! El radio de agrupación se adapta al tamaño del pool: pools densos
//! producen rutas compactas, pools dispersos toleran más distancia antes
//! de dejar jobs como singletons.

use serde::Serialize;
use uuid::Uuid;

use crate::utils::geo::GeoPoint;

/// Job elegible para clustering: ya viene filtrado con recogida geocodificada
#[derive(Debug, Clone)]
pub struct ClusterableJob {
    pub id: Uuid,
    pub pickup: GeoPoint,
}

/// Grupo de jobs propuesto como una ruta multi-parada
#[derive(Debug, Clone, Serialize)]
pub struct JobCluster {
    pub seed_job_id: Uuid,
    pub job_ids: Vec<Uuid>,
    pub radius_miles: f64,
    pub chained_distance_miles: f64,
}

impl JobCluster {
    pub fn size(&self) -> usize {
        self.job_ids.len()
    }
}

/// Radio de agrupación adaptativo según el tamaño del pool, en millas
pub fn clustering_radius_miles(pool_size: usize) -> f64 {
    match pool_size {
        n if n > 50 => 25.0,
        n if n > 20 => 50.0,
        n if n > 10 => 75.0,
        n if n > 5 => 100.0,
        _ => 125.0,
    }
}

/// Particiona el pool en clusters con un pase greedy.
///
/// El radio se calcula una sola vez sobre el pool completo. Los jobs se
/// recorren en orden estable de id; el primer job sin asignar siembra un
/// cluster y absorbe todo candidato posterior cuya recogida quede dentro
/// del radio. La membresía se decide contra la semilla, nunca contra los
/// miembros ya añadidos: dos miembros del mismo cluster pueden quedar
/// hasta a dos radios entre sí.
///
/// Todo job de entrada aparece en exactamente un cluster; un singleton es
/// un cluster válido.
pub fn cluster_jobs(jobs: &[ClusterableJob]) -> Vec<JobCluster> {
    let radius = clustering_radius_miles(jobs.len());

    let mut ordered: Vec<&ClusterableJob> = jobs.iter().collect();
    ordered.sort_by_key(|job| job.id);

    let mut assigned = vec![false; ordered.len()];
    let mut clusters = Vec::new();

    for i in 0..ordered.len() {
        if assigned[i] {
            continue;
        }
        assigned[i] = true;

        let seed = ordered[i];
        let mut members = vec![seed];

        for j in (i + 1)..ordered.len() {
            if assigned[j] {
                continue;
            }
            if seed.pickup.distance_miles(&ordered[j].pickup) <= radius {
                assigned[j] = true;
                members.push(ordered[j]);
            }
        }

        clusters.push(JobCluster {
            seed_job_id: seed.id,
            job_ids: members.iter().map(|m| m.id).collect(),
            radius_miles: radius,
            chained_distance_miles: chained_pickup_distance(&members),
        });
    }

    clusters
}

/// Distancia estimada recorriendo las recogidas en el orden del cluster
fn chained_pickup_distance(members: &[&ClusterableJob]) -> f64 {
    members
        .windows(2)
        .map(|pair| pair[0].pickup.distance_miles(&pair[1].pickup))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    // 0.1 grados de latitud ~ 6.9 millas; útil para colocar jobs a
    // distancias conocidas sin trigonometría en los tests
    fn job(n: u128, lat: f64, lng: f64) -> ClusterableJob {
        ClusterableJob {
            id: Uuid::from_u128(n),
            pickup: GeoPoint::new(lat, lng),
        }
    }

    #[test]
    fn test_radius_tiers() {
        assert_eq!(clustering_radius_miles(60), 25.0);
        assert_eq!(clustering_radius_miles(51), 25.0);
        assert_eq!(clustering_radius_miles(50), 50.0);
        assert_eq!(clustering_radius_miles(21), 50.0);
        assert_eq!(clustering_radius_miles(20), 75.0);
        assert_eq!(clustering_radius_miles(11), 75.0);
        assert_eq!(clustering_radius_miles(10), 100.0);
        assert_eq!(clustering_radius_miles(6), 100.0);
        assert_eq!(clustering_radius_miles(5), 125.0);
        assert_eq!(clustering_radius_miles(1), 125.0);
        assert_eq!(clustering_radius_miles(0), 125.0);
    }

    #[test]
    fn test_radius_never_grows_with_pool_size() {
        let mut previous = clustering_radius_miles(0);
        for n in 1..=80 {
            let current = clustering_radius_miles(n);
            assert!(
                current <= previous,
                "radius grew from {} to {} at pool size {}",
                previous,
                current,
                n
            );
            previous = current;
        }
    }

    #[test]
    fn test_empty_pool_produces_no_clusters() {
        assert!(cluster_jobs(&[]).is_empty());
    }

    #[test]
    fn test_single_job_is_a_singleton_cluster() {
        let pool = vec![job(1, 51.5, -0.12)];
        let clusters = cluster_jobs(&pool);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].size(), 1);
        assert_eq!(clusters[0].seed_job_id, Uuid::from_u128(1));
        assert_eq!(clusters[0].radius_miles, 125.0);
    }

    #[test]
    fn test_six_jobs_within_radius_form_one_cluster() {
        // Pool de 6 -> radio 100. Recogidas a menos de 80 millas de la
        // semilla: todas caen en el mismo cluster.
        let pool = vec![
            job(1, 51.0, -1.0),
            job(2, 51.2, -1.0),
            job(3, 51.4, -1.0),
            job(4, 51.6, -1.0),
            job(5, 51.8, -1.0),
            job(6, 52.0, -1.0),
        ];

        let clusters = cluster_jobs(&pool);

        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].size(), 6);
        assert_eq!(clusters[0].radius_miles, 100.0);
        assert_eq!(clusters[0].seed_job_id, Uuid::from_u128(1));
    }

    #[test]
    fn test_far_job_becomes_its_own_cluster() {
        // Pool de 3 -> radio 125. Dos recogidas a ~7 millas y una a ~207:
        // la lejana queda como singleton.
        let pool = vec![
            job(1, 51.0, -1.0),
            job(2, 51.1, -1.0),
            job(3, 54.0, -1.0),
        ];

        let clusters = cluster_jobs(&pool);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].job_ids, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
        assert_eq!(clusters[1].job_ids, vec![Uuid::from_u128(3)]);
        assert_eq!(clusters[0].radius_miles, 125.0);
        assert_eq!(clusters[1].radius_miles, 125.0);
    }

    #[test]
    fn test_output_is_a_partition_of_the_input() {
        // 23 jobs regados en una rejilla -> radio 50; cada job debe
        // aparecer exactamente una vez en la salida
        let mut pool = Vec::new();
        for n in 0..23u128 {
            let lat = 50.0 + (n % 5) as f64 * 1.5;
            let lng = -3.0 + (n / 5) as f64 * 1.5;
            pool.push(job(n + 1, lat, lng));
        }

        let clusters = cluster_jobs(&pool);

        let mut seen = HashSet::new();
        for cluster in &clusters {
            assert_eq!(cluster.radius_miles, 50.0);
            for id in &cluster.job_ids {
                assert!(seen.insert(*id), "job {} appears in two clusters", id);
            }
        }
        assert_eq!(seen.len(), pool.len());
    }

    #[test]
    fn test_input_order_does_not_change_the_partition() {
        let forward = vec![
            job(1, 51.0, -1.0),
            job(2, 51.1, -1.0),
            job(3, 54.0, -1.0),
            job(4, 54.1, -1.0),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = cluster_jobs(&forward);
        let b = cluster_jobs(&reversed);

        assert_eq!(a.len(), b.len());
        for (ca, cb) in a.iter().zip(b.iter()) {
            assert_eq!(ca.seed_job_id, cb.seed_job_id);
            assert_eq!(ca.job_ids, cb.job_ids);
        }
    }

    #[test]
    fn test_membership_is_measured_against_the_seed() {
        // b está a ~100 mi de la semilla y c a ~200 mi de la semilla pero
        // a ~100 mi de b: c queda fuera del cluster de la semilla
        let pool = vec![
            job(1, 50.0, -1.0),
            job(2, 51.45, -1.0),
            job(3, 52.9, -1.0),
        ];

        let clusters = cluster_jobs(&pool);

        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].job_ids, vec![Uuid::from_u128(1), Uuid::from_u128(2)]);
        assert_eq!(clusters[1].job_ids, vec![Uuid::from_u128(3)]);
    }

    #[test]
    fn test_chained_distance_sums_consecutive_legs() {
        // Tres recogidas colineales separadas ~6.9 millas cada tramo
        let pool = vec![
            job(1, 51.0, -1.0),
            job(2, 51.1, -1.0),
            job(3, 51.2, -1.0),
        ];

        let clusters = cluster_jobs(&pool);

        assert_eq!(clusters.len(), 1);
        let chained = clusters[0].chained_distance_miles;
        assert!(chained > 13.5 && chained < 14.2, "unexpected chain: {}", chained);
    }
}
