//! Utilidades geográficas
//!
//! Cálculo de distancias de gran círculo para el motor de clustering.
//! Todas las distancias del sistema se expresan en millas.

use serde::{Deserialize, Serialize};

/// Radio medio de la Tierra en millas
pub const EARTH_RADIUS_MILES: f64 = 3958.8;

/// Punto geográfico (latitud/longitud en grados decimales)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Distancia de gran círculo hasta otro punto, en millas
    pub fn distance_miles(&self, other: &GeoPoint) -> f64 {
        haversine_miles(self, other)
    }
}

/// Distancia haversine entre dos puntos, en millas
pub fn haversine_miles(a: &GeoPoint, b: &GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().asin();
    EARTH_RADIUS_MILES * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_same_point_is_zero() {
        let p = GeoPoint::new(51.5074, -0.1278);
        assert!(p.distance_miles(&p) < 1e-9);
    }

    #[test]
    fn test_distance_london_manchester() {
        // Distancia en línea recta conocida: ~163 millas
        let london = GeoPoint::new(51.5074, -0.1278);
        let manchester = GeoPoint::new(53.4808, -2.2426);

        let d = london.distance_miles(&manchester);
        assert!(d > 160.0 && d < 166.0, "unexpected distance: {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoPoint::new(51.5074, -0.1278);
        let b = GeoPoint::new(52.4862, -1.8904);

        let d1 = a.distance_miles(&b);
        let d2 = b.distance_miles(&a);
        assert!((d1 - d2).abs() < 1e-9);
    }

    #[test]
    fn test_distance_tenth_degree_latitude() {
        // 0.1 grados de latitud son ~6.9 millas sobre el mismo meridiano
        let a = GeoPoint::new(51.0, -0.5);
        let b = GeoPoint::new(51.1, -0.5);

        let d = a.distance_miles(&b);
        assert!(d > 6.8 && d < 7.0, "unexpected distance: {}", d);
    }
}
