//! Configuración de variables de entorno
//!
//! Este módulo maneja la configuración del entorno y los parámetros de
//! negocio del motor de despacho.

use std::env;

use rust_decimal::Decimal;

/// Configuración del entorno
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub environment: String,
    pub port: u16,
    pub host: String,
    pub cors_origins: Vec<String>,
    /// Techo de ganancias por ruta; ningún total almacenado puede superarlo
    pub earnings_ceiling: Decimal,
    /// Fracción del valor agrupado estimada como ahorro multi-drop
    pub multi_drop_savings_rate: Decimal,
    /// Ancho en horas de la ventana de entrega derivada de la agenda
    pub drop_window_hours: i64,
    /// Prefijo de los canales Redis de eventos de despacho
    pub event_channel_prefix: String,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            port: env::var("PORT")
                .expect("PORT must be set")
                .parse()
                .expect("PORT must be a valid number"),
            host: env::var("HOST").expect("HOST must be set"),
            cors_origins: env::var("CORS_ORIGINS")
                .expect("CORS_ORIGINS must be set")
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            earnings_ceiling: env::var("EARNINGS_CEILING")
                .ok()
                .map(|v| v.parse().expect("EARNINGS_CEILING must be a valid decimal"))
                .unwrap_or_else(|| Decimal::from(1_000_000)),
            multi_drop_savings_rate: env::var("MULTI_DROP_SAVINGS_RATE")
                .ok()
                .map(|v| {
                    v.parse()
                        .expect("MULTI_DROP_SAVINGS_RATE must be a valid decimal")
                })
                .unwrap_or_else(|| Decimal::new(15, 2)),
            drop_window_hours: env::var("DROP_WINDOW_HOURS")
                .ok()
                .map(|v| v.parse().expect("DROP_WINDOW_HOURS must be a valid number"))
                .unwrap_or(4),
            event_channel_prefix: env::var("EVENT_CHANNEL_PREFIX")
                .unwrap_or_else(|_| "dispatch:events".to_string()),
        }
    }
}

impl EnvironmentConfig {
    /// Verificar si estamos en modo desarrollo
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    /// Verificar si estamos en modo producción
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Obtener la URL del servidor
    pub fn server_url(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> EnvironmentConfig {
        EnvironmentConfig {
            environment: "test".to_string(),
            port: 3000,
            host: "127.0.0.1".to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            earnings_ceiling: Decimal::from(1_000_000),
            multi_drop_savings_rate: Decimal::new(15, 2),
            drop_window_hours: 4,
            event_channel_prefix: "dispatch:events".to_string(),
        }
    }

    #[test]
    fn test_server_url() {
        let config = test_config();
        assert_eq!(config.server_url(), "127.0.0.1:3000");
    }

    #[test]
    fn test_environment_flags() {
        let mut config = test_config();
        assert!(!config.is_production());

        config.environment = "production".to_string();
        assert!(config.is_production());
        assert!(!config.is_development());
    }
}
