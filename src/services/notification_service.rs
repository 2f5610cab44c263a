//! Servicio de notificaciones de despacho
//!
//! Publica eventos de dominio hacia los clientes de conductores vía Redis
//! pub/sub. El despacho es fire-and-forget: un fallo de publicación se
//! registra y jamás bloquea ni revierte la operación que lo originó.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use redis::aio::ConnectionManager;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Tipo de evento de despacho
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchEventKind {
    RouteAssigned,
    RouteCancelled,
    DropAdded,
    DropRemoved,
}

/// Evento publicado hacia los clientes
///
/// `action_hint` lleva instrucciones accionables por máquina: la
/// cancelación envía "remove_route" para que el cliente del conductor
/// descarte su estado local de la ruta.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchEvent {
    pub event: DispatchEventKind,
    pub route_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver_id: Option<Uuid>,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_drops: Option<i32>,
}

impl DispatchEvent {
    pub fn route_assigned(route_id: Uuid, driver_id: Uuid, reason: &str) -> Self {
        Self {
            event: DispatchEventKind::RouteAssigned,
            route_id,
            affected_id: None,
            driver_id: Some(driver_id),
            reason: reason.to_string(),
            timestamp: Utc::now(),
            action_hint: None,
            remaining_drops: None,
        }
    }

    pub fn route_cancelled(route_id: Uuid, driver_id: Option<Uuid>, reason: &str) -> Self {
        Self {
            event: DispatchEventKind::RouteCancelled,
            route_id,
            affected_id: None,
            driver_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
            action_hint: Some("remove_route".to_string()),
            remaining_drops: None,
        }
    }

    pub fn drop_added(route_id: Uuid, drop_id: Uuid, driver_id: Option<Uuid>, reason: &str) -> Self {
        Self {
            event: DispatchEventKind::DropAdded,
            route_id,
            affected_id: Some(drop_id),
            driver_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
            action_hint: None,
            remaining_drops: None,
        }
    }

    pub fn drop_removed(
        route_id: Uuid,
        drop_id: Uuid,
        driver_id: Option<Uuid>,
        reason: &str,
        remaining_drops: i32,
    ) -> Self {
        Self {
            event: DispatchEventKind::DropRemoved,
            route_id,
            affected_id: Some(drop_id),
            driver_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
            action_hint: None,
            remaining_drops: Some(remaining_drops),
        }
    }
}

/// Canal de salida de eventos de despacho
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Publica el evento. Nunca devuelve error: los fallos se registran.
    async fn notify(&self, event: &DispatchEvent);
}

/// Notificador Redis pub/sub con connection manager
#[derive(Clone)]
pub struct RedisNotifier {
    manager: ConnectionManager,
    channel_prefix: String,
}

impl RedisNotifier {
    /// Crear nuevo notificador Redis
    pub async fn new(redis_url: &str, channel_prefix: &str) -> anyhow::Result<Self> {
        info!("🔗 Conectando notificador a Redis: {}", redis_url);

        let client = redis::Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;

        // Test de conexión usando un comando simple
        let mut conn = manager.clone();
        let _: () = redis::cmd("PING").query_async(&mut conn).await?;

        info!("✅ Notificador Redis conectado exitosamente");

        Ok(Self {
            manager,
            channel_prefix: channel_prefix.to_string(),
        })
    }

    /// Canal privado del conductor
    fn driver_channel(&self, driver_id: Uuid) -> String {
        format!("{}:driver:{}", self.channel_prefix, driver_id)
    }

    /// Canal firehose con todos los eventos de despacho
    fn firehose_channel(&self) -> String {
        format!("{}:all", self.channel_prefix)
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn notify(&self, event: &DispatchEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("⚠️ Evento de despacho no serializable, se descarta: {}", e);
                return;
            }
        };

        let mut channels = vec![self.firehose_channel()];
        if let Some(driver_id) = event.driver_id {
            channels.push(self.driver_channel(driver_id));
        }

        let publishes = channels.into_iter().map(|channel| {
            let mut conn = self.manager.clone();
            let payload = payload.clone();
            async move {
                let result: redis::RedisResult<i64> = redis::cmd("PUBLISH")
                    .arg(&channel)
                    .arg(&payload)
                    .query_async(&mut conn)
                    .await;
                (channel, result)
            }
        });

        for (channel, result) in join_all(publishes).await {
            match result {
                Ok(receivers) => {
                    debug!("📣 Evento {:?} publicado en {} ({} receptores)", event.event, channel, receivers);
                }
                Err(e) => {
                    warn!("⚠️ Error publicando evento {:?} en {}: {}", event.event, channel, e);
                }
            }
        }
    }
}

/// Notificador nulo para tests y para arranque sin Redis disponible
#[derive(Debug, Default, Clone)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, event: &DispatchEvent) {
        debug!("🔇 Evento {:?} descartado (notificador no-op)", event.event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds_serialize_kebab_case() {
        let event = DispatchEvent::route_cancelled(Uuid::from_u128(1), None, "dup");
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "route-cancelled");
        assert_eq!(json["action_hint"], "remove_route");
        assert!(json.get("remaining_drops").is_none());
        assert!(json.get("driver_id").is_none());
    }

    #[test]
    fn test_drop_removed_carries_remaining_count() {
        let event = DispatchEvent::drop_removed(
            Uuid::from_u128(1),
            Uuid::from_u128(2),
            Some(Uuid::from_u128(3)),
            "customer cancelled",
            4,
        );
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["event"], "drop-removed");
        assert_eq!(json["remaining_drops"], 4);
        assert_eq!(json["affected_id"], Uuid::from_u128(2).to_string());
        assert!(json.get("action_hint").is_none());
    }

    #[test]
    fn test_route_assigned_targets_the_driver() {
        let event =
            DispatchEvent::route_assigned(Uuid::from_u128(9), Uuid::from_u128(7), "new route");
        assert_eq!(event.driver_id, Some(Uuid::from_u128(7)));
        assert_eq!(event.event, DispatchEventKind::RouteAssigned);
    }

    #[tokio::test]
    async fn test_noop_notifier_swallows_events() {
        let notifier = NoopNotifier;
        let event = DispatchEvent::route_assigned(Uuid::from_u128(1), Uuid::from_u128(2), "x");
        notifier.notify(&event).await;
    }
}
