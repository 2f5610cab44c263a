//! Repositorio de drops
//!
//! Acceso a la tabla drops. Los drops nunca se borran físicamente: el
//! retiro los desliga de su ruta y los deja en cancelled.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::drop::RouteDrop;
use crate::utils::errors::AppResult;

/// Datos para crear un drop
#[derive(Debug, Clone)]
pub struct NewDrop {
    pub route_id: Uuid,
    pub job_id: Option<Uuid>,
    pub customer_id: Uuid,
    pub pickup_address: String,
    pub delivery_address: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub quoted_price: Decimal,
    pub special_instructions: Option<String>,
    pub position: i32,
}

pub struct DropRepository {
    pool: PgPool,
}

impl DropRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserta un drop reservado en la ruta
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new_drop: &NewDrop,
    ) -> AppResult<RouteDrop> {
        let drop = sqlx::query_as::<_, RouteDrop>(
            r#"
            INSERT INTO drops (
                id, route_id, job_id, customer_id, pickup_address, delivery_address,
                window_start, window_end, status, quoted_price, special_instructions,
                position, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'booked', $9, $10, $11, $12, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_drop.route_id)
        .bind(new_drop.job_id)
        .bind(new_drop.customer_id)
        .bind(&new_drop.pickup_address)
        .bind(&new_drop.delivery_address)
        .bind(new_drop.window_start)
        .bind(new_drop.window_end)
        .bind(new_drop.quoted_price)
        .bind(&new_drop.special_instructions)
        .bind(new_drop.position)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(drop)
    }

    /// Drops de una ruta en orden de parada
    pub async fn find_by_route(&self, route_id: Uuid) -> AppResult<Vec<RouteDrop>> {
        let drops = sqlx::query_as::<_, RouteDrop>(
            "SELECT * FROM drops WHERE route_id = $1 ORDER BY position ASC",
        )
        .bind(route_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(drops)
    }

    /// Carga y bloquea los drops de una ruta dentro de la transacción
    pub async fn find_by_route_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        route_id: Uuid,
    ) -> AppResult<Vec<RouteDrop>> {
        let drops = sqlx::query_as::<_, RouteDrop>(
            "SELECT * FROM drops WHERE route_id = $1 ORDER BY position ASC FOR UPDATE",
        )
        .bind(route_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(drops)
    }

    /// Carga y bloquea un drop concreto dentro de la transacción
    ///
    /// Las guardas de entregado/pertenencia se evalúan sobre esta fila
    /// bloqueada, no sobre una lectura previa.
    pub async fn find_by_id_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Option<RouteDrop>> {
        let drop = sqlx::query_as::<_, RouteDrop>("SELECT * FROM drops WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(drop)
    }

    /// Desliga el drop de su ruta y lo deja cancelado
    pub async fn detach_and_cancel_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<RouteDrop> {
        let drop = sqlx::query_as::<_, RouteDrop>(
            r#"
            UPDATE drops
            SET route_id = NULL, status = 'cancelled', updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(drop)
    }

    /// Desliga y regresa a pending los drops no entregados de una ruta
    /// cancelada
    pub async fn reset_to_pending_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ids: &[Uuid],
    ) -> AppResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE drops
            SET route_id = NULL, status = 'pending', updated_at = $2
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Marca el drop como entregado y registra el importe liquidado
    pub async fn mark_delivered_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        delivered_at: DateTime<Utc>,
        settled_amount: Option<Decimal>,
    ) -> AppResult<RouteDrop> {
        let drop = sqlx::query_as::<_, RouteDrop>(
            r#"
            UPDATE drops
            SET status = 'delivered', delivered_at = $2,
                settled_amount = COALESCE($3, settled_amount), updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(delivered_at)
        .bind(settled_amount)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(drop)
    }
}
