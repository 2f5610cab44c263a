//! Repositorio de rutas
//!
//! Acceso a la tabla routes. Las lecturas que preceden a una mutación se
//! hacen con FOR UPDATE dentro de la transacción de la operación para que
//! las guardas de ciclo de vida decidan sobre el estado que realmente se
//! va a mutar.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::route::{Route, RouteStatus};
use crate::utils::errors::AppResult;

/// Datos para crear una ruta
#[derive(Debug, Clone)]
pub struct NewRoute {
    pub driver_id: Uuid,
    pub total_drops: i32,
    pub total_distance_miles: Option<f64>,
}

pub struct RouteRepository {
    pool: PgPool,
}

impl RouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserta la ruta en estado planned; la asignación es una transición aparte
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        new_route: &NewRoute,
    ) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            INSERT INTO routes (
                id, driver_id, status, total_drops, completed_drops, total_earnings,
                performance_multiplier, bonus_total, penalty_total, total_distance_miles,
                admin_override, created_at, updated_at
            )
            VALUES ($1, $2, 'planned', $3, 0, 0, 1.0, 0, 0, $4, false, $5, $5)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new_route.driver_id)
        .bind(new_route.total_drops)
        .bind(new_route.total_distance_miles)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(route)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(route)
    }

    /// Carga y bloquea la ruta dentro de la transacción de la operación
    pub async fn find_by_id_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Option<Route>> {
        let route = sqlx::query_as::<_, Route>("SELECT * FROM routes WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await?;

        Ok(route)
    }

    /// Rutas activas (assigned o in_progress) con filtros opcionales
    pub async fn find_active(
        &self,
        status: Option<RouteStatus>,
        driver_id: Option<Uuid>,
    ) -> AppResult<Vec<Route>> {
        let routes = sqlx::query_as::<_, Route>(
            r#"
            SELECT * FROM routes
            WHERE status IN ('assigned', 'in_progress')
              AND ($1::route_status IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR driver_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(status)
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(routes)
    }

    /// Transición de estado con sellado opcional de inicio/fin
    pub async fn update_status_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: RouteStatus,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET status = $2,
                started_at = COALESCE($3, started_at),
                ended_at = COALESCE($4, ended_at),
                updated_at = $5
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(started_at)
        .bind(ended_at)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(route)
    }

    /// Cierra la ruta cancelada con su nota administrativa completa
    pub async fn close_cancelled_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        ended_at: DateTime<Utc>,
        admin_notes: &str,
    ) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET status = 'closed', ended_at = $2, admin_override = true,
                admin_notes = $3, updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(ended_at)
        .bind(admin_notes)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(route)
    }

    /// Marca la ruta como modificada por administración y ajusta el
    /// contador de drops ligados
    pub async fn set_admin_modified_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        admin_notes: &str,
        total_drops: i32,
    ) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET admin_override = true, admin_notes = $2, total_drops = $3, updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(admin_notes)
        .bind(total_drops)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(route)
    }

    /// Suma una entrega al contador materializado de la ruta
    pub async fn increment_completed_drops_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET completed_drops = completed_drops + 1, updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(route)
    }

    /// Liquida las ganancias al completar la ruta
    pub async fn settle_earnings_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        total_earnings: Decimal,
    ) -> AppResult<Route> {
        let route = sqlx::query_as::<_, Route>(
            r#"
            UPDATE routes
            SET total_earnings = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(total_earnings)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await?;

        Ok(route)
    }

    /// Write-back del agregado de ganancias fuera de transacción (healing)
    pub async fn update_total_earnings(&self, id: Uuid, total_earnings: Decimal) -> AppResult<()> {
        sqlx::query("UPDATE routes SET total_earnings = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(total_earnings)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
