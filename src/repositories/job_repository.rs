//! Repositorio de jobs
//!
//! Acceso a la tabla jobs. Las mutaciones que forman parte de una
//! operación de ciclo de vida reciben la transacción del servicio para
//! que toda la operación sea una sola unidad atómica.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::job::Job;
use crate::utils::errors::AppResult;

pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool de pendientes: jobs confirmados sin ruta asignada
    pub async fn find_pending(&self) -> AppResult<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            r#"
            SELECT * FROM jobs
            WHERE status = 'confirmed' AND route_id IS NULL
            ORDER BY scheduled_at ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(jobs)
    }

    /// Carga y bloquea los jobs seleccionados para crear una ruta
    pub async fn find_by_ids_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ids: &[Uuid],
    ) -> AppResult<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE id = ANY($1) ORDER BY scheduled_at ASC FOR UPDATE",
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await?;

        Ok(jobs)
    }

    /// Carga y bloquea los jobs ligados a una ruta
    pub async fn find_by_route_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        route_id: Uuid,
    ) -> AppResult<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE route_id = $1 ORDER BY created_at ASC FOR UPDATE",
        )
        .bind(route_id)
        .fetch_all(&mut **tx)
        .await?;

        Ok(jobs)
    }

    /// Liga los jobs a una ruta recién creada
    pub async fn mark_routed_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_ids: &[Uuid],
        route_id: Uuid,
        driver_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'routed', route_id = $2, driver_id = $3, updated_at = $4
            WHERE id = ANY($1)
            "#,
        )
        .bind(job_ids)
        .bind(route_id)
        .bind(driver_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Devuelve al pool todos los jobs de una ruta cancelada
    ///
    /// Limpiar route_id siempre regresa el estado a confirmed: el job
    /// vuelve a ser visible para el siguiente pase de clustering.
    pub async fn release_from_route_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        route_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'confirmed', route_id = NULL, driver_id = NULL, updated_at = $2
            WHERE route_id = $1
            "#,
        )
        .bind(route_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Devuelve un job concreto al pool (retiro de drop con job asociado)
    pub async fn release_one_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = 'confirmed', route_id = NULL, driver_id = NULL, updated_at = $2
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }

    /// Cierra los jobs de una ruta completada
    pub async fn complete_for_route_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        route_id: Uuid,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', updated_at = $2 WHERE route_id = $1",
        )
        .bind(route_id)
        .bind(Utc::now())
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected())
    }
}
