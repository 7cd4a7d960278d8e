// src/db/pricing_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::pricing::{CreatePriceConfigRequest, PriceConfig, PriceQuery},
};

#[derive(Clone, Default)]
pub struct PricingRepository;

impl PricingRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create_price_config<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: &CreatePriceConfigRequest,
    ) -> Result<PriceConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, PriceConfig>(
            r#"
            INSERT INTO price_configs (
                tenant_id, appointment_type, specialty, professional_id, price_id, is_default
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.appointment_type)
        .bind(input.specialty.as_deref())
        .bind(input.professional_id)
        .bind(&input.price_id)
        .bind(input.is_default)
        .fetch_one(executor)
        .await
        // O índice parcial garante um único padrão por tenant
        .map_err(|e| map_unique_violation(e, || AppError::DefaultPriceAlreadyExists))
    }

    pub async fn list_price_configs<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Vec<PriceConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let configs = sqlx::query_as::<_, PriceConfig>(
            r#"
            SELECT * FROM price_configs
            WHERE tenant_id = $1
            ORDER BY is_default DESC, created_at DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(executor)
        .await?;

        Ok(configs)
    }

    /// Retorna `true` se alguma linha foi removida.
    pub async fn delete_price_config<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        config_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM price_configs WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(config_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Busca numa única query todas as linhas que podem casar com alguma
    /// regra de prioridade (mais novas primeiro). A escolha fica no serviço.
    pub async fn find_candidates<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        query: &PriceQuery,
    ) -> Result<Vec<PriceConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let candidates = sqlx::query_as::<_, PriceConfig>(
            r#"
            SELECT * FROM price_configs
            WHERE tenant_id = $1
              AND (
                    ($2::uuid IS NOT NULL AND professional_id = $2)
                 OR ($3::text IS NOT NULL AND specialty = $3)
                 OR ($4::appointment_type IS NOT NULL AND appointment_type = $4)
                 OR is_default
              )
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(query.professional_id)
        .bind(query.specialty.as_deref())
        .bind(query.appointment_type)
        .fetch_all(executor)
        .await?;

        Ok(candidates)
    }
}
