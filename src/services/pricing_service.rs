// src/services/pricing_service.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::PricingRepository,
    middleware::tenancy::TenantContext,
    models::pricing::{pick_price, CreatePriceConfigRequest, PriceConfig, PriceQuery, PriceSuggestion},
};

#[derive(Clone)]
pub struct PricingService {
    repo: PricingRepository,
}

impl PricingService {
    pub fn new(repo: PricingRepository) -> Self {
        Self { repo }
    }

    /// Sugere o preço de um atendimento. Ausência de regra não é erro:
    /// devolve `None` e o chamador deixa o preço em branco.
    pub async fn resolve_price<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        query: &PriceQuery,
    ) -> Result<Option<PriceSuggestion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let candidates = self.repo.find_candidates(executor, tenant_id, query).await?;
        let suggestion = pick_price(&candidates, query);

        match &suggestion {
            Some(s) => tracing::debug!(
                price_id = %s.price_id,
                source = ?s.source,
                "preço sugerido"
            ),
            None => tracing::debug!(?query, "nenhuma regra de preço aplicável"),
        }

        Ok(suggestion)
    }

    pub async fn create_price_config<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        input: &CreatePriceConfigRequest,
    ) -> Result<PriceConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        input.ensure_has_target()?;

        let config = self.repo.create_price_config(executor, tenant_id, input).await?;
        tracing::info!(config_id = %config.id, is_default = config.is_default, "💲 Configuração de preço criada");
        Ok(config)
    }

    pub async fn list_price_configs<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
    ) -> Result<Vec<PriceConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.list_price_configs(executor, tenant_id).await
    }

    pub async fn delete_price_config<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        config_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !self.repo.delete_price_config(executor, tenant_id, config_id).await? {
            return Err(AppError::ResourceNotFound(format!("Price config {}", config_id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{common::test_support::test_pool, models::pricing::{AppointmentType, PriceSource}};

    fn manual(price_id: &str) -> CreatePriceConfigRequest {
        CreatePriceConfigRequest {
            appointment_type: None,
            specialty: None,
            professional_id: None,
            price_id: price_id.to_string(),
            is_default: false,
        }
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn professional_price_wins_over_specialty_in_database() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let service = PricingService::new(PricingRepository::new());
        let professional = Uuid::new_v4();

        service
            .create_price_config(&pool, tenant, &CreatePriceConfigRequest { professional_id: Some(professional), ..manual("A") })
            .await
            .unwrap();
        service
            .create_price_config(&pool, tenant, &CreatePriceConfigRequest { specialty: Some("Cirurgia".into()), ..manual("B") })
            .await
            .unwrap();

        let query = PriceQuery {
            professional_id: Some(professional),
            specialty: Some("Cirurgia".into()),
            ..Default::default()
        };
        let suggestion = service.resolve_price(&pool, tenant, &query).await.unwrap().unwrap();
        assert_eq!(suggestion.price_id, "A");
        assert_eq!(suggestion.source, PriceSource::Professional);
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn default_row_answers_when_type_has_no_price() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let service = PricingService::new(PricingRepository::new());

        service
            .create_price_config(&pool, tenant, &CreatePriceConfigRequest { is_default: true, ..manual("DEFAULT") })
            .await
            .unwrap();

        let query = PriceQuery {
            appointment_type: Some(AppointmentType::Consultation),
            ..Default::default()
        };
        let suggestion = service.resolve_price(&pool, tenant, &query).await.unwrap().unwrap();
        assert_eq!(suggestion.price_id, "DEFAULT");
        assert_eq!(suggestion.source, PriceSource::Default);
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn second_default_is_a_conflict_and_tenants_are_isolated() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let service = PricingService::new(PricingRepository::new());
        let default = CreatePriceConfigRequest { is_default: true, ..manual("D1") };

        service.create_price_config(&pool, tenant, &default).await.unwrap();
        let err = service.create_price_config(&pool, tenant, &default).await.unwrap_err();
        assert!(matches!(err, AppError::DefaultPriceAlreadyExists));

        // Outra clínica não enxerga nem conflita com o padrão acima
        let other = TenantContext(Uuid::new_v4());
        assert!(service.resolve_price(&pool, other, &PriceQuery::default()).await.unwrap().is_none());
        service.create_price_config(&pool, other, &default).await.unwrap();
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn deleting_unknown_config_is_not_found() {
        let pool = test_pool().await;
        let service = PricingService::new(PricingRepository::new());
        let err = service
            .delete_price_config(&pool, TenantContext(Uuid::new_v4()), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }
}
