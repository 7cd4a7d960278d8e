// src/services/budget_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{BudgetRepository, NewBudget},
    middleware::tenancy::TenantContext,
    models::{
        budget::{
            price_items, Budget, BudgetDetail, BudgetListQuery, BudgetStatus, ConversionResult,
            CreateBudgetRequest, UpdateBudgetRequest,
        },
        pagination::{Page, Pagination},
    },
    services::commission_service::CommissionService,
};

#[derive(Clone)]
pub struct BudgetService {
    repo: BudgetRepository,
    commission_service: CommissionService,
}

impl BudgetService {
    pub fn new(repo: BudgetRepository, commission_service: CommissionService) -> Self {
        Self { repo, commission_service }
    }

    fn not_found(budget_id: Uuid) -> AppError {
        AppError::ResourceNotFound(format!("Budget {}", budget_id))
    }

    // =========================================================================
    //  CRUD
    // =========================================================================

    pub async fn create_budget<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        user_id: Uuid,
        input: &CreateBudgetRequest,
    ) -> Result<Budget, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let status = input.initial_status()?;
        let (items, total_amount) = price_items(&input.items)?;

        let budget = self
            .repo
            .create_budget(
                executor,
                tenant_id,
                NewBudget {
                    customer_id: input.customer_id,
                    created_by_user_id: user_id,
                    status,
                    items: &items,
                    total_amount,
                    valid_until: input.valid_until,
                    notes: input.notes.as_deref(),
                },
            )
            .await?;

        tracing::info!(
            budget = %budget.budget_number,
            total = %budget.total_amount,
            "📝 Orçamento criado"
        );
        Ok(budget)
    }

    pub async fn list_budgets<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        query: &BudgetListQuery,
    ) -> Result<Page<Budget>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let pagination = Pagination::new(query.page, query.per_page)?;
        let mut conn = executor.acquire().await?;

        let total = self
            .repo
            .count_budgets(&mut *conn, tenant_id, query.status, query.customer_id)
            .await?;
        let data = self
            .repo
            .list_budgets(&mut *conn, tenant_id, query.status, query.customer_id, pagination)
            .await?;

        Ok(Page::new(data, pagination, total))
    }

    /// Orçamento com a comissão gerada na conversão, se houver.
    pub async fn get_budget<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        budget_id: Uuid,
    ) -> Result<BudgetDetail, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let budget = self
            .repo
            .find_by_id(&mut *conn, tenant_id, budget_id)
            .await?
            .ok_or_else(|| Self::not_found(budget_id))?;
        let commission = self
            .commission_service
            .find_for_budget(&mut *conn, TenantContext(tenant_id), budget_id)
            .await?;

        Ok(BudgetDetail { budget, commission })
    }

    pub async fn update_budget<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        budget_id: Uuid,
        input: &UpdateBudgetRequest,
    ) -> Result<Budget, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id_for_update(&mut *tx, tenant_id, budget_id)
            .await?
            .ok_or_else(|| Self::not_found(budget_id))?;
        current.ensure_mutable()?;

        let (items, total_amount) = match &input.items {
            Some(inputs) => price_items(inputs)?,
            None => (current.items.0.clone(), current.total_amount),
        };
        // Ausente mantém; `null` apaga
        let valid_until = match input.valid_until {
            Some(value) => value,
            None => current.valid_until,
        };
        let notes = match &input.notes {
            Some(value) => value.as_deref(),
            None => current.notes.as_deref(),
        };

        let updated = self
            .repo
            .update_content(&mut *tx, tenant_id, budget_id, &items, total_amount, valid_until, notes)
            .await?
            .ok_or_else(|| AppError::BudgetAlreadyConverted(current.budget_number.clone()))?;

        tx.commit().await?;
        Ok(updated)
    }

    pub async fn delete_budget<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        budget_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id_for_update(&mut *tx, tenant_id, budget_id)
            .await?
            .ok_or_else(|| Self::not_found(budget_id))?;
        current.ensure_mutable()?;

        if !self.repo.delete_budget(&mut *tx, tenant_id, budget_id).await? {
            return Err(AppError::BudgetAlreadyConverted(current.budget_number));
        }

        tx.commit().await?;
        tracing::info!(budget = %current.budget_number, "Orçamento removido");
        Ok(())
    }

    /// Transições manuais (draft -> sent -> accepted/rejected/expired).
    pub async fn change_budget_status<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        budget_id: Uuid,
        next: BudgetStatus,
    ) -> Result<Budget, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id_for_update(&mut *tx, tenant_id, budget_id)
            .await?
            .ok_or_else(|| Self::not_found(budget_id))?;
        current.ensure_mutable()?;
        current.status.ensure_transition(next)?;

        let updated = self
            .repo
            .update_status(&mut *tx, tenant_id, budget_id, current.status, next)
            .await?
            .ok_or_else(|| AppError::InvalidStateTransition {
                entity: "budget",
                from: current.status.as_str().to_string(),
                to: next.as_str().to_string(),
            })?;

        tx.commit().await?;

        tracing::info!(
            budget = %updated.budget_number,
            from = current.status.as_str(),
            to = next.as_str(),
            "Status do orçamento alterado"
        );
        Ok(updated)
    }

    // =========================================================================
    //  CONVERSÃO
    // =========================================================================

    /// Converte o orçamento e gera a comissão numa única transação.
    ///
    /// A linha do orçamento fica travada (`FOR UPDATE`) até o commit: uma
    /// segunda conversão simultânea espera, enxerga `converted` e recebe
    /// `BudgetAlreadyConverted`. Qualquer falha desfaz tudo, então nunca
    /// existe orçamento convertido sem a comissão que deveria ter.
    pub async fn convert_budget<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        budget_id: Uuid,
    ) -> Result<ConversionResult, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let budget = self
            .repo
            .find_by_id_for_update(&mut *tx, tenant_id, budget_id)
            .await?
            .ok_or_else(|| Self::not_found(budget_id))?;
        budget.ensure_convertible()?;

        // Comissão existente também conta como conversão feita
        if self
            .commission_service
            .find_for_budget(&mut *tx, TenantContext(tenant_id), budget_id)
            .await?
            .is_some()
        {
            return Err(AppError::BudgetAlreadyConverted(budget.budget_number));
        }

        let converted = self
            .repo
            .mark_converted(&mut *tx, tenant_id, budget_id)
            .await?
            .ok_or_else(|| AppError::BudgetAlreadyConverted(budget.budget_number.clone()))?;

        let commission = self
            .commission_service
            .create_for_conversion(&mut *tx, TenantContext(tenant_id), &converted)
            .await?;

        tx.commit().await?;

        tracing::info!(
            budget = %converted.budget_number,
            with_commission = commission.is_some(),
            "🔄 Orçamento convertido"
        );

        Ok(ConversionResult { budget: converted, commission })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::test_support::test_pool,
        db::CommissionRepository,
        models::{
            budget::BudgetItemInput,
            commission::{CommissionStatus, UpdateCommissionConfigRequest},
        },
    };
    use rust_decimal::Decimal;
    use sqlx::PgPool;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn services() -> (BudgetService, CommissionService) {
        let commissions = CommissionService::new(CommissionRepository::new());
        (BudgetService::new(BudgetRepository::new(), commissions.clone()), commissions)
    }

    fn request(status: BudgetStatus, unit_price: &str) -> CreateBudgetRequest {
        CreateBudgetRequest {
            customer_id: Uuid::new_v4(),
            status: Some(status),
            items: vec![BudgetItemInput {
                description: "Cirurgia ortopédica".into(),
                quantity: dec("1"),
                unit_price: dec(unit_price),
            }],
            valid_until: None,
            notes: None,
        }
    }

    async fn set_commission(pool: &PgPool, tenant: TenantContext, percentage: &str, is_active: bool) {
        let (_, commissions) = services();
        commissions
            .update_commission_config(
                pool,
                tenant,
                &UpdateCommissionConfigRequest {
                    commission_percentage: dec(percentage),
                    is_active,
                },
            )
            .await
            .unwrap();
    }

    async fn count_commissions(pool: &PgPool, budget_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM commissions WHERE budget_id = $1")
            .bind(budget_id)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn conversion_creates_pending_commission_from_snapshot() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let user = Uuid::new_v4();
        let (budgets, _) = services();
        set_commission(&pool, tenant, "5.00", true).await;

        let budget = budgets
            .create_budget(&pool, tenant, user, &request(BudgetStatus::Sent, "1000.00"))
            .await
            .unwrap();
        let result = budgets.convert_budget(&pool, tenant, budget.id).await.unwrap();

        assert_eq!(result.budget.status, BudgetStatus::Converted);
        assert!(result.budget.converted_at.is_some());

        let commission = result.commission.unwrap();
        assert_eq!(commission.status, CommissionStatus::Pending);
        assert_eq!(commission.user_id, user);
        assert_eq!(commission.budget_total, dec("1000.00"));
        assert_eq!(commission.commission_percentage, dec("5.00"));
        assert_eq!(commission.commission_amount, dec("50.00"));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn concurrent_conversions_produce_a_single_commission() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, _) = services();
        set_commission(&pool, tenant, "5.00", true).await;

        let budget = budgets
            .create_budget(&pool, tenant, Uuid::new_v4(), &request(BudgetStatus::Sent, "1000.00"))
            .await
            .unwrap();
        budgets
            .change_budget_status(&pool, tenant, budget.id, BudgetStatus::Accepted)
            .await
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = budgets.clone();
                let pool = pool.clone();
                let budget_id = budget.id;
                tokio::spawn(async move { service.convert_budget(&pool, tenant, budget_id).await })
            })
            .collect();

        let mut successes = 0;
        let mut conflicts = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(AppError::BudgetAlreadyConverted(_)) => conflicts += 1,
                Err(other) => panic!("erro inesperado: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 3);
        assert_eq!(count_commissions(&pool, budget.id).await, 1);
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn inactive_commission_converts_without_commission() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, _) = services();
        set_commission(&pool, tenant, "5.00", false).await;

        let budget = budgets
            .create_budget(&pool, tenant, Uuid::new_v4(), &request(BudgetStatus::Sent, "300.00"))
            .await
            .unwrap();
        let result = budgets.convert_budget(&pool, tenant, budget.id).await.unwrap();

        assert_eq!(result.budget.status, BudgetStatus::Converted);
        assert!(result.commission.is_none());
        assert_eq!(count_commissions(&pool, budget.id).await, 0);

        // Mesmo sem comissão, a reconversão continua bloqueada
        let err = budgets.convert_budget(&pool, tenant, budget.id).await.unwrap_err();
        assert!(matches!(err, AppError::BudgetAlreadyConverted(_)));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn config_change_after_conversion_keeps_commission() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, commissions) = services();
        set_commission(&pool, tenant, "5.00", true).await;

        let budget = budgets
            .create_budget(&pool, tenant, Uuid::new_v4(), &request(BudgetStatus::Sent, "1000.00"))
            .await
            .unwrap();
        let commission = budgets
            .convert_budget(&pool, tenant, budget.id)
            .await
            .unwrap()
            .commission
            .unwrap();

        set_commission(&pool, tenant, "10.00", true).await;

        let stored = commissions.get_commission(&pool, tenant, commission.id).await.unwrap();
        assert_eq!(stored.commission_percentage, dec("5.00"));
        assert_eq!(stored.commission_amount, dec("50.00"));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn draft_budget_cannot_be_converted() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, _) = services();

        let budget = budgets
            .create_budget(&pool, tenant, Uuid::new_v4(), &request(BudgetStatus::Draft, "10.00"))
            .await
            .unwrap();
        let err = budgets.convert_budget(&pool, tenant, budget.id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition { .. }));

        let detail = budgets.get_budget(&pool, tenant, budget.id).await.unwrap();
        assert_eq!(detail.budget.status, BudgetStatus::Draft);
        assert!(detail.commission.is_none());
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn converted_budget_is_frozen() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, _) = services();

        let budget = budgets
            .create_budget(&pool, tenant, Uuid::new_v4(), &request(BudgetStatus::Sent, "80.00"))
            .await
            .unwrap();
        budgets.convert_budget(&pool, tenant, budget.id).await.unwrap();

        let update = UpdateBudgetRequest {
            notes: Some(Some("alterado".into())),
            ..Default::default()
        };
        let err = budgets.update_budget(&pool, tenant, budget.id, &update).await.unwrap_err();
        assert!(matches!(err, AppError::BudgetAlreadyConverted(_)));

        let err = budgets.delete_budget(&pool, tenant, budget.id).await.unwrap_err();
        assert!(matches!(err, AppError::BudgetAlreadyConverted(_)));

        let err = budgets
            .change_budget_status(&pool, tenant, budget.id, BudgetStatus::Rejected)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BudgetAlreadyConverted(_)));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn budget_numbers_are_sequential_per_tenant() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, _) = services();

        let first = budgets
            .create_budget(&pool, tenant, Uuid::new_v4(), &request(BudgetStatus::Draft, "1.00"))
            .await
            .unwrap();
        let second = budgets
            .create_budget(&pool, tenant, Uuid::new_v4(), &request(BudgetStatus::Draft, "1.00"))
            .await
            .unwrap();
        assert_eq!(first.budget_number, "ORC-000001");
        assert_eq!(second.budget_number, "ORC-000002");

        let other = budgets
            .create_budget(&pool, TenantContext(Uuid::new_v4()), Uuid::new_v4(), &request(BudgetStatus::Draft, "1.00"))
            .await
            .unwrap();
        assert_eq!(other.budget_number, "ORC-000001");
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn update_reprices_items_and_keeps_missing_fields() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, _) = services();

        let mut input = request(BudgetStatus::Draft, "100.00");
        input.notes = Some("primeira versão".into());
        let budget = budgets.create_budget(&pool, tenant, Uuid::new_v4(), &input).await.unwrap();

        let update = UpdateBudgetRequest {
            items: Some(vec![BudgetItemInput {
                description: "Consulta".into(),
                quantity: dec("2"),
                unit_price: dec("75.50"),
            }]),
            valid_until: None,
            notes: None,
        };
        let updated = budgets.update_budget(&pool, tenant, budget.id, &update).await.unwrap();
        assert_eq!(updated.total_amount, dec("151.00"));
        assert_eq!(updated.notes.as_deref(), Some("primeira versão"));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn explicit_null_clears_notes_and_validity() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let (budgets, _) = services();

        let mut input = request(BudgetStatus::Draft, "100.00");
        input.notes = Some("retorno em 30 dias".into());
        input.valid_until = chrono::NaiveDate::from_ymd_opt(2025, 12, 31);
        let budget = budgets.create_budget(&pool, tenant, Uuid::new_v4(), &input).await.unwrap();

        let update: UpdateBudgetRequest =
            serde_json::from_str(r#"{"validUntil":null,"notes":null}"#).unwrap();
        let updated = budgets.update_budget(&pool, tenant, budget.id, &update).await.unwrap();
        assert!(updated.valid_until.is_none());
        assert!(updated.notes.is_none());
        assert_eq!(updated.total_amount, dec("100.00"));
    }
}
