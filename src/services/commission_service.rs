// src/services/commission_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, PgConnection, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::CommissionRepository,
    middleware::tenancy::TenantContext,
    models::{
        budget::Budget,
        commission::{
            CancelCommissionRequest, Commission, CommissionConfig, CommissionListQuery,
            CommissionSnapshot, CommissionStatus, CommissionStatusTotal, CommissionSummary,
            MarkPaidRequest, UpdateCommissionConfigRequest,
        },
        pagination::{Page, Pagination},
    },
};

#[derive(Clone)]
pub struct CommissionService {
    repo: CommissionRepository,
}

impl CommissionService {
    pub fn new(repo: CommissionRepository) -> Self {
        Self { repo }
    }

    fn not_found(commission_id: Uuid) -> AppError {
        AppError::ResourceNotFound(format!("Commission {}", commission_id))
    }

    // =========================================================================
    //  CÁLCULO NA CONVERSÃO
    // =========================================================================

    /// Chamado dentro da transação de conversão do orçamento. Lê a
    /// configuração no mesmo instante e grava a comissão pendente com os
    /// valores copiados. Comissão desativada (ou sem configuração) não gera
    /// nada e não é erro.
    pub async fn create_for_conversion(
        &self,
        conn: &mut PgConnection,
        TenantContext(tenant_id): TenantContext,
        budget: &Budget,
    ) -> Result<Option<Commission>, AppError> {
        let config = self.repo.get_config(&mut *conn, tenant_id).await?;

        let config = match config {
            Some(cfg) if cfg.is_active => cfg,
            _ => {
                tracing::info!(
                    budget = %budget.budget_number,
                    "Comissão desativada: conversão sem comissão"
                );
                return Ok(None);
            }
        };

        let snapshot = CommissionSnapshot::capture(
            budget.id,
            budget.created_by_user_id,
            budget.total_amount,
            config.commission_percentage,
        );

        let commission = self
            .repo
            .create_commission(&mut *conn, tenant_id, &budget.budget_number, &snapshot)
            .await?;

        tracing::info!(
            budget = %budget.budget_number,
            commission_id = %commission.id,
            amount = %commission.commission_amount,
            "💰 Comissão gerada"
        );

        Ok(Some(commission))
    }

    pub async fn find_for_budget<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        budget_id: Uuid,
    ) -> Result<Option<Commission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo.find_by_budget(executor, tenant_id, budget_id).await
    }

    // =========================================================================
    //  TRANSIÇÕES DE STATUS
    // =========================================================================

    /// pending -> paid. Pagar duas vezes é rejeitado.
    pub async fn mark_paid<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        commission_id: Uuid,
        input: &MarkPaidRequest,
    ) -> Result<Commission, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id_for_update(&mut *tx, tenant_id, commission_id)
            .await?
            .ok_or_else(|| Self::not_found(commission_id))?;
        current.status.ensure_pending()?;

        let paid = self
            .repo
            .mark_paid(
                &mut *tx,
                tenant_id,
                commission_id,
                input.payment_reference.as_deref(),
                input.notes.as_deref(),
            )
            .await?
            .ok_or_else(|| AppError::CommissionNotPending(current.status.as_str().to_string()))?;

        tx.commit().await?;

        tracing::info!(commission_id = %paid.id, "✅ Comissão paga");
        Ok(paid)
    }

    /// pending -> cancelled.
    pub async fn cancel_commission<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        commission_id: Uuid,
        input: &CancelCommissionRequest,
    ) -> Result<Commission, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id_for_update(&mut *tx, tenant_id, commission_id)
            .await?
            .ok_or_else(|| Self::not_found(commission_id))?;
        current.status.ensure_pending()?;

        let cancelled = self
            .repo
            .cancel(&mut *tx, tenant_id, commission_id, input.notes.as_deref())
            .await?
            .ok_or_else(|| AppError::CommissionNotPending(current.status.as_str().to_string()))?;

        tx.commit().await?;

        tracing::info!(commission_id = %cancelled.id, "Comissão cancelada");
        Ok(cancelled)
    }

    // =========================================================================
    //  CONSULTAS
    // =========================================================================

    pub async fn get_commission<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        commission_id: Uuid,
    ) -> Result<Commission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, tenant_id, commission_id)
            .await?
            .ok_or_else(|| Self::not_found(commission_id))
    }

    pub async fn list_commissions<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        query: &CommissionListQuery,
    ) -> Result<Page<Commission>, AppError>
    where
        E: Acquire<'e, Database = Postgres>,
    {
        let pagination = Pagination::new(query.page, query.per_page)?;
        let mut conn = executor.acquire().await?;

        let total = self
            .repo
            .count_commissions(&mut *conn, tenant_id, query.status, query.user_id)
            .await?;
        let data = self
            .repo
            .list_commissions(&mut *conn, tenant_id, query.status, query.user_id, pagination)
            .await?;

        Ok(Page::new(data, pagination, total))
    }

    /// Totais por status; status sem comissões aparecem zerados.
    pub async fn commission_summary<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        user_id: Option<Uuid>,
    ) -> Result<CommissionSummary, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = self.repo.totals_by_status(executor, tenant_id, user_id).await?;
        Ok(build_summary(user_id, &rows))
    }

    // =========================================================================
    //  CONFIGURAÇÃO
    // =========================================================================

    pub async fn get_commission_config<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
    ) -> Result<CommissionConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = self.repo.get_config(executor, tenant_id).await?;
        Ok(config.unwrap_or_else(|| CommissionConfig::inactive(tenant_id)))
    }

    /// Alterar a configuração nunca mexe em comissões já geradas.
    pub async fn update_commission_config<'e, E>(
        &self,
        executor: E,
        TenantContext(tenant_id): TenantContext,
        input: &UpdateCommissionConfigRequest,
    ) -> Result<CommissionConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = self
            .repo
            .upsert_config(executor, tenant_id, input.commission_percentage, input.is_active)
            .await?;

        tracing::info!(
            percentage = %config.commission_percentage,
            is_active = config.is_active,
            "Configuração de comissão atualizada"
        );
        Ok(config)
    }
}

fn build_summary(
    user_id: Option<Uuid>,
    rows: &[(CommissionStatus, i64, Decimal)],
) -> CommissionSummary {
    let by_status = [
        CommissionStatus::Pending,
        CommissionStatus::Paid,
        CommissionStatus::Cancelled,
    ]
    .into_iter()
    .map(|status| {
        let (count, total_amount) = rows
            .iter()
            .find(|(s, _, _)| *s == status)
            .map(|(_, count, total)| (*count, *total))
            .unwrap_or((0, Decimal::ZERO));
        CommissionStatusTotal { status, count, total_amount }
    })
    .collect();

    CommissionSummary { user_id, by_status }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        common::test_support::test_pool,
        db::{BudgetRepository, NewBudget},
        models::budget::BudgetStatus,
    };
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn summary_lists_every_status_even_without_rows() {
        let rows = vec![(CommissionStatus::Paid, 2, dec("75.50"))];
        let summary = build_summary(None, &rows);

        assert_eq!(summary.by_status.len(), 3);
        assert_eq!(summary.by_status[0].status, CommissionStatus::Pending);
        assert_eq!(summary.by_status[0].count, 0);
        assert_eq!(summary.by_status[1].count, 2);
        assert_eq!(summary.by_status[1].total_amount, dec("75.50"));
        assert_eq!(summary.by_status[2].total_amount, Decimal::ZERO);
    }

    async fn seed_commission(pool: &sqlx::PgPool, TenantContext(tenant): TenantContext) -> Commission {
        let budget = BudgetRepository::new()
            .create_budget(
                pool,
                tenant,
                NewBudget {
                    customer_id: Uuid::new_v4(),
                    created_by_user_id: Uuid::new_v4(),
                    status: BudgetStatus::Sent,
                    items: &[],
                    total_amount: dec("200.00"),
                    valid_until: None,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let snapshot = CommissionSnapshot::capture(budget.id, budget.created_by_user_id, dec("200.00"), dec("10"));
        CommissionRepository::new()
            .create_commission(pool, tenant, &budget.budget_number, &snapshot)
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn paying_twice_is_rejected() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let service = CommissionService::new(CommissionRepository::new());
        let commission = seed_commission(&pool, tenant).await;

        let request = MarkPaidRequest {
            payment_reference: Some("PIX-001".into()),
            notes: None,
        };
        let paid = service.mark_paid(&pool, tenant, commission.id, &request).await.unwrap();
        assert_eq!(paid.status, CommissionStatus::Paid);
        assert!(paid.paid_at.is_some());
        assert_eq!(paid.payment_reference.as_deref(), Some("PIX-001"));

        let err = service.mark_paid(&pool, tenant, commission.id, &request).await.unwrap_err();
        assert!(matches!(err, AppError::CommissionNotPending(s) if s == "paid"));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn cancelled_commission_cannot_be_paid() {
        let pool = test_pool().await;
        let tenant = TenantContext(Uuid::new_v4());
        let service = CommissionService::new(CommissionRepository::new());
        let commission = seed_commission(&pool, tenant).await;

        let cancelled = service
            .cancel_commission(&pool, tenant, commission.id, &CancelCommissionRequest { notes: Some("estorno".into()) })
            .await
            .unwrap();
        assert_eq!(cancelled.status, CommissionStatus::Cancelled);
        assert_eq!(cancelled.notes.as_deref(), Some("estorno"));

        let err = service
            .mark_paid(&pool, tenant, commission.id, &MarkPaidRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CommissionNotPending(_)));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn unknown_commission_is_not_found() {
        let pool = test_pool().await;
        let service = CommissionService::new(CommissionRepository::new());
        let err = service
            .mark_paid(&pool, TenantContext(Uuid::new_v4()), Uuid::new_v4(), &MarkPaidRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ResourceNotFound(_)));
    }

    #[tokio::test]
    #[ignore = "requer Postgres (DATABASE_URL)"]
    async fn missing_config_reads_as_inactive() {
        let pool = test_pool().await;
        let service = CommissionService::new(CommissionRepository::new());
        let config = service.get_commission_config(&pool, TenantContext(Uuid::new_v4())).await.unwrap();
        assert!(!config.is_active);
        assert_eq!(config.commission_percentage, Decimal::ZERO);
    }
}
