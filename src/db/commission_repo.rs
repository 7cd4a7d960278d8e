// src/db/commission_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::{map_unique_violation, AppError},
    models::{
        commission::{Commission, CommissionConfig, CommissionSnapshot, CommissionStatus},
        pagination::Pagination,
    },
};

#[derive(Clone, Default)]
pub struct CommissionRepository;

impl CommissionRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  CONFIGURAÇÃO (singleton por tenant)
    // =========================================================================

    pub async fn get_config<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
    ) -> Result<Option<CommissionConfig>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let config = sqlx::query_as::<_, CommissionConfig>(
            "SELECT * FROM commission_configs WHERE tenant_id = $1",
        )
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?;

        Ok(config)
    }

    pub async fn upsert_config<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        commission_percentage: Decimal,
        is_active: bool,
    ) -> Result<CommissionConfig, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // UPSERT (Insert or Update)
        let config = sqlx::query_as::<_, CommissionConfig>(
            r#"
            INSERT INTO commission_configs (tenant_id, commission_percentage, is_active)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id)
            DO UPDATE SET
                commission_percentage = EXCLUDED.commission_percentage,
                is_active = EXCLUDED.is_active,
                updated_at = NOW()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(commission_percentage)
        .bind(is_active)
        .fetch_one(executor)
        .await?;

        Ok(config)
    }

    // =========================================================================
    //  COMISSÕES
    // =========================================================================

    pub async fn create_commission<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_number: &str,
        snapshot: &CommissionSnapshot,
    ) -> Result<Commission, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Commission>(
            r#"
            INSERT INTO commissions (
                tenant_id, budget_id, user_id,
                budget_total, commission_percentage, commission_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(snapshot.budget_id)
        .bind(snapshot.user_id)
        .bind(snapshot.budget_total)
        .bind(snapshot.commission_percentage)
        .bind(snapshot.commission_amount)
        .fetch_one(executor)
        .await
        // UNIQUE(budget_id): uma comissão por orçamento
        .map_err(|e| {
            map_unique_violation(e, || AppError::BudgetAlreadyConverted(budget_number.to_string()))
        })
    }

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        commission_id: Uuid,
    ) -> Result<Option<Commission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let commission = sqlx::query_as::<_, Commission>(
            "SELECT * FROM commissions WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(commission_id)
        .fetch_optional(executor)
        .await?;

        Ok(commission)
    }

    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        commission_id: Uuid,
    ) -> Result<Option<Commission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let commission = sqlx::query_as::<_, Commission>(
            "SELECT * FROM commissions WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(commission_id)
        .fetch_optional(executor)
        .await?;

        Ok(commission)
    }

    pub async fn find_by_budget<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_id: Uuid,
    ) -> Result<Option<Commission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let commission = sqlx::query_as::<_, Commission>(
            "SELECT * FROM commissions WHERE tenant_id = $1 AND budget_id = $2",
        )
        .bind(tenant_id)
        .bind(budget_id)
        .fetch_optional(executor)
        .await?;

        Ok(commission)
    }

    /// pending -> paid. `None` se a comissão não estiver mais pendente.
    pub async fn mark_paid<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        commission_id: Uuid,
        payment_reference: Option<&str>,
        notes: Option<&str>,
    ) -> Result<Option<Commission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let commission = sqlx::query_as::<_, Commission>(
            r#"
            UPDATE commissions
            SET status = 'PAID',
                paid_at = NOW(),
                payment_reference = $3,
                notes = COALESCE($4, notes),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(commission_id)
        .bind(payment_reference)
        .bind(notes)
        .fetch_optional(executor)
        .await?;

        Ok(commission)
    }

    /// pending -> cancelled. `None` se a comissão não estiver mais pendente.
    pub async fn cancel<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        commission_id: Uuid,
        notes: Option<&str>,
    ) -> Result<Option<Commission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let commission = sqlx::query_as::<_, Commission>(
            r#"
            UPDATE commissions
            SET status = 'CANCELLED',
                notes = COALESCE($3, notes),
                updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(commission_id)
        .bind(notes)
        .fetch_optional(executor)
        .await?;

        Ok(commission)
    }

    pub async fn list_commissions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<CommissionStatus>,
        user_id: Option<Uuid>,
        pagination: Pagination,
    ) -> Result<Vec<Commission>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let commissions = sqlx::query_as::<_, Commission>(
            r#"
            SELECT * FROM commissions
            WHERE tenant_id = $1
              AND ($2::commission_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
            ORDER BY created_at DESC, id DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(user_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(executor)
        .await?;

        Ok(commissions)
    }

    pub async fn count_commissions<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<CommissionStatus>,
        user_id: Option<Uuid>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM commissions
            WHERE tenant_id = $1
              AND ($2::commission_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR user_id = $3)
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(user_id)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }

    /// Quantidade e soma por status (cards do painel de comissões).
    pub async fn totals_by_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        user_id: Option<Uuid>,
    ) -> Result<Vec<(CommissionStatus, i64, Decimal)>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let rows = sqlx::query_as::<_, (CommissionStatus, i64, Decimal)>(
            r#"
            SELECT status, COUNT(*), COALESCE(SUM(commission_amount), 0)
            FROM commissions
            WHERE tenant_id = $1
              AND ($2::uuid IS NULL OR user_id = $2)
            GROUP BY status
            "#,
        )
        .bind(tenant_id)
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(rows)
    }
}
