// src/db/budget_repo.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::{types::Json, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        budget::{Budget, BudgetItem, BudgetStatus},
        pagination::Pagination,
    },
};

/// Dados já validados e precificados para inserir um orçamento.
pub struct NewBudget<'a> {
    pub customer_id: Uuid,
    pub created_by_user_id: Uuid,
    pub status: BudgetStatus,
    pub items: &'a [BudgetItem],
    pub total_amount: Decimal,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<&'a str>,
}

#[derive(Clone, Default)]
pub struct BudgetRepository;

impl BudgetRepository {
    pub fn new() -> Self {
        Self
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// Reserva o próximo número do tenant e cria o orçamento na mesma query.
    /// O UPSERT na tabela de sequência trava a linha do tenant, então duas
    /// criações simultâneas nunca recebem o mesmo número.
    pub async fn create_budget<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        input: NewBudget<'_>,
    ) -> Result<Budget, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let budget = sqlx::query_as::<_, Budget>(
            r#"
            WITH seq AS (
                INSERT INTO budget_sequences (tenant_id, last_value)
                VALUES ($1, 1)
                ON CONFLICT (tenant_id)
                DO UPDATE SET last_value = budget_sequences.last_value + 1
                RETURNING last_value
            )
            INSERT INTO budgets (
                tenant_id, sequence, budget_number, customer_id, created_by_user_id,
                total_amount, status, items, valid_until, notes
            )
            SELECT
                $1, seq.last_value, 'ORC-' || lpad(seq.last_value::text, 6, '0'), $2, $3,
                $4, $5, $6, $7, $8
            FROM seq
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(input.customer_id)
        .bind(input.created_by_user_id)
        .bind(input.total_amount)
        .bind(input.status)
        .bind(Json(input.items))
        .bind(input.valid_until)
        .bind(input.notes)
        .fetch_one(executor)
        .await?;

        Ok(budget)
    }

    /// Atualiza conteúdo de um orçamento ainda não convertido.
    /// `None` quando o orçamento não existe ou já foi convertido.
    pub async fn update_content<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_id: Uuid,
        items: &[BudgetItem],
        total_amount: Decimal,
        valid_until: Option<NaiveDate>,
        notes: Option<&str>,
    ) -> Result<Option<Budget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let budget = sqlx::query_as::<_, Budget>(
            r#"
            UPDATE budgets
            SET items = $3, total_amount = $4, valid_until = $5, notes = $6, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status <> 'CONVERTED'
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(budget_id)
        .bind(Json(items))
        .bind(total_amount)
        .bind(valid_until)
        .bind(notes)
        .fetch_optional(executor)
        .await?;

        Ok(budget)
    }

    /// Troca o status só se ele ainda for `expected` (evita sobrescrever uma
    /// mudança concorrente).
    pub async fn update_status<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_id: Uuid,
        expected: BudgetStatus,
        next: BudgetStatus,
    ) -> Result<Option<Budget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let budget = sqlx::query_as::<_, Budget>(
            r#"
            UPDATE budgets
            SET status = $4, updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(budget_id)
        .bind(expected)
        .bind(next)
        .fetch_optional(executor)
        .await?;

        Ok(budget)
    }

    /// Marca como convertido. A guarda no WHERE garante uma única transição.
    pub async fn mark_converted<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_id: Uuid,
    ) -> Result<Option<Budget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let budget = sqlx::query_as::<_, Budget>(
            r#"
            UPDATE budgets
            SET status = 'CONVERTED', converted_at = NOW(), updated_at = NOW()
            WHERE tenant_id = $1 AND id = $2 AND status <> 'CONVERTED'
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(budget_id)
        .fetch_optional(executor)
        .await?;

        Ok(budget)
    }

    /// Retorna `true` se removeu. Convertidos nunca são removidos.
    pub async fn delete_budget<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "DELETE FROM budgets WHERE tenant_id = $1 AND id = $2 AND status <> 'CONVERTED'",
        )
        .bind(tenant_id)
        .bind(budget_id)
        .execute(executor)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn find_by_id<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_id: Uuid,
    ) -> Result<Option<Budget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let budget = sqlx::query_as::<_, Budget>(
            "SELECT * FROM budgets WHERE tenant_id = $1 AND id = $2",
        )
        .bind(tenant_id)
        .bind(budget_id)
        .fetch_optional(executor)
        .await?;

        Ok(budget)
    }

    /// Mesmo que `find_by_id`, mas trava a linha até o fim da transação.
    pub async fn find_by_id_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        budget_id: Uuid,
    ) -> Result<Option<Budget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let budget = sqlx::query_as::<_, Budget>(
            "SELECT * FROM budgets WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(budget_id)
        .fetch_optional(executor)
        .await?;

        Ok(budget)
    }

    pub async fn list_budgets<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<BudgetStatus>,
        customer_id: Option<Uuid>,
        pagination: Pagination,
    ) -> Result<Vec<Budget>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let budgets = sqlx::query_as::<_, Budget>(
            r#"
            SELECT * FROM budgets
            WHERE tenant_id = $1
              AND ($2::budget_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR customer_id = $3)
            ORDER BY created_at DESC, sequence DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(customer_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(executor)
        .await?;

        Ok(budgets)
    }

    pub async fn count_budgets<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        status: Option<BudgetStatus>,
        customer_id: Option<Uuid>,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM budgets
            WHERE tenant_id = $1
              AND ($2::budget_status IS NULL OR status = $2)
              AND ($3::uuid IS NULL OR customer_id = $3)
            "#,
        )
        .bind(tenant_id)
        .bind(status)
        .bind(customer_id)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}
