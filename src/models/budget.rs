// src/models/budget.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{common::error::AppError, models::commission::Commission};

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "budget_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum BudgetStatus {
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
    Converted, // Terminal
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetStatus::Draft => "draft",
            BudgetStatus::Sent => "sent",
            BudgetStatus::Accepted => "accepted",
            BudgetStatus::Rejected => "rejected",
            BudgetStatus::Expired => "expired",
            BudgetStatus::Converted => "converted",
        }
    }

    /// Fluxo manual: draft -> sent -> {accepted, rejected, expired}.
    /// `converted` só é alcançado pela conversão.
    pub fn can_transition_to(&self, next: BudgetStatus) -> bool {
        matches!(
            (self, next),
            (BudgetStatus::Draft, BudgetStatus::Sent)
                | (BudgetStatus::Sent, BudgetStatus::Accepted)
                | (BudgetStatus::Sent, BudgetStatus::Rejected)
                | (BudgetStatus::Sent, BudgetStatus::Expired)
        )
    }

    pub fn ensure_transition(&self, next: BudgetStatus) -> Result<(), AppError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(AppError::InvalidStateTransition {
                entity: "budget",
                from: self.as_str().to_string(),
                to: next.as_str().to_string(),
            })
        }
    }

    pub fn is_convertible(&self) -> bool {
        matches!(self, BudgetStatus::Sent | BudgetStatus::Accepted)
    }
}

// --- Structs ---

/// Linha do orçamento. Fica embutida (JSONB) no próprio orçamento.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItem {
    #[schema(example = "Castração felina")]
    pub description: String,
    #[schema(example = "1")]
    pub quantity: Decimal,
    #[schema(example = "450.00")]
    pub unit_price: Decimal,
    #[schema(example = "450.00")]
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(example = "ORC-000042")]
    pub budget_number: String,

    pub customer_id: Uuid,
    pub created_by_user_id: Uuid,

    #[schema(example = "1000.00")]
    pub total_amount: Decimal,

    pub status: BudgetStatus,

    #[schema(value_type = Vec<BudgetItem>)]
    pub items: Json<Vec<BudgetItem>>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-12-31")]
    pub valid_until: Option<NaiveDate>,

    pub notes: Option<String>,
    pub converted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Orçamento convertido não aceita edição nem exclusão.
    pub fn ensure_mutable(&self) -> Result<(), AppError> {
        if self.status == BudgetStatus::Converted {
            return Err(AppError::BudgetAlreadyConverted(self.budget_number.clone()));
        }
        Ok(())
    }

    /// Pré-condições da conversão: reconversão é conflito; rascunho,
    /// recusado e expirado são estados inválidos.
    pub fn ensure_convertible(&self) -> Result<(), AppError> {
        self.ensure_mutable()?;
        if !self.status.is_convertible() {
            return Err(AppError::InvalidStateTransition {
                entity: "budget",
                from: self.status.as_str().to_string(),
                to: BudgetStatus::Converted.as_str().to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDetail {
    #[serde(flatten)]
    pub budget: Budget,
    pub commission: Option<Commission>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub budget: Budget,
    // Ausente quando a comissão está desativada para a clínica
    pub commission: Option<Commission>,
}

// --- Payloads ---

/// Maior valor que cabe em `NUMERIC(12, 2)`.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

fn validate_quantity(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("must_be_positive"));
    }
    if *value > MAX_QUANTITY {
        return Err(ValidationError::new("quantity_too_large"));
    }
    Ok(())
}

fn validate_unit_price(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("must_not_be_negative"));
    }
    if *value > MAX_AMOUNT {
        return Err(ValidationError::new("amount_too_large"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BudgetItemInput {
    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "Castração felina")]
    pub description: String,

    #[validate(custom(function = "validate_quantity"))]
    #[schema(example = "1")]
    pub quantity: Decimal,

    #[validate(custom(function = "validate_unit_price"))]
    #[schema(example = "450.00")]
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBudgetRequest {
    pub customer_id: Uuid,

    // draft (padrão) ou sent
    pub status: Option<BudgetStatus>,

    #[validate(length(min = 1, message = "required"), nested)]
    pub items: Vec<BudgetItemInput>,

    #[schema(value_type = Option<String>, format = Date, example = "2025-12-31")]
    pub valid_until: Option<NaiveDate>,

    #[validate(length(max = 2000, message = "too_long"))]
    pub notes: Option<String>,
}

impl CreateBudgetRequest {
    pub fn initial_status(&self) -> Result<BudgetStatus, AppError> {
        match self.status.unwrap_or(BudgetStatus::Draft) {
            status @ (BudgetStatus::Draft | BudgetStatus::Sent) => Ok(status),
            other => Err(AppError::InvalidInput(format!(
                "um orçamento só pode nascer como draft ou sent (recebido: {})",
                other.as_str()
            ))),
        }
    }
}

// Distingue campo ausente (`None`) de `null` explícito (`Some(None)`).
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Campos ausentes mantêm o valor atual; `validUntil` e `notes` com `null`
/// explícito são apagados.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBudgetRequest {
    #[validate(length(min = 1, message = "required"), nested)]
    pub items: Option<Vec<BudgetItemInput>>,

    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = Date, example = "2025-12-31")]
    pub valid_until: Option<Option<NaiveDate>>,

    #[serde(default, deserialize_with = "present")]
    #[validate(length(max = 2000, message = "too_long"))]
    #[schema(value_type = Option<String>)]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangeBudgetStatusRequest {
    #[schema(example = "sent")]
    pub status: BudgetStatus,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BudgetListQuery {
    pub status: Option<BudgetStatus>,
    pub customer_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Calcula o total de cada linha e o total geral (2 casas, meio para longe do zero).
/// Falha quando uma linha ou o total não cabe em `NUMERIC(12, 2)`.
pub fn price_items(inputs: &[BudgetItemInput]) -> Result<(Vec<BudgetItem>, Decimal), AppError> {
    let too_large = || AppError::InvalidInput(format!("o total do orçamento excede {}", MAX_AMOUNT));

    let mut items = Vec::with_capacity(inputs.len());
    let mut total = Decimal::ZERO;

    for input in inputs {
        let line_total = input
            .quantity
            .checked_mul(input.unit_price)
            .ok_or_else(too_large)?
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);

        total = total.checked_add(line_total).ok_or_else(too_large)?;
        if line_total > MAX_AMOUNT || total > MAX_AMOUNT {
            return Err(too_large());
        }

        items.push(BudgetItem {
            description: input.description.trim().to_string(),
            quantity: input.quantity,
            unit_price: input.unit_price,
            total: line_total,
        });
    }

    Ok((items, total))
}
