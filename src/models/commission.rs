// src/models/commission.rs

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::common::error::AppError;

// --- Enums (Mapeando o Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "commission_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,   // Aguardando pagamento
    Paid,      // Terminal
    Cancelled, // Terminal
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Paid => "paid",
            CommissionStatus::Cancelled => "cancelled",
        }
    }

    /// Pago e cancelado são terminais: só `pending` aceita nova transição.
    pub fn ensure_pending(&self) -> Result<(), AppError> {
        match self {
            CommissionStatus::Pending => Ok(()),
            other => Err(AppError::CommissionNotPending(other.as_str().to_string())),
        }
    }
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    pub budget_id: Uuid,
    // Quem criou o orçamento
    pub user_id: Uuid,

    // Fotografia dos valores no momento da conversão
    #[schema(example = "1000.00")]
    pub budget_total: Decimal,
    #[schema(example = "5.00")]
    pub commission_percentage: Decimal,
    #[schema(example = "50.00")]
    pub commission_amount: Decimal,

    pub status: CommissionStatus,
    pub paid_at: Option<DateTime<Utc>>,
    #[schema(example = "PIX-20250310-0001")]
    pub payment_reference: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionConfig {
    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(example = "5.00")]
    pub commission_percentage: Decimal,

    #[schema(example = true)]
    pub is_active: bool,

    pub updated_at: Option<DateTime<Utc>>,
}

impl CommissionConfig {
    /// Clínica sem configuração salva: comissão desativada.
    pub fn inactive(tenant_id: Uuid) -> Self {
        Self {
            tenant_id,
            commission_percentage: Decimal::ZERO,
            is_active: false,
            updated_at: None,
        }
    }
}

/// Valores que alimentam uma nova comissão, copiados no instante da conversão.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionSnapshot {
    pub budget_id: Uuid,
    pub user_id: Uuid,
    pub budget_total: Decimal,
    pub commission_percentage: Decimal,
    pub commission_amount: Decimal,
}

impl CommissionSnapshot {
    pub fn capture(
        budget_id: Uuid,
        user_id: Uuid,
        budget_total: Decimal,
        commission_percentage: Decimal,
    ) -> Self {
        Self {
            budget_id,
            user_id,
            budget_total,
            commission_percentage,
            commission_amount: calculate_commission_amount(budget_total, commission_percentage),
        }
    }
}

/// round(total * percentual / 100, 2), meio para longe do zero.
pub fn calculate_commission_amount(budget_total: Decimal, percentage: Decimal) -> Decimal {
    (budget_total * percentage / Decimal::ONE_HUNDRED)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionStatusTotal {
    pub status: CommissionStatus,
    pub count: i64,
    #[schema(example = "350.00")]
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSummary {
    pub user_id: Option<Uuid>,
    pub by_status: Vec<CommissionStatusTotal>,
}

// --- Payloads ---

fn validate_percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percentage_out_of_range"));
    }
    // A coluna é NUMERIC(5, 2); "5.000" continua valendo
    if value.normalize().scale() > 2 {
        return Err(ValidationError::new("too_many_decimal_places"));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCommissionConfigRequest {
    #[validate(custom(function = "validate_percentage"))]
    #[schema(example = "5.00")]
    pub commission_percentage: Decimal,

    #[schema(example = true)]
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    #[validate(length(min = 1, max = 255, message = "invalid_length"))]
    #[schema(example = "PIX-20250310-0001")]
    pub payment_reference: Option<String>,

    #[validate(length(max = 2000, message = "too_long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelCommissionRequest {
    #[validate(length(max = 2000, message = "too_long"))]
    #[schema(example = "Orçamento estornado pelo cliente")]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CommissionListQuery {
    pub status: Option<CommissionStatus>,
    pub user_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CommissionSummaryQuery {
    pub user_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn five_percent_of_one_thousand_is_fifty() {
        assert_eq!(calculate_commission_amount(dec("1000.00"), dec("5.00")), dec("50.00"));
    }

    #[test]
    fn rounds_half_away_from_zero_to_cents() {
        // 10.05 * 5% = 0.5025 -> 0.50
        assert_eq!(calculate_commission_amount(dec("10.05"), dec("5")), dec("0.50"));
        // 0.10 * 5% = 0.005 -> 0.01
        assert_eq!(calculate_commission_amount(dec("0.10"), dec("5")), dec("0.01"));
        // 333.33 * 7.5% = 24.99975 -> 25.00
        assert_eq!(calculate_commission_amount(dec("333.33"), dec("7.5")), dec("25.00"));
    }

    #[test]
    fn zero_percent_yields_zero() {
        assert_eq!(calculate_commission_amount(dec("1234.56"), Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn snapshot_copies_values_at_capture_time() {
        let budget_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();
        let mut percentage = dec("5.00");
        let snapshot = CommissionSnapshot::capture(budget_id, user_id, dec("1000.00"), percentage);

        // Alterar a configuração depois não muda a fotografia
        percentage = dec("10.00");
        assert_eq!(snapshot.commission_percentage, dec("5.00"));
        assert_eq!(snapshot.commission_amount, dec("50.00"));
        assert_ne!(percentage, snapshot.commission_percentage);
    }

    #[test]
    fn only_pending_commissions_accept_transitions() {
        assert!(CommissionStatus::Pending.ensure_pending().is_ok());
        assert!(matches!(
            CommissionStatus::Paid.ensure_pending(),
            Err(AppError::CommissionNotPending(s)) if s == "paid"
        ));
        assert!(CommissionStatus::Cancelled.ensure_pending().is_err());
    }

    #[test]
    fn percentage_must_be_between_zero_and_hundred() {
        let ok = UpdateCommissionConfigRequest { commission_percentage: dec("100"), is_active: true };
        assert!(ok.validate().is_ok());

        let too_high = UpdateCommissionConfigRequest { commission_percentage: dec("100.01"), is_active: true };
        assert!(too_high.validate().is_err());

        let negative = UpdateCommissionConfigRequest { commission_percentage: dec("-1"), is_active: false };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn percentage_keeps_at_most_two_decimal_places() {
        let fine = UpdateCommissionConfigRequest { commission_percentage: dec("5.55"), is_active: true };
        assert!(fine.validate().is_ok());

        let padded = UpdateCommissionConfigRequest { commission_percentage: dec("5.000"), is_active: true };
        assert!(padded.validate().is_ok());

        let precise = UpdateCommissionConfigRequest { commission_percentage: dec("5.555"), is_active: true };
        let errors = precise.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("commission_percentage"));
    }
}
