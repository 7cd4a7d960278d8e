// src/models/pricing.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// --- Enums (Mapeando o Postgres) ---

/// Tipos de atendimento aceitos pela clínica. Valores desconhecidos são
/// rejeitados na desserialização.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AppointmentType {
    #[serde(rename = "consulta")]
    Consultation,
    #[serde(rename = "retorno")]
    FollowUp,
    #[serde(rename = "vacinacao")]
    Vaccination,
    #[serde(rename = "cirurgia")]
    Surgery,
    #[serde(rename = "exame")]
    Exam,
    #[serde(rename = "emergencia")]
    Emergency,
    #[serde(rename = "internacao")]
    Hospitalization,
}

/// De qual regra veio o preço sugerido.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Professional,
    Specialty,
    Type,
    Default,
}

// --- Structs ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceConfig {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub id: Uuid,

    #[schema(ignore)]
    pub tenant_id: Uuid,

    #[schema(example = "consulta")]
    pub appointment_type: Option<AppointmentType>,

    #[schema(example = "Cirurgia")]
    pub specialty: Option<String>,

    pub professional_id: Option<Uuid>,

    // Referência opaca do catálogo externo de preços
    #[schema(example = "price_1Nv0FGQ9RKHgCVdK")]
    pub price_id: String,

    #[schema(example = false)]
    pub is_default: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceSuggestion {
    pub price_config_id: Uuid,
    #[schema(example = "price_1Nv0FGQ9RKHgCVdK")]
    pub price_id: String,
    pub source: PriceSource,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PriceSuggestionResponse {
    // `null` quando nenhuma regra se aplica (não é erro)
    pub suggestion: Option<PriceSuggestion>,
}

#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PriceQuery {
    pub professional_id: Option<Uuid>,
    pub appointment_type: Option<AppointmentType>,
    pub specialty: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePriceConfigRequest {
    #[schema(example = "consulta")]
    pub appointment_type: Option<AppointmentType>,

    #[validate(length(min = 1, max = 120, message = "invalid_length"))]
    #[schema(example = "Cirurgia")]
    pub specialty: Option<String>,

    pub professional_id: Option<Uuid>,

    #[validate(length(min = 1, max = 255, message = "required"))]
    #[schema(example = "price_1Nv0FGQ9RKHgCVdK")]
    pub price_id: String,

    #[serde(default)]
    pub is_default: bool,
}

impl CreatePriceConfigRequest {
    /// Uma configuração manual precisa apontar para algo; só o padrão global
    /// pode ficar sem profissional, especialidade e tipo.
    pub fn ensure_has_target(&self) -> Result<(), AppError> {
        let has_target = self.appointment_type.is_some()
            || self.specialty.is_some()
            || self.professional_id.is_some();

        if has_target || self.is_default {
            Ok(())
        } else {
            Err(AppError::InvalidInput(
                "informe appointmentType, specialty ou professionalId (ou marque isDefault)".into(),
            ))
        }
    }
}

/// Escolhe o preço seguindo a prioridade estrita
/// profissional -> especialidade -> tipo -> padrão. A primeira regra que casa
/// vence, sem mesclar. `candidates` deve vir do mais novo para o mais antigo.
pub fn pick_price(candidates: &[PriceConfig], query: &PriceQuery) -> Option<PriceSuggestion> {
    let by_professional = query.professional_id.and_then(|pid| {
        candidates
            .iter()
            .find(|c| c.professional_id == Some(pid))
            .map(|c| (c, PriceSource::Professional))
    });

    let by_specialty = || {
        query.specialty.as_deref().and_then(|specialty| {
            candidates
                .iter()
                .find(|c| c.specialty.as_deref() == Some(specialty))
                .map(|c| (c, PriceSource::Specialty))
        })
    };

    let by_type = || {
        query.appointment_type.and_then(|kind| {
            candidates
                .iter()
                .find(|c| c.appointment_type == Some(kind))
                .map(|c| (c, PriceSource::Type))
        })
    };

    let by_default = || {
        candidates
            .iter()
            .find(|c| c.is_default)
            .map(|c| (c, PriceSource::Default))
    };

    by_professional
        .or_else(by_specialty)
        .or_else(by_type)
        .or_else(by_default)
        .map(|(config, source)| PriceSuggestion {
            price_config_id: config.id,
            price_id: config.price_id.clone(),
            source,
        })
}
