use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::{common::i18n::I18nStore, middleware::i18n::Locale};

// Erros de domínio e de infraestrutura. Os handlers convertem para ApiError.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Dados inválidos: {0}")]
    InvalidInput(String),

    #[error("{0} não encontrado")]
    ResourceNotFound(String),

    #[error("Orçamento {0} já convertido")]
    BudgetAlreadyConverted(String),

    #[error("Já existe um preço padrão para o tenant")]
    DefaultPriceAlreadyExists,

    #[error("Transição inválida de {entity}: {from} -> {to}")]
    InvalidStateTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("Comissão não está pendente (status: {0})")]
    CommissionNotPending(String),

    #[error("Erro de banco de dados: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // `anyhow::Error` guarda o contexto de qualquer outra falha inesperada.
    #[error("Erro interno do servidor: {0}")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::BudgetAlreadyConverted(_) | AppError::DefaultPriceAlreadyExists => {
                StatusCode::CONFLICT
            }
            AppError::InvalidStateTransition { .. } | AppError::CommissionNotPending(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Converte o erro de domínio na resposta HTTP traduzida para o idioma do cliente.
    pub fn to_api_error(self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let status = self.status_code();
        let lang = locale.0.as_str();

        match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                ApiError {
                    status,
                    error: i18n.translate(lang, "validation_failed", &[]),
                    details: Some(json!(details)),
                }
            }
            AppError::InvalidInput(reason) => ApiError::new(
                status,
                i18n.translate(lang, "invalid_input", &[("reason", reason)]),
            ),
            AppError::ResourceNotFound(resource) => ApiError::new(
                status,
                i18n.translate(lang, "resource_not_found", &[("resource", resource)]),
            ),
            AppError::BudgetAlreadyConverted(budget) => ApiError::new(
                status,
                i18n.translate(lang, "budget_already_converted", &[("budget", budget)]),
            ),
            AppError::DefaultPriceAlreadyExists => {
                ApiError::new(status, i18n.translate(lang, "default_price_exists", &[]))
            }
            AppError::InvalidStateTransition { entity, from, to } => ApiError::new(
                status,
                i18n.translate(
                    lang,
                    "invalid_state_transition",
                    &[("entity", entity.to_string()), ("from", from), ("to", to)],
                ),
            ),
            AppError::CommissionNotPending(current) => ApiError::new(
                status,
                i18n.translate(lang, "commission_not_pending", &[("status", current)]),
            ),
            // Falhas de infraestrutura: loga o detalhe, devolve mensagem genérica.
            ref e @ (AppError::DatabaseError(_) | AppError::InternalServerError(_)) => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                ApiError::new(status, i18n.translate(lang, "internal_error", &[]))
            }
        }
    }
}

/// Corpo de erro devolvido pela API.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            status,
            error: error.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

/// Violação de índice único vira conflito de domínio; o resto segue como erro de banco.
pub(crate) fn map_unique_violation(err: sqlx::Error, on_conflict: impl FnOnce() -> AppError) -> AppError {
    if let Some(db_err) = err.as_database_error() {
        if db_err.is_unique_violation() {
            return on_conflict();
        }
    }
    AppError::DatabaseError(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    fn store() -> I18nStore {
        I18nStore::load().unwrap()
    }

    #[test]
    fn conflicts_map_to_409() {
        let api = AppError::BudgetAlreadyConverted("ORC-000007".into())
            .to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.error, "Budget ORC-000007 has already been converted.");

        let api = AppError::DefaultPriceAlreadyExists.to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::CONFLICT);
    }

    #[test]
    fn invalid_state_maps_to_422_in_portuguese() {
        let err = AppError::InvalidStateTransition {
            entity: "budget",
            from: "draft".into(),
            to: "converted".into(),
        };
        let api = err.to_api_error(&Locale("pt".into()), &store());
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.error, "Não é possível mover budget de 'draft' para 'converted'.");

        let api = AppError::CommissionNotPending("paid".into())
            .to_api_error(&Locale("pt".into()), &store());
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn not_found_maps_to_404() {
        let api = AppError::ResourceNotFound("Commission 42".into())
            .to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::NOT_FOUND);
        assert_eq!(api.error, "Commission 42 not found.");
    }

    #[test]
    fn infrastructure_errors_hide_details() {
        let api = AppError::DatabaseError(sqlx::Error::PoolTimedOut)
            .to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.error, "An unexpected error occurred.");
        assert!(api.details.is_none());
    }

    #[derive(Validate)]
    struct Probe {
        #[validate(length(min = 1, message = "required"))]
        name: String,
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let errors = Probe { name: String::new() }.validate().unwrap_err();
        let api = AppError::ValidationError(errors).to_api_error(&Locale("en".into()), &store());
        assert_eq!(api.status, StatusCode::BAD_REQUEST);
        assert_eq!(api.details.unwrap()["name"][0], "required");
    }
}
