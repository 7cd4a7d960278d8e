// src/handlers/pricing.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::get_tenant_connection,
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{i18n::Locale, tenancy::TenantContext},
    models::pricing::{CreatePriceConfigRequest, PriceConfig, PriceQuery, PriceSuggestionResponse},
};

// GET /api/pricing/suggestion
#[utoipa::path(
    get,
    path = "/api/pricing/suggestion",
    tag = "Pricing",
    params(
        PriceQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Preço sugerido (ou null quando nenhuma regra se aplica)", body = PriceSuggestionResponse),
        (status = 400, description = "Parâmetros inválidos")
    )
)]
pub async fn suggest_price(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<PriceQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let suggestion = app_state.pricing_service
        .resolve_price(&mut *conn, tenant, &query)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(PriceSuggestionResponse { suggestion })))
}

// POST /api/pricing/configs
#[utoipa::path(
    post,
    path = "/api/pricing/configs",
    tag = "Pricing",
    request_body = CreatePriceConfigRequest,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 201, description = "Regra de preço criada", body = PriceConfig),
        (status = 400, description = "Dados inválidos"),
        (status = 409, description = "Já existe um preço padrão")
    )
)]
pub async fn create_price_config(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<CreatePriceConfigRequest>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let config = app_state.pricing_service
        .create_price_config(&mut *conn, tenant, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(config)))
}

// GET /api/pricing/configs
#[utoipa::path(
    get,
    path = "/api/pricing/configs",
    tag = "Pricing",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Regras de preço da clínica", body = Vec<PriceConfig>)
    )
)]
pub async fn list_price_configs(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let configs = app_state.pricing_service
        .list_price_configs(&mut *conn, tenant)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(configs)))
}

// DELETE /api/pricing/configs/{id}
#[utoipa::path(
    delete,
    path = "/api/pricing/configs/{id}",
    tag = "Pricing",
    params(
        ("id" = Uuid, Path, description = "ID da regra de preço"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 204, description = "Regra removida"),
        (status = 404, description = "Regra não encontrada")
    )
)]
pub async fn delete_price_config(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(config_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state.pricing_service
        .delete_price_config(&mut *conn, tenant, config_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}
