// src/handlers/commissions.rs

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
    models::{
        commission::{
            CancelCommissionRequest, Commission, CommissionConfig, CommissionListQuery,
            CommissionSummary, CommissionSummaryQuery, MarkPaidRequest,
            UpdateCommissionConfigRequest,
        },
        pagination::Page,
    },
};

// =============================================================================
//  ÁREA 1: CONSULTAS
// =============================================================================

// GET /api/commissions
#[utoipa::path(
    get,
    path = "/api/commissions",
    tag = "Commissions",
    params(
        CommissionListQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Página de comissões", body = Page<Commission>),
        (status = 400, description = "Paginação inválida")
    )
)]
pub async fn list_commissions(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<CommissionListQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let page = app_state.commission_service
        .list_commissions(&mut *conn, tenant, &query)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/commissions/summary
#[utoipa::path(
    get,
    path = "/api/commissions/summary",
    tag = "Commissions",
    params(
        CommissionSummaryQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Totais por status", body = CommissionSummary)
    )
)]
pub async fn commission_summary(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<CommissionSummaryQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let summary = app_state.commission_service
        .commission_summary(&mut *conn, tenant, query.user_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(summary)))
}

// GET /api/commissions/{id}
#[utoipa::path(
    get,
    path = "/api/commissions/{id}",
    tag = "Commissions",
    params(
        ("id" = Uuid, Path, description = "ID da comissão"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Comissão", body = Commission),
        (status = 404, description = "Comissão não encontrada")
    )
)]
pub async fn get_commission(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(commission_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let commission = app_state.commission_service
        .get_commission(&mut *conn, tenant, commission_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(commission)))
}

// =============================================================================
//  ÁREA 2: PAGAMENTO E CANCELAMENTO
// =============================================================================

// POST /api/commissions/{id}/pay
#[utoipa::path(
    post,
    path = "/api/commissions/{id}/pay",
    tag = "Commissions",
    request_body = MarkPaidRequest,
    params(
        ("id" = Uuid, Path, description = "ID da comissão"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Comissão paga", body = Commission),
        (status = 404, description = "Comissão não encontrada"),
        (status = 422, description = "Comissão não está pendente")
    )
)]
pub async fn mark_commission_paid(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(commission_id): Path<Uuid>,
    body: Option<Json<MarkPaidRequest>>,
) -> Result<impl IntoResponse, ApiError> {

    // Corpo opcional: sem corpo vale o payload vazio
    let payload = body.map(|Json(p)| p).unwrap_or_default();

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let commission = app_state.commission_service
        .mark_paid(&mut *conn, tenant, commission_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(commission)))
}

// POST /api/commissions/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/commissions/{id}/cancel",
    tag = "Commissions",
    request_body = CancelCommissionRequest,
    params(
        ("id" = Uuid, Path, description = "ID da comissão"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Comissão cancelada", body = Commission),
        (status = 404, description = "Comissão não encontrada"),
        (status = 422, description = "Comissão não está pendente")
    )
)]
pub async fn cancel_commission(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(commission_id): Path<Uuid>,
    body: Option<Json<CancelCommissionRequest>>,
) -> Result<impl IntoResponse, ApiError> {

    // Corpo opcional: sem corpo vale o payload vazio
    let payload = body.map(|Json(p)| p).unwrap_or_default();

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let commission = app_state.commission_service
        .cancel_commission(&mut *conn, tenant, commission_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(commission)))
}

// =============================================================================
//  ÁREA 3: CONFIGURAÇÃO
// =============================================================================

// GET /api/commissions/config
#[utoipa::path(
    get,
    path = "/api/commissions/config",
    tag = "Commissions",
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Configuração de comissão da clínica", body = CommissionConfig)
    )
)]
pub async fn get_commission_config(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let config = app_state.commission_service
        .get_commission_config(&mut *conn, tenant)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(config)))
}

// PUT /api/commissions/config
#[utoipa::path(
    put,
    path = "/api/commissions/config",
    tag = "Commissions",
    request_body = UpdateCommissionConfigRequest,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Configuração salva", body = CommissionConfig),
        (status = 400, description = "Percentual fora de 0..100")
    )
)]
pub async fn update_commission_config(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Json(payload): Json<UpdateCommissionConfigRequest>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let config = app_state.commission_service
        .update_commission_config(&mut *conn, tenant, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(config)))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        extract::FromRequest,
        http::{header, Request},
    };

    use super::*;

    #[tokio::test]
    async fn pay_without_body_uses_empty_payload() {
        let req = Request::builder().method("POST").uri("/").body(Body::empty()).unwrap();

        let body = <Option<Json<MarkPaidRequest>> as FromRequest<()>>::from_request(req, &()).await.unwrap();
        assert!(body.is_none());

        let payload = body.map(|Json(p)| p).unwrap_or_default();
        assert!(payload.payment_reference.is_none());
        assert!(payload.validate().is_ok());
    }

    #[tokio::test]
    async fn cancel_with_json_body_is_read() {
        let req = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"notes":"estorno"}"#))
            .unwrap();

        let body = <Option<Json<CancelCommissionRequest>> as FromRequest<()>>::from_request(req, &()).await.unwrap();
        let payload = body.map(|Json(p)| p).unwrap_or_default();
        assert_eq!(payload.notes.as_deref(), Some("estorno"));
    }
}
