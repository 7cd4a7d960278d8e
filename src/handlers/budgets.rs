// src/handlers/budgets.rs

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
    middleware::{i18n::Locale, identity::ActingUser, tenancy::TenantContext},
    models::{
        budget::{
            Budget, BudgetDetail, BudgetListQuery, ChangeBudgetStatusRequest, ConversionResult,
            CreateBudgetRequest, UpdateBudgetRequest,
        },
        pagination::Page,
    },
};

// =============================================================================
//  ÁREA 1: CRUD DE ORÇAMENTOS
// =============================================================================

// POST /api/budgets
#[utoipa::path(
    post,
    path = "/api/budgets",
    tag = "Budgets",
    request_body = CreateBudgetRequest,
    params(
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica"),
        ("x-user-id" = Uuid, Header, description = "Usuário que cria o orçamento")
    ),
    responses(
        (status = 201, description = "Orçamento criado", body = Budget),
        (status = 400, description = "Dados inválidos"),
        (status = 401, description = "Usuário não identificado")
    )
)]
pub async fn create_budget(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    user: ActingUser,
    Json(payload): Json<CreateBudgetRequest>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let budget = app_state.budget_service
        .create_budget(&mut *conn, tenant, user.0, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(budget)))
}

// GET /api/budgets
#[utoipa::path(
    get,
    path = "/api/budgets",
    tag = "Budgets",
    params(
        BudgetListQuery,
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Página de orçamentos", body = Page<Budget>),
        (status = 400, description = "Paginação inválida")
    )
)]
pub async fn list_budgets(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Query(query): Query<BudgetListQuery>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let page = app_state.budget_service
        .list_budgets(&mut *conn, tenant, &query)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(page)))
}

// GET /api/budgets/{id}
#[utoipa::path(
    get,
    path = "/api/budgets/{id}",
    tag = "Budgets",
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Orçamento e comissão vinculada", body = BudgetDetail),
        (status = 404, description = "Orçamento não encontrado")
    )
)]
pub async fn get_budget(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(budget_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let detail = app_state.budget_service
        .get_budget(&mut *conn, tenant, budget_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(detail)))
}

// PUT /api/budgets/{id}
#[utoipa::path(
    put,
    path = "/api/budgets/{id}",
    tag = "Budgets",
    request_body = UpdateBudgetRequest,
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Orçamento atualizado", body = Budget),
        (status = 404, description = "Orçamento não encontrado"),
        (status = 409, description = "Orçamento já convertido")
    )
)]
pub async fn update_budget(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(budget_id): Path<Uuid>,
    Json(payload): Json<UpdateBudgetRequest>,
) -> Result<impl IntoResponse, ApiError> {

    payload.validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let budget = app_state.budget_service
        .update_budget(&mut *conn, tenant, budget_id, &payload)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(budget)))
}

// DELETE /api/budgets/{id}
#[utoipa::path(
    delete,
    path = "/api/budgets/{id}",
    tag = "Budgets",
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 204, description = "Orçamento removido"),
        (status = 404, description = "Orçamento não encontrado"),
        (status = 409, description = "Orçamento já convertido")
    )
)]
pub async fn delete_budget(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(budget_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    app_state.budget_service
        .delete_budget(&mut *conn, tenant, budget_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
//  ÁREA 2: FLUXO DE STATUS E CONVERSÃO
// =============================================================================

// POST /api/budgets/{id}/status
#[utoipa::path(
    post,
    path = "/api/budgets/{id}/status",
    tag = "Budgets",
    request_body = ChangeBudgetStatusRequest,
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Status alterado", body = Budget),
        (status = 404, description = "Orçamento não encontrado"),
        (status = 409, description = "Orçamento já convertido"),
        (status = 422, description = "Transição de status inválida")
    )
)]
pub async fn change_budget_status(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(budget_id): Path<Uuid>,
    Json(payload): Json<ChangeBudgetStatusRequest>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let budget = app_state.budget_service
        .change_budget_status(&mut *conn, tenant, budget_id, payload.status)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(budget)))
}

// POST /api/budgets/{id}/convert
#[utoipa::path(
    post,
    path = "/api/budgets/{id}/convert",
    tag = "Budgets",
    params(
        ("id" = Uuid, Path, description = "ID do orçamento"),
        ("x-tenant-id" = Uuid, Header, description = "ID da Clínica")
    ),
    responses(
        (status = 200, description = "Orçamento convertido (com a comissão, se ativa)", body = ConversionResult),
        (status = 404, description = "Orçamento não encontrado"),
        (status = 409, description = "Orçamento já convertido"),
        (status = 422, description = "Status não permite conversão")
    )
)]
pub async fn convert_budget(
    State(app_state): State<AppState>,
    locale: Locale,
    tenant: TenantContext,
    Path(budget_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {

    let mut conn = get_tenant_connection(&app_state, &tenant)
        .await
        .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

    let result = app_state.budget_service
        .convert_budget(&mut *conn, tenant, budget_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(result)))
}
