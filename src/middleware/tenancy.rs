// src/middleware/tenancy.rs

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::common::error::ApiError; // Usamos o nosso ApiError para rejeição

// O nome do nosso cabeçalho HTTP customizado
const TENANT_ID_HEADER: &str = "x-tenant-id";

// O contexto explícito do tenant (a clínica) que a requisição quer acessar.
// Todo serviço recebe este valor; não existe estado global de tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TenantContext(pub Uuid);

impl TenantContext {
    fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let value = headers.get(TENANT_ID_HEADER).ok_or_else(|| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "O cabeçalho X-Tenant-ID é obrigatório.",
            )
        })?;

        // Tenta converter o valor do cabeçalho para uma string
        let value_str = value.to_str().map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Cabeçalho X-Tenant-ID contém caracteres inválidos.",
            )
        })?;

        // Tenta converter a string para um UUID
        let tenant_id = Uuid::parse_str(value_str).map_err(|_| {
            ApiError::new(
                StatusCode::BAD_REQUEST,
                "Cabeçalho X-Tenant-ID inválido (não é um UUID).",
            )
        })?;

        Ok(TenantContext(tenant_id))
    }
}

impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // O guard já validou e guardou o contexto nas extensions
        if let Some(ctx) = parts.extensions.get::<TenantContext>() {
            return Ok(*ctx);
        }
        TenantContext::from_headers(&parts.headers)
    }
}

/// Middleware aplicado aos grupos de rotas da clínica: rejeita cedo
/// requisições sem tenant e deixa o contexto pronto para os handlers.
pub async fn tenant_guard(mut request: Request, next: Next) -> Result<Response, ApiError> {
    let ctx = TenantContext::from_headers(request.headers())?;
    tracing::debug!(tenant_id = %ctx.0, "tenant resolvido");
    request.extensions_mut().insert(ctx);
    Ok(next.run(request).await)
}
