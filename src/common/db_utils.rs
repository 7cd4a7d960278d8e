use crate::common::error::AppError;
use crate::config::AppState;
use crate::middleware::tenancy::TenantContext;

// ---
// Helper de conexão por tenant
// ---
/// Adquire uma conexão da pool e marca a sessão com o tenant atual.
/// As queries continuam filtrando `tenant_id` explicitamente; a variável de
/// sessão fica disponível para políticas do banco.
pub(crate) async fn get_tenant_connection(
    app_state: &AppState,
    tenant_ctx: &TenantContext,
) -> Result<sqlx::pool::PoolConnection<sqlx::Postgres>, AppError> {
    // O operador '?' converte automaticamente sqlx::Error -> AppError::DatabaseError
    let mut conn = app_state.db_pool.acquire().await?;

    // Escopo de sessão: a conexão volta para a pool, então sobrescrevemos a cada aquisição
    sqlx::query("SELECT set_config('app.tenant_id', $1, false)")
        .bind(tenant_ctx.0.to_string())
        .execute(&mut *conn)
        .await?;

    Ok(conn)
}
