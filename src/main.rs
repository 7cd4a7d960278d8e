//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Declaração dos nossos módulos
mod common;
mod config;
mod db;
mod docs;
mod handlers;
mod middleware;
mod models;
mod services;

// Importações principais
use crate::config::{AppConfig, AppState};
use crate::docs::ApiDoc;
use crate::middleware::tenancy::tenant_guard;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; sem ele, `info`
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = AppConfig::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    let app = build_router(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(app_state: AppState) -> Router {
    let pricing_routes = Router::new()
        .route("/suggestion", get(handlers::pricing::suggest_price))
        .route("/configs"
               ,post(handlers::pricing::create_price_config)
               .get(handlers::pricing::list_price_configs)
        )
        .route("/configs/{id}"
               ,delete(handlers::pricing::delete_price_config)
        )
        .layer(axum_middleware::from_fn(tenant_guard));

    let budget_routes = Router::new()
        .route("/"
               ,post(handlers::budgets::create_budget)
               .get(handlers::budgets::list_budgets)
        )
        .route("/{id}"
               ,get(handlers::budgets::get_budget)
               .put(handlers::budgets::update_budget)
               .delete(handlers::budgets::delete_budget)
        )
        .route("/{id}/status"
               ,post(handlers::budgets::change_budget_status)
        )
        .route("/{id}/convert"
               ,post(handlers::budgets::convert_budget)
        )
        .layer(axum_middleware::from_fn(tenant_guard));

    let commission_routes = Router::new()
        .route("/", get(handlers::commissions::list_commissions))
        .route("/summary", get(handlers::commissions::commission_summary))
        .route("/config"
               ,get(handlers::commissions::get_commission_config)
               .put(handlers::commissions::update_commission_config)
        )
        .route("/{id}", get(handlers::commissions::get_commission))
        .route("/{id}/pay", post(handlers::commissions::mark_commission_paid))
        .route("/{id}/cancel", post(handlers::commissions::cancel_commission))
        .layer(axum_middleware::from_fn(tenant_guard));

    // Combina tudo no router principal
    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/pricing", pricing_routes)
        .nest("/api/budgets", budget_routes)
        .nest("/api/commissions", commission_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state)
}
