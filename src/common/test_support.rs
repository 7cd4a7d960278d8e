// Utilitários para os testes que precisam de um Postgres real.
// Rode com: DATABASE_URL=postgres://... cargo test -- --ignored

use sqlx::{postgres::PgPoolOptions, PgPool};

pub(crate) async fn test_pool() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL deve ser definida para os testes de banco");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("falha ao conectar no banco de testes");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("falha ao rodar as migrações de teste");

    pool
}
