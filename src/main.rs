use std::sync::Arc;

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use portal_gtr::{
    attendance::GeoVictoriaClient, auth::jwt::JwtService, config::AppConfig, db, routes,
    state::AppState,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        geovictoria_configured = config.geovictoria_user.is_some(),
        "loaded portal configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    run_migrations(&pool)?;

    let jwt = JwtService::from_config(&config)?;
    let attendance = Arc::new(GeoVictoriaClient::from_config(&config));
    let listen_addr = format!("{}:{}", config.server_host, config.server_port);

    let state = AppState::new(pool, config, jwt, attendance);
    let router = routes::create_router(state);

    let listener = TcpListener::bind(&listen_addr).await?;
    tracing::info!("listening on {listen_addr}");
    axum::serve(listener, router).await?;

    Ok(())
}

fn run_migrations(pool: &db::PgPool) -> anyhow::Result<()> {
    let mut conn = pool.get()?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow::anyhow!("failed to run migrations: {err}"))?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
