use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voyra_api::AppState;
use voyra_booking::CodeGenerator;
use voyra_store::{Config, DbClient, PgCatalogRepository, PgScheduleStore, PgTemplateRepository};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "voyra_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().expect("Failed to load config");
    tracing::info!("Starting Voyra API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let codes = CodeGenerator::new(
        &config.booking_rules.reservation_code_prefix,
        config.booking_rules.reservation_code_length,
        config.booking_rules.reservation_code_attempts,
    );

    let state = AppState {
        catalog: Arc::new(PgCatalogRepository::new(db.pool.clone())),
        templates: Arc::new(PgTemplateRepository::new(db.pool.clone())),
        schedule: Arc::new(PgScheduleStore::new(db.pool.clone(), codes)),
    };

    let app = voyra_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
