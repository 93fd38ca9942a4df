use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::filter::LevelFilter;

use rekber::{
    config::Config,
    db::db::DBClient,
    routes::create_router,
    service::{background_jobs::start_auto_dispute_job, payment_gateway::MidtransGateway},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::init()?;

    let level = LevelFilter::from_str(&config.log_level).unwrap_or(LevelFilter::DEBUG);
    tracing_subscriber::fmt().with_max_level(level).init();

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    tracing::info!("Connection to the database is successful");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;

    let gateway = MidtransGateway::new(&config).context("failed to build payment gateway client")?;
    tracing::info!(
        "Payment gateway configured ({})",
        if config.midtrans_is_production { "production" } else { "sandbox" }
    );

    let app_state = Arc::new(AppState::new(DBClient::new(pool), config.clone(), Arc::new(gateway)));

    tokio::spawn(start_auto_dispute_job(app_state.clone()));

    let allowed_origins = ["http://localhost:5173", "http://localhost:8000"]
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);

    let app = create_router(app_state).layer(cors);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    tracing::info!("Server is running on http://localhost:{}", config.port);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
