use axum::http::{HeaderValue, Method};
use axum::Router;
use kindred::{
    db::{self, DatabaseConfig},
    get_db_pool,
    handlers::{self, AppState},
    utils, Config, Engine,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = DatabaseConfig::from_url(config.database_url.clone());
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    db::migrations::run_migrations(&pool).await?;

    let engine = Arc::new(Engine::with_postgres(pool, config.engine.clone()));

    // Sweep in this process so expiry events reach live feed subscribers
    let sweeper = engine.clone();
    let every = Duration::from_secs(config.sweep_interval_secs.max(1));
    tokio::spawn(async move { sweeper.run_sweeps(every).await });

    let internal = handlers::internal_routes(AppState::new(engine.clone()));
    let internal_listener = tokio::net::TcpListener::bind(("127.0.0.1", config.internal_port)).await?;
    tracing::info!("Internal routes on 127.0.0.1:{}", config.internal_port);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(internal_listener, internal).await {
            tracing::error!("Internal listener stopped: {}", e);
        }
    });

    let port = config.port;
    let app = create_router(engine, &config);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(engine: Arc<Engine>, config: &Config) -> Router {
    handlers::routes(AppState::new(engine)).layer(create_cors_layer(config))
}

fn create_cors_layer(config: &Config) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // ALLOWED_ORIGINS may list several comma-separated domains
    if let Some(cors_origins) = &config.allowed_origins {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            // Fallback to permissive if parsing fails
            cors = cors.allow_origin(Any);
        }
    } else {
        // Default to permissive for development
        cors = cors.allow_origin(Any);
    }

    cors
}
