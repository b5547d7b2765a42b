//! Serve the model selected by `MODEL` (built-in name or path to a JSON file).
//!
//! Run: `MODEL=alumnos cargo run`. Optional: DATABASE_URL, HOST, PORT,
//! DB_MAX_CONNECTIONS, BODY_LIMIT_BYTES, RUST_LOG.

use catalog_api::{build_router, create_pool, load_model, prepare, resolve, ServerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catalog_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let server = ServerConfig::from_env()?;
    let model = resolve(&load_model(&server.model).await?)?;
    let database_url = server
        .database_url
        .clone()
        .unwrap_or_else(|| model.database_url.clone());
    tracing::info!(
        model = %model.name,
        entities = model.entities.len(),
        database = %database_url,
        "model loaded"
    );

    let pool = create_pool(&database_url, server.max_connections).await?;
    let state = prepare(pool, model).await?;
    let app = build_router(state, server.body_limit);

    let addr = server.bind_addr();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
