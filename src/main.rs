use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod database;
mod feed;
mod routes;
mod spaces;

use config::Config;
use database::BookingStore;
use feed::aggregate::TransportFeed;
use feed::client::HttpFeedSource;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "transport_live_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize the booking record store
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite:./transport_bookings.db".to_string());
    let pool = SqlitePool::connect(&database_url).await?;
    let bookings = Arc::new(BookingStore::new(pool));
    bookings.init_tables().await?;

    // Initialize the live feed aggregator
    let source = HttpFeedSource::new(&config);
    let feed = Arc::new(TransportFeed::new(
        source,
        Duration::from_secs(config.cache_ttl_secs),
    ));

    let state = AppState { bookings, feed };

    let app = create_router(state).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server starting on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
