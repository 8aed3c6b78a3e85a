use conversation_previews::config::{Config, StoreBackend};
use conversation_previews::repositories::{ConversationStore, InMemoryStore, SqlStore};
use conversation_previews::{AppState, create_router};
use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Inizializza il logging (RUST_LOG, default info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Inizializza la configurazione
    let config = Config::from_env()?;
    config.print_info();

    match config.store_backend {
        StoreBackend::MySql => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL must be set in .env file")?;
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .max_lifetime(Duration::from_secs(config.connection_lifetime_secs))
                .connect(database_url)
                .await?;
            info!("Connected to database");
            serve(Arc::new(SqlStore::new(pool)), &config).await
        }
        StoreBackend::Memory => {
            info!("Using in-memory store, data is lost on shutdown");
            serve(Arc::new(InMemoryStore::new()), &config).await
        }
    }
}

async fn serve<S: ConversationStore>(
    store: Arc<S>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::from_config(store, config));

    // Crea il router
    let app = create_router(state);

    // Crea il listener TCP
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    // Avvia il server
    axum::serve(listener, app).await?;

    Ok(())
}
