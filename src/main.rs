use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tracing_subscriber::EnvFilter;

use scorekeeper::api;
use scorekeeper::bot::Bot;
use scorekeeper::commands::CommandTable;
use scorekeeper::config::Config;
use scorekeeper::db::Database;
use scorekeeper::metrics;
use scorekeeper::transport::{DiscordTransport, MemoryTransport, MessageTransport};

#[tokio::main]
async fn main() {
    // A missing .env is fine; the variables may come from the environment.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("scorekeeper=debug,info")),
        )
        .init();

    let config = Config::load().expect("Failed to load configuration");
    tracing::info!(settings = %config.settings_path.display(), "Configuration loaded");

    metrics::register_metrics();

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to initialize database");
    let db = Arc::new(db);

    let transport: Arc<dyn MessageTransport> = match &config.discord_token {
        Some(token) => Arc::new(DiscordTransport::new(token.clone(), &config.discord_api_base)),
        None => {
            tracing::warn!("DISCORD_TOKEN not set; running offline with an in-memory transport");
            Arc::new(MemoryTransport::new())
        }
    };

    let commands = Arc::new(CommandTable::from_settings(&config.settings));
    let bot = Arc::new(Bot::new(db.clone(), transport, config.settings.clone()));
    bot.log_ready(&commands.names()).await;

    let app = api::router(bot, commands).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind((config.bind_address.as_str(), config.port))
        .await
        .unwrap_or_else(|e| {
            panic!(
                "Failed to bind to {}:{}: {e}",
                config.bind_address, config.port
            )
        });

    tracing::info!(
        "Scorekeeper listening on {}:{}",
        config.bind_address,
        config.port
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
        .expect("Failed to start server");

    db.close().await;
}
