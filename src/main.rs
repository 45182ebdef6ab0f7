use coderoom::config::Config;
use coderoom::db::{MemoryRoomDirectory, PgRoomDirectory, RoomDirectory};
use coderoom::routes::create_app;
use coderoom::state::AppState;
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "coderoom=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Pick the room directory backend
    let directory: Arc<dyn RoomDirectory> = match &config.db_url {
        Some(db_url) => match PgRoomDirectory::connect(db_url).await {
            Ok(directory) => {
                info!("Database initialized successfully");
                Arc::new(directory)
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                warn!("Falling back to in-memory rooms; they will not survive a restart");
                Arc::new(MemoryRoomDirectory::default())
            }
        },
        None => {
            warn!("No database URL configured - rooms are kept in memory only");
            Arc::new(MemoryRoomDirectory::default())
        }
    };

    let state = match AppState::new(&config, directory) {
        Ok(state) => state,
        Err(e) => {
            error!("Invalid room configuration: {}", e);
            std::process::exit(1);
        }
    };
    let app = create_app(state, &config);

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Server running on http://{}", config.server_address());
    info!("📡 WebSocket rooms available at ws://{}/ws/{{room_id}}", config.server_address());
    if config.is_development() {
        info!("📚 Swagger UI available at http://{}/swagger", config.server_address());
    }

    axum::serve(listener, app)
        .await
        .expect("Server failed to start");
}
