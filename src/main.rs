use clap::Parser;
use rasoi::{
    api::{handlers::AppState, routes},
    cli::{Cli, Commands},
    config::Settings,
    db, ingest,
    llm::OllamaClient,
    rag::{RagEngine, VectorIndex},
    Error, Result,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file if it exists
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rasoi=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;
    settings.validate()?;

    match cli.command {
        Commands::Serve { port, host } => {
            serve(settings, port, host).await?;
        }
        Commands::Migrate => {
            migrate(settings).await?;
        }
        Commands::Import { file } => {
            import(settings, file).await?;
        }
        Commands::Reindex => {
            reindex(settings).await?;
        }
        Commands::Search { query, limit } => {
            let server_url = format!("http://{}:{}", settings.server.host, settings.server.port);
            rasoi::cli::commands::search(&server_url, &query, limit).await?;
        }
    }

    Ok(())
}

fn build_engine(settings: &Settings) -> Result<Arc<RagEngine>> {
    let index = Arc::new(VectorIndex::new(&settings.search.embeddings_path));
    let ollama = Arc::new(OllamaClient::new(settings.ollama.clone())?);

    Ok(Arc::new(RagEngine::new(
        index,
        ollama.clone(),
        ollama,
        settings.search.clone(),
    )))
}

async fn serve(mut settings: Settings, port: Option<u16>, host: Option<String>) -> Result<()> {
    // Override settings with CLI arguments
    if let Some(port) = port {
        settings.server.port = port;
    }
    if let Some(host) = host {
        settings.server.host = host;
    }

    info!("Starting Rasoi server");
    info!("Database: {}", settings.database.url);
    info!("Server: {}:{}", settings.server.host, settings.server.port);

    let pool = db::init_pool_with_config(&settings.database).await?;
    info!(
        "Database connection established (max_connections: {})",
        settings.database.max_connections
    );

    db::run_migrations(&pool).await?;
    info!("Database migrations completed");

    let engine = build_engine(&settings)?;

    // Attach to a previously persisted index; a missing file just means
    // search starts lexical-only until a reindex runs.
    match engine.reload().await {
        Ok(0) => warn!("Vector index is empty; run a reindex to enable semantic search"),
        Ok(count) => info!("Vector index ready with {} embeddings", count),
        Err(e) => warn!("Failed to load vector index: {e}"),
    }

    let state = AppState {
        pool,
        engine,
        settings: settings.clone(),
    };

    let app = routes::create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Internal(format!("Server error: {e}")))?;

    info!("Shutting down...");
    Ok(())
}

async fn migrate(settings: Settings) -> Result<()> {
    info!("Running database migrations");

    let pool = db::init_pool(&settings.database.url).await?;
    db::run_migrations(&pool).await?;

    println!("✓ Database migrations completed successfully");
    Ok(())
}

async fn import(settings: Settings, file: String) -> Result<()> {
    info!("Importing recipes from {}", file);

    let pool = db::init_pool(&settings.database.url).await?;
    db::run_migrations(&pool).await?;

    let report = ingest::import_recipes(&pool, &file).await?;
    println!(
        "✓ Import complete: {} imported, {} skipped",
        report.imported, report.skipped
    );

    Ok(())
}

async fn reindex(settings: Settings) -> Result<()> {
    let pool = db::init_pool(&settings.database.url).await?;
    db::run_migrations(&pool).await?;

    let engine = build_engine(&settings)?;

    let recipes = db::recipes::list_indexable_recipes(&pool).await?;
    println!("Indexing {} recipes...", recipes.len());

    let indexed = engine.index_recipes(recipes).await?;
    println!("✓ Reindex complete: {indexed} recipes embedded");

    Ok(())
}
