use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use goguma_reputation::{
    app::create_app, handlers::AppState, spawn_cache_cleanup_task, CachedReputation,
    MarketBackend, Marketplace, PostgrestBackend, ReputationProvider, ReputationService,
    ServiceConfig,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Path to the service configuration file.
    #[clap(short, long, value_parser, default_value = "config/goguma.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let from_file = args.config.exists();
    let mut config = if from_file {
        ServiceConfig::from_file(&args.config)
            .with_context(|| format!("Failed to load configuration file: {:?}", args.config))?
    } else {
        ServiceConfig::default()
    };
    config.apply_env_overrides();

    let log_level_str = config.log_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level_str))
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    fmt::Subscriber::builder().with_env_filter(filter).init();

    if from_file {
        info!("Loaded configuration from: {:?}", args.config);
    } else {
        info!("No configuration file at {:?}, using defaults and environment", args.config);
    }

    config.validate().context("Invalid service configuration")?;
    let addr = config.socket_addr()?;

    info!("Starting 고구마마켓 reputation service...");

    let backend: Arc<dyn MarketBackend> = Arc::new(
        PostgrestBackend::new(
            config.backend.url.clone().unwrap_or_default(),
            config.backend.anon_key.clone().unwrap_or_default(),
            config.backend_timeout(),
        )
        .context("Failed to build backend client")?,
    );
    let service: Arc<dyn ReputationProvider> = Arc::new(ReputationService::new(backend.clone()));

    let reputation: Arc<dyn ReputationProvider> = if config.cache_ttl().is_zero() {
        info!("Charm temperature cache disabled");
        service
    } else {
        info!("Caching charm temperatures for {:?}", config.cache_ttl());
        let cache = Arc::new(CachedReputation::new(service, config.cache_ttl()));
        spawn_cache_cleanup_task(cache.clone(), config.cleanup_interval());
        cache as Arc<dyn ReputationProvider>
    };

    let marketplace = Arc::new(Marketplace::new(backend, reputation));
    let app = create_app(AppState::new(marketplace));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Reputation service listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
            info!("Received shutdown signal (Ctrl+C).");
        })
        .await
        .context("HTTP server failed")?;

    info!("Shutting down reputation service...");
    Ok(())
}
