//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::ApiServer;
use crate::core::cli::{self, Cli, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::cache::SpanCache;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub cache: Option<Arc<SpanCache>>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli = cli::parse();
        match cli.command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli);
        Self::start_server(app).await
    }

    fn init(cli: &Cli) -> Self {
        let config = AppConfig::load(cli);

        let cache = if config.cache.enabled {
            let cache = Arc::new(SpanCache::new(
                config.cache.limits(),
                config.cache.mailbox_capacity,
                config.cache.request_timeout(),
            ));
            tracing::debug!(
                ttl_secs = config.cache.ttl_secs,
                max_spans = config.cache.max_spans,
                max_bytes = config.cache.max_bytes,
                "Span cache initialized"
            );
            Some(cache)
        } else {
            tracing::warn!("Span cache disabled; cache endpoints will report not initialized");
            None
        };

        let shutdown = ShutdownService::new(cache.clone());

        Self {
            shutdown,
            config,
            cache,
        }
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            cache_enabled = app.cache.is_some(),
            "{APP_NAME} starting"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}
