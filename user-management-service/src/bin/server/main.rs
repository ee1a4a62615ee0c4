use std::sync::Arc;

use auth::TokenEngine;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use user_management_service::auth::ports::AuthServicePort;
use user_management_service::auth::ports::CredentialStore;
use user_management_service::auth::ports::EventPublisher;
use user_management_service::auth::ports::SessionCache;
use user_management_service::auth::service::AuthService;
use user_management_service::auth::service::AuthSettings;
use user_management_service::config::BrokerBackend;
use user_management_service::config::CacheBackend;
use user_management_service::config::Config;
use user_management_service::domain::user::ports::UserServicePort;
use user_management_service::domain::user::service::UserService;
use user_management_service::inbound::http::router::create_router;
use user_management_service::outbound::cache::InMemorySessionCache;
use user_management_service::outbound::cache::RedisSessionCache;
use user_management_service::outbound::events::EventDispatcher;
use user_management_service::outbound::events::KafkaEventProducer;
use user_management_service::outbound::events::LoggingEventPublisher;
use user_management_service::outbound::repositories::PostgresUserRepository;
use user_management_service::telemetry;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::load()?;
    telemetry::init(config.env);

    tracing::info!(
        service = "user-management-service",
        version = env!("CARGO_PKG_VERSION"),
        env = ?config.env,
        "Service starting"
    );
    tracing::info!(
        http_port = config.server.http_port,
        cache_backend = ?config.cache.backend,
        broker_backend = ?config.broker.backend,
        topic = %config.broker.topic,
        token_ttl_secs = config.token.ttl_secs,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = config.database.max_connections,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool));

    let publisher: Arc<dyn EventPublisher> = match config.broker.backend {
        BrokerBackend::Kafka => Arc::new(KafkaEventProducer::new(&config.broker)?),
        BrokerBackend::Log => Arc::new(LoggingEventPublisher::new()),
    };
    let (dispatcher, dispatcher_worker) = EventDispatcher::spawn(
        publisher,
        config.broker.queue_capacity,
        config.broker.max_in_flight,
    );

    if config.token.secret.is_empty() {
        tracing::warn!("No token signing secret configured; every login will fail");
    }
    let token_engine = TokenEngine::new(config.token.secret.as_bytes(), config.token.max_ttl());
    let settings = AuthSettings {
        token_ttl: config.token.ttl(),
    };

    let auth_service: Arc<dyn AuthServicePort> = match config.cache.backend {
        CacheBackend::Redis => build_auth_service(
            Arc::clone(&user_repository),
            Arc::new(RedisSessionCache::new(&config.cache.url).await?),
            dispatcher,
            token_engine,
            settings,
        ),
        CacheBackend::Memory => {
            tracing::warn!("In-memory session cache selected; sessions are not shared between instances");
            build_auth_service(
                Arc::clone(&user_repository),
                Arc::new(InMemorySessionCache::new()),
                dispatcher,
                token_engine,
                settings,
            )
        }
    };
    let user_service: Arc<dyn UserServicePort> = Arc::new(UserService::new(user_repository));

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(
        auth_service,
        user_service,
        config.server.request_timeout(),
    );
    axum::serve(http_listener, http_application)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Http server stopped");

    // The router owned the last dispatcher handle, so the worker now drains and exits
    match tokio::time::timeout(config.server.shutdown_timeout(), dispatcher_worker).await {
        Ok(Ok(())) => tracing::info!("Pending events flushed"),
        Ok(Err(e)) => tracing::error!(error = %e, "Event dispatcher task failed"),
        Err(_) => tracing::warn!(
            timeout_secs = config.server.shutdown_timeout_secs,
            "Timed out flushing pending events"
        ),
    }

    Ok(())
}

fn build_auth_service<CS, SC>(
    store: Arc<CS>,
    cache: Arc<SC>,
    dispatcher: EventDispatcher,
    token_engine: TokenEngine,
    settings: AuthSettings,
) -> Arc<dyn AuthServicePort>
where
    CS: CredentialStore,
    SC: SessionCache,
{
    Arc::new(AuthService::new(
        store,
        cache,
        Arc::new(dispatcher),
        token_engine,
        settings,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
