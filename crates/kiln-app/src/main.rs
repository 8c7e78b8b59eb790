use std::sync::Arc;

use kiln_app::app::router;
use kiln_core::config::load_config;
use kiln_db::store::memory::MemoryStore;
use kiln_service::auth::UserAuth;
use salvo::Listener;
use salvo::conn::TcpListener;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, reload};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (filter_layer, filter_handle) = reload::Layer::new(EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(filter_layer).with(
        fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true),
    );
    tracing::subscriber::set_global_default(subscriber)?;

    // ldap3 reports through the `log` facade
    tracing_log::LogTracer::init()?;

    tracing::info!("Starting Kiln frontend");

    let config = load_config()?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        origin = %config.server.origin(),
        "Configuration loaded"
    );

    if let Ok(filter) = EnvFilter::try_new(config.logging.level.as_str()) {
        if let Err(e) = filter_handle.modify(|current| *current = filter) {
            tracing::warn!(error = %e, "Failed to update log filter from config");
        }
    } else {
        tracing::warn!(level = %config.logging.level, "Invalid log level in config, keeping debug");
    }

    let store = Arc::new(MemoryStore::new());
    let auth = UserAuth::new(&config, store)?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let acceptor = TcpListener::new(bind_addr.clone()).bind().await;

    let router = router(Arc::new(config), Arc::new(auth))?;

    tracing::info!("Server listening on {bind_addr}");

    salvo::Server::new(acceptor).serve(router).await;

    Ok(())
}
