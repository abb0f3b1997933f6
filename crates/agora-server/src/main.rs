use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use agora_db::Database;
use agora_gateway::{Gateway, LogNotifier, Moderator, Notifier, WebhookNotifier};
use agora_server::build_app;
use agora_server::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agora=debug,agora_gateway=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Database::open(&config.db_path)?;

    let notifier: Arc<dyn Notifier> = match &config.notify_url {
        Some(url) => {
            info!("friend-online notifications go to {}", url);
            Arc::new(WebhookNotifier::new(url.clone())?)
        }
        None => Arc::new(LogNotifier),
    };

    let gateway = Gateway::new(
        Arc::new(db),
        Moderator::new(&config.banned_words),
        notifier,
        config.gateway(),
    );

    let app = build_app(gateway);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Agora server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
