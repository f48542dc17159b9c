//! OpenSASE Back-office - returns, refund decisions and invoices for the store admin panel

use anyhow::Result;
use opensase_backoffice::{api, config::AppConfig, courier::XpressbeesClient, messaging::TwilioWhatsApp, store::{DocumentStore, InMemoryStore, PgDocumentStore}, AppState};
use std::{sync::Arc, time::Duration};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let config = AppConfig::from_env()?;

    let store: Arc<dyn DocumentStore> = match &config.database_url {
        Some(url) => Arc::new(PgDocumentStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, documents are kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };
    if !config.courier.has_credentials() { tracing::warn!("courier credentials missing, return creation will be refused"); }
    if !config.messaging.is_configured() { tracing::warn!("messaging not configured, rejection notices will be skipped"); }

    let http = reqwest::Client::builder().timeout(Duration::from_secs(30)).build()?;
    let state = AppState {
        courier: Arc::new(XpressbeesClient::new(http.clone(), &config.courier)),
        notifier: Arc::new(TwilioWhatsApp::new(http, &config.messaging)),
        store,
        config: Arc::new(config),
    };

    let port = state.config.port;
    let app = api::router(state);
    tracing::info!("🚀 OpenSASE Back-office listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}
