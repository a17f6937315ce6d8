pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod entities;
pub mod services;

use std::sync::Arc;
use tokio::signal;

use anyhow::Context;
use clients::sendgrid::SendGridClient;
pub use config::Config;
use config::Secrets;
use services::{DisabledMailer, Mailer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let secrets = Secrets::from_env()?;

    let prometheus_handle = if config.observability.metrics_enabled {
        use metrics_exporter_prometheus::PrometheusBuilder;
        let builder = PrometheusBuilder::new();
        let handle = builder
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        info!("Prometheus metrics recorder initialized");
        Some(handle)
    } else {
        None
    };

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let fmt_layer = tracing_subscriber::fmt::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;

        let (layer, task) = tracing_loki::builder()
            .label("app", "esprelay")?
            .extra_field("env", "production")?
            .build_url(url)?;

        tokio::spawn(task);

        registry.with(layer).init();
        info!(
            "Loki logging initialized at {}",
            config.observability.loki_url
        );
    } else {
        registry.init();
    }

    let mailer: Arc<dyn Mailer> = match &secrets.sendgrid_api_key {
        Some(key) => Arc::new(SendGridClient::new(
            key.clone(),
            config.mail.from_email.clone(),
            config.mail.from_name.clone(),
        )?),
        None => {
            warn!("SENDGRID_API_KEY is not set; reset emails will not be delivered");
            Arc::new(DisabledMailer)
        }
    };

    let port = config.server.port;
    let state = api::create_app_state(config, &secrets.jwt_secret, mailer, prometheus_handle)
        .await
        .context("Failed to create app state")?;

    let app = api::router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("esprelay v{} listening on {addr}", env!("CARGO_PKG_VERSION"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
