use std::sync::Arc;

use econo::ServiceContext;
use econo_types::EconConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "econo=info,econo_server=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = EconConfig::from_env();
    let bind = std::env::var("ECONO_BIND").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let ctx = ServiceContext::initialize(config).await?;
    let app = econo_server::app(Arc::clone(&ctx));

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!(target = "econo_server", %bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    ctx.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!(target = "econo_server", "shutdown signal received");
}
