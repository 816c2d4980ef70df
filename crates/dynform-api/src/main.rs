//! dynform API server

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dynform_api::{build_router, build_service, ApiState, Settings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::load()?;
    let service = build_service(&settings)?;
    let app = build_router(
        ApiState {
            service: Arc::new(service),
        },
        &settings.base_path,
    );

    let listener = tokio::net::TcpListener::bind(&settings.bind).await?;
    tracing::info!("dynform API listening on {}", settings.bind);
    axum::serve(listener, app).await?;
    Ok(())
}
