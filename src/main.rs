/// Concrete implementations of the [core] module.
pub mod app;

/// Application starting arguments and configuration.
pub mod config;

/// Core business logic.
pub mod core;

/// Error types.
pub mod error;

use clap::Parser;
use tracing::info;

#[tokio::main]
async fn main() {
    let args = crate::config::StartArgs::parse();
    let app = crate::app::state::AppState::new(&args).await;

    let addr = args.address();
    let origins = args.allowed_origins();

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("error while starting TCP listener");

    let router = crate::app::server::router::router(app.clone(), origins);

    info!("Listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Unable to listen for shutdown signal: {e}");
                std::future::pending::<()>().await;
            }
            app.shutdown();
        })
        .await
        .expect("error while starting server");
}
