//! InkFlow relay server binary.

use inkflow_server::{ServerConfig, serve};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inkflow_server=debug,tower_http=debug".into()),
        )
        .init();

    serve(ServerConfig::from_env()).await
}
