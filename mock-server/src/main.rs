use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gamejolt_mock=info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(
        game_id = gamejolt_mock::GAME_ID,
        private_key = gamejolt_mock::PRIVATE_KEY,
        "listening on http://{addr}{}",
        gamejolt_mock::API_ROOT
    );
    gamejolt_mock::run(listener).await
}
