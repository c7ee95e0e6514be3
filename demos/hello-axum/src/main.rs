use axum::{Router, routing::get};

const GREETING: &str = "Hello from Slipway!";
const PORT: u16 = 5000;

async fn health() -> &'static str {
    "ok"
}

async fn hello() -> &'static str {
    GREETING
}

fn app() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/", get(hello))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", PORT))
        .await
        .expect("failed to bind");

    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app()).await.unwrap();
}
