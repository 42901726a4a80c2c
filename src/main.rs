use axum::{Router, http::HeaderValue};
use std::sync::Arc;
use talent_sync::{
    AppState,
    services::{run_change_poll_service, run_subscription_renewal_service},
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }
    env_logger::init();

    let state = Arc::new(AppState::new().await?);

    // Start background change poller (startup + daily at UTC midnight)
    if state.env_vars.disable_polling {
        log::info!("Change polling disabled (DISABLE_POLLING=true)");
    } else {
        let poller = state.poller.clone();
        let processor = state.processor.clone();
        tokio::spawn(async move {
            run_change_poll_service(poller, processor).await;
        });
    }

    // Start background registration renewal
    {
        let store = state.store.clone();
        let subscriptions = state.subscriptions.clone();
        let interval = state.env_vars.subscription_renewal_interval_seconds;
        tokio::spawn(async move {
            run_subscription_renewal_service(store, subscriptions, interval).await;
        });
    }

    let origins: Vec<HeaderValue> = state
        .env_vars
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(if origins.is_empty() {
            AllowOrigin::any()
        } else {
            AllowOrigin::list(origins)
        })
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(talent_sync::routes::create_routes(state.clone()))
        .layer(cors);

    let addr = format!("0.0.0.0:{}", state.env_vars.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    log::info!("Server running on {}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
