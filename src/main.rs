mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use services::mailer::{CodeMailer, LogMailer, ResendMailer};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gymdesk=info,tower_http=info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL required");
    let config = config::AppConfig::from_env();

    let pool = db::init_pool(&database_url)
        .await
        .expect("database init failed");

    let mailer: Arc<dyn CodeMailer> = match &config.mail {
        Some(mail) => Arc::new(ResendMailer::new(mail)),
        None => {
            tracing::warn!("RESEND_API_KEY/RESEND_FROM not set; access codes will be logged");
            Arc::new(LogMailer)
        }
    };

    // Spawn background auto-checkout task.
    let _auto_checkout = config
        .auto_checkout
        .enabled
        .then(|| services::auto_checkout::spawn_auto_checkout_task(pool.clone(), config.auto_checkout));

    let port = config.port;
    let state = state::AppState::new(pool, config, mailer);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "gymdesk listening");
    axum::serve(listener, app).await.expect("server failed");
}
