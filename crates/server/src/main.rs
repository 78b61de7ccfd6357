use std::net::SocketAddr;

use anyhow::Context;
use axum::http::{HeaderValue, Method, header};
use backend::Credentials;
use secrecy::SecretString;
use server::{DeploymentImpl, routes};
use services::services::config::{load_config_from_file, save_config_to_file};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use utils::{assets::config_path, logging::init_tracing};

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let sentry_dsn = env_var("SENTRY_DSN");
    let _sentry = init_tracing("info", sentry_dsn.as_deref());

    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    let config_path = config_path();
    let config = load_config_from_file(&config_path).await;
    // Persist any defaults filled in while loading.
    save_config_to_file(&config, &config_path)
        .await
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    let cors = match HeaderValue::from_str(&config.embed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin(AllowOrigin::exact(origin))
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE]),
        Err(e) => {
            tracing::warn!(origin = %config.embed_origin, error = %e, "Invalid embed origin, CORS disabled");
            CorsLayer::new()
        }
    };

    let api_key = env_var("BACKEND_API_KEY").map(SecretString::from);
    let deployment = DeploymentImpl::connect(config, api_key).await?;

    match env_var("BACKEND_USER_TOKEN") {
        Some(token) => {
            if let Err(e) = deployment.session().login(Credentials::token(token)).await {
                tracing::warn!(error = %e, "Stored user token was rejected");
            }
        }
        None => deployment.session().logout().await?,
    }

    let app = routes::router(deployment)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let host = env_var("HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let port = env_var("BACKEND_PORT")
        .map(|port| port.parse::<u16>())
        .transpose()
        .context("BACKEND_PORT must be a port number")?
        .unwrap_or(3001);
    let addr: SocketAddr = format!("{host}:{port}")
        .parse()
        .with_context(|| format!("invalid bind address {host}:{port}"))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "Dashboard API listening");
    axum::serve(listener, app).await?;
    Ok(())
}
