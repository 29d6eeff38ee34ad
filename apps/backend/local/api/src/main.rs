#[cfg(not(any(all(target_os = "macos", target_arch = "aarch64"), target_os = "ios")))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use arogya_inference::openapi::DOCS_PATH;
use arogya_inference::{InferenceConfig, InferenceState, inference_router};
use axum::http::HeaderValue;
use dotenv::dotenv;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting MRI Disease Prediction API");

    let config = config::Config::from_env()?;
    let inference_config = InferenceConfig::from_env();
    tracing::info!(
        "Loaded configuration: model={}, input_size={}, allowed_extensions={:?}",
        inference_config.model_path,
        inference_config.input_size,
        inference_config.validation.allowed_extensions
    );
    tracing::info!("Model will be loaded on first prediction request");

    let cors = cors_layer(&config.cors_allowed_origins)?;
    let app = inference_router(InferenceState::from_config(inference_config)).layer(cors);

    let addr = config.bind_addr();
    tracing::info!("API listening on http://{}", addr);
    tracing::info!("Interactive endpoints: GET / (status), POST /predict (upload)");
    tracing::info!("API documentation at http://{}{}", addr, DOCS_PATH);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Credentialed CORS for the web front-end. Wildcards are not allowed together
/// with credentials, so methods and headers mirror the preflight request.
fn cors_layer(origins: &[String]) -> Result<CorsLayer, config::ConfigError> {
    let origins = origins
        .iter()
        .map(|o| {
            HeaderValue::from_str(o)
                .map_err(|_| config::ConfigError::InvalidValue("CORS_ALLOWED_ORIGINS".to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_accepts_default_origins() {
        let origins: Vec<String> = config::DEFAULT_CORS_ORIGINS
            .iter()
            .map(|o| o.to_string())
            .collect();
        assert!(cors_layer(&origins).is_ok());
    }

    #[test]
    fn test_cors_layer_rejects_invalid_header_value() {
        let origins = vec!["http://bad\norigin".to_string()];
        assert!(cors_layer(&origins).is_err());
    }
}
