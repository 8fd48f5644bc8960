use std::convert::Infallible;
use std::sync::Arc;

use anyhow::{Context, Result};
use markforge_contracts::wire::{ErrorBody, GenerateLogoRequest, GenerateLogoResponse};
use serde::Serialize;
use serde_json::json;
use tracing::{error, info, warn};
use warp::filters::body::BodyDeserializeError;
use warp::http::StatusCode;
use warp::reject::{LengthRequired, MethodNotAllowed, PayloadTooLarge, UnsupportedMediaType};
use warp::reply::Response;
use warp::{Filter, Rejection, Reply};

use crate::client::Relay;
use crate::config::ServerConfig;
use crate::error::RelayError;
use crate::relay::LogoRelay;

/// Reference images travel inline, so requests are large.
pub const BODY_LIMIT_BYTES: u64 = 50 * 1024 * 1024;

pub fn routes(
    relay: Arc<dyn Relay>,
    model: String,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone + Send + Sync + 'static {
    let generate = warp::path!("api" / "generate-logo")
        .and(warp::post())
        .and(warp::body::content_length_limit(BODY_LIMIT_BYTES))
        .and(warp::body::json())
        .and(warp::any().map(move || relay.clone()))
        .and_then(handle_generate);

    let health = warp::path!("health")
        .and(warp::get())
        .map(move || warp::reply::json(&json!({ "status": "ok", "model": model })));

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    generate
        .or(health)
        .recover(handle_rejection)
        .with(cors)
}

pub async fn serve(config: ServerConfig) -> Result<()> {
    let relay = LogoRelay::from_config(&config.relay);
    let model = relay.model().name.clone();
    let addr = config.socket_addr();
    let (bound, server) = warp::serve(routes(Arc::new(relay), model.clone()))
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {err}");
            }
        })
        .with_context(|| format!("failed to bind relay server on {addr}"))?;
    info!(%bound, %model, "relay listening");
    server.await;
    info!("relay stopped");
    Ok(())
}

async fn handle_generate(
    body: GenerateLogoRequest,
    relay: Arc<dyn Relay>,
) -> Result<Response, Infallible> {
    let (request, skipped) = body.into_generation_request();
    for image in &skipped {
        warn!(index = image.index, "skipping reference image: {}", image.reason);
    }

    match relay.generate(&request).await {
        Ok(image) => Ok(json_response(&GenerateLogoResponse { image }, StatusCode::OK)),
        Err(err) => {
            let status = StatusCode::from_u16(err.http_status())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            if status.is_server_error() {
                error!(status = status.as_u16(), kind = err.kind(), "generate-logo failed: {err}");
            }
            let details = match &err {
                RelayError::Validation(_) => None,
                other => Some(other.to_string()),
            };
            Ok(json_response(
                &ErrorBody {
                    message: err.user_message(),
                    details,
                },
                status,
            ))
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<Response, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found.".to_string())
    } else if let Some(cause) = err.find::<BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, format!("Invalid request body: {cause}"))
    } else if err.find::<PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "Request body is too large.".to_string(),
        )
    } else if err.find::<LengthRequired>().is_some() {
        (
            StatusCode::LENGTH_REQUIRED,
            "Content-Length is required.".to_string(),
        )
    } else if err.find::<UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "Expected a JSON body.".to_string(),
        )
    } else if err.find::<MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "Method not allowed.".to_string(),
        )
    } else {
        error!(?err, "unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Error generating logo.".to_string(),
        )
    };
    Ok(json_response(
        &ErrorBody {
            message,
            details: None,
        },
        status,
    ))
}

fn json_response<T: Serialize>(body: &T, status: StatusCode) -> Response {
    warp::reply::with_status(warp::reply::json(body), status).into_response()
}
