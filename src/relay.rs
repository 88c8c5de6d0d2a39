//! HTTP relay that forwards single WhatsApp messages to the gateway, keeping the
//! gateway token on the server.

use crate::config::RelayConfig;
use crate::errors::AppError;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct RelayState {
    http: reqwest::Client,
    config: Arc<RelayConfig>,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SendRequest {
    pub to: String,
    pub message: String,
}

/// Body of the gateway's `POST /messages/text`.
#[derive(Debug, Serialize)]
struct GatewayText<'a> {
    to: &'a str,
    body: &'a str,
    typing_time: u32,
    channel: &'a str,
}

pub fn router(state: RelayState) -> Router {
    let cors = state.config.frontend_origin.as_deref().and_then(cors_layer);
    let router = Router::new()
        .route("/send-whatsapp", post(send_whatsapp))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let origin = match origin.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(err) => {
            warn!("ignoring FRONTEND_URL {origin:?}: {err}");
            return None;
        }
    };
    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    )
}

pub async fn send_whatsapp(
    State(state): State<RelayState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<Value>, AppError> {
    let to = request.to.trim();
    if to.is_empty() || request.message.trim().is_empty() {
        return Err(AppError::bad_request("to and message are required"));
    }
    info!(%to, "relaying whatsapp message");

    let payload = GatewayText {
        to,
        body: &request.message,
        typing_time: 0,
        channel: &state.config.channel_id,
    };
    let response = state
        .http
        .post(format!("{}/messages/text", state.config.gateway_url))
        .bearer_auth(&state.config.token)
        .json(&payload)
        .send()
        .await
        .map_err(|err| {
            error!("gateway unreachable: {err}");
            AppError::from(err)
        })?;

    let status = response.status();
    let text = response.text().await?;
    let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

    if status.is_success() {
        info!(status = status.as_u16(), "gateway accepted message");
        Ok(Json(body))
    } else {
        error!(status = status.as_u16(), "gateway rejected message: {body}");
        Err(AppError::upstream(body))
    }
}
