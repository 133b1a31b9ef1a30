//! HTTP surface: one `GET /` route that renders QR codes.

use super::identity::ClientIdentity;
use super::query::{ArgumentError, QrOptions};
use super::render::{data_url, render_png_blocking, RenderError};
use crate::SharedRegistry;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::collections::HashMap;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

/// Shared state handed to every request.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Per-client admission control.
    pub limiter: SharedRegistry,
}

impl AppState {
    /// Wraps an existing registry.
    pub fn new(limiter: SharedRegistry) -> Self {
        Self { limiter }
    }
}

/// Builds the application router.
///
/// Serve it with `into_make_service_with_connect_info::<SocketAddr>()` so
/// clients without forwarding headers are keyed by peer address.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(qr))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct Message<'a> {
    status: u16,
    message: &'a str,
}

#[derive(Serialize)]
struct Encoded {
    status: u16,
    data: String,
}

enum ApiError {
    RateLimited,
    Argument(ArgumentError),
    Render(RenderError),
}

impl From<ArgumentError> for ApiError {
    fn from(err: ArgumentError) -> Self {
        Self::Argument(err)
    }
}

impl From<RenderError> for ApiError {
    fn from(err: RenderError) -> Self {
        Self::Render(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Rate limit exceeded, slow down!".to_string(),
            ),
            Self::Argument(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Render(err @ RenderError::Encode(_)) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Render(RenderError::TooLarge { side }) => {
                debug!(side, "Rejected oversized QR image");
                (
                    StatusCode::BAD_REQUEST,
                    ArgumentError::Invalid("box_size").to_string(),
                )
            }
            Self::Render(err) => {
                error!(error = %err, "QR rendering failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(Message {
            status: status.as_u16(),
            message: &message,
        });
        (status, body).into_response()
    }
}

async fn qr(
    State(state): State<AppState>,
    peer: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Response, ApiError> {
    let identity = ClientIdentity::from_parts(&headers, peer.map(|ConnectInfo(addr)| addr));
    if !state.limiter.check(&identity, true) {
        return Err(ApiError::RateLimited);
    }

    let options = QrOptions::from_query(&query)?;
    debug!(
        client = %identity,
        len = options.data.len(),
        version = ?options.version,
        "Rendering QR code"
    );

    let base64 = options.base64;
    let png = render_png_blocking(options).await?;

    if base64 {
        let body = Encoded {
            status: StatusCode::OK.as_u16(),
            data: data_url(&png),
        };
        Ok(Json(body).into_response())
    } else {
        Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
    }
}
