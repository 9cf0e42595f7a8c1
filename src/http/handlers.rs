use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::checkout::CheckoutService;
use crate::checkout::types::CheckoutRequest;
use crate::error::CheckoutError;

/// Shared state for the HTTP surface. Everything else the marketplace
/// serves (catalog, cart CRUD, search) lives in other services.
#[derive(Clone)]
pub struct AppState {
    pub checkout: Arc<CheckoutService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz_handler))
        .route("/orders/create", post(create_order_handler))
        .with_state(state)
}

async fn healthz_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

#[derive(Debug, Serialize)]
struct CreateOrderBody {
    #[serde(rename = "orderId")]
    order_id: Uuid,
    message: String,
    #[serde(rename = "totalAmount")]
    total_amount: Decimal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

async fn create_order_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CheckoutRequest>,
) -> Response {
    // The session layer in front of this service resolves the caller and
    // forwards their id; a request without one never belongs here.
    let Some(user_id) = caller_id(&headers) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: "missing or invalid x-user-id header".to_string(),
            }),
        )
            .into_response();
    };

    match state.checkout.place_order(user_id, &request).await {
        Ok(receipt) => (
            StatusCode::CREATED,
            Json(CreateOrderBody {
                order_id: receipt.order_id,
                message: "Order created successfully".to_string(),
                total_amount: receipt.total_amount,
            }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn caller_id(headers: &HeaderMap) -> Option<i64> {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<i64>().ok())
}

fn status_for(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::IncompleteProfile(_)
        | CheckoutError::EmptyCart
        | CheckoutError::CartTooLarge { .. } => StatusCode::BAD_REQUEST,
        CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CheckoutError::Timeout | CheckoutError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: CheckoutError) -> Response {
    let status = status_for(&err);

    // Infrastructure detail stays in the logs; callers get a stable message.
    let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = ?err, "checkout failed");
        "Failed to create order due to a server error.".to_string()
    } else {
        err.to_string()
    };

    (status, Json(ErrorBody { error: message })).into_response()
}
