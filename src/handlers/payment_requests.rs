use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::{
    errors::Result,
    middleware::{
        auth::{AuthSession, MaybeSession},
        extract::{AppJson, AppQuery},
    },
    models::payment_request::{
        CreatePaymentRequest, DecidePaymentRequest, PaymentRequest, PaymentRequestQuery,
        SubmitResponse,
    },
    state::AppState,
};

// POST /payment-request
pub async fn create_payment_request(
    State(state): State<AppState>,
    MaybeSession(session): MaybeSession,
    AppJson(payload): AppJson<CreatePaymentRequest>,
) -> Result<Json<SubmitResponse>> {
    tracing::info!("🧾 Payment request submitted by {}", payload.student_name.trim());

    let request = state.payments.submit(session.as_ref(), payload).await?;

    Ok(Json(SubmitResponse {
        success: true,
        message: "Payment request submitted successfully".to_string(),
        request_id: request.id,
    }))
}

// GET /payment-request?status=&studentPhone=&id=
pub async fn get_payment_requests(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppQuery(query): AppQuery<PaymentRequestQuery>,
) -> Result<Json<Vec<PaymentRequest>>> {
    let requests = state.payments.list(&session, query).await?;
    Ok(Json(requests))
}

// PATCH /payment-request
pub async fn decide_payment_request(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppJson(payload): AppJson<DecidePaymentRequest>,
) -> Result<Json<Value>> {
    let outcome = state.payments.decide(&session, payload).await?;

    Ok(Json(json!({
        "success": true,
        "message": outcome.message(),
        "requestId": outcome.request.id,
        "status": outcome.request.status,
        "enrollment": outcome.enrollment,
    })))
}
