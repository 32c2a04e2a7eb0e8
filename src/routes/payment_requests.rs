use axum::{routing::get, Router};

use crate::handlers::payment_requests::{
    create_payment_request, decide_payment_request, get_payment_requests,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        // GET /payment-request - List requests (status, studentPhone, id filters)
        // POST /payment-request - Submit a payment claim
        // PATCH /payment-request - Approve or reject a pending request (admin)
        .route(
            "/",
            get(get_payment_requests)
                .post(create_payment_request)
                .patch(decide_payment_request),
        )
}
