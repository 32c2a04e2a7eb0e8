use axum::{
    routing::{get, patch},
    Router,
};

use crate::handlers::notifications::{get_admin_notifications, mark_notifications_read};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(get_admin_notifications))
        .route("/read", patch(mark_notifications_read))
}
