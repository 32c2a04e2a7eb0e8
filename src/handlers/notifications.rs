use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::{
    database::NotificationStore,
    errors::{AppError, Result},
    middleware::{
        auth::AuthSession,
        extract::{AppJson, AppQuery},
    },
    models::notification::{MarkReadRequest, Notification, NotificationQuery},
    state::AppState,
};

// GET /notifications?unread_only=
pub async fn get_admin_notifications(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppQuery(query): AppQuery<NotificationQuery>,
) -> Result<Json<Vec<Notification>>> {
    if !session.is_admin() {
        return Err(AppError::Unauthorized);
    }

    let notifications = state
        .store
        .list_notifications(Notification::ADMIN_AUDIENCE, query.unread_only)
        .await?;

    tracing::debug!("📬 Found {} admin notifications", notifications.len());
    Ok(Json(notifications))
}

// PATCH /notifications/read
pub async fn mark_notifications_read(
    State(state): State<AppState>,
    AuthSession(session): AuthSession,
    AppJson(payload): AppJson<MarkReadRequest>,
) -> Result<Json<Value>> {
    if !session.is_admin() {
        return Err(AppError::Unauthorized);
    }

    let modified = state
        .store
        .mark_notifications_read(Notification::ADMIN_AUDIENCE, payload.ids.as_deref())
        .await?;

    tracing::info!("📖 Marked {} notifications as read", modified);

    Ok(Json(json!({
        "success": true,
        "message": format!("Marked {} notifications as read", modified),
        "modified_count": modified,
    })))
}
