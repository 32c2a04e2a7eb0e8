use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::payment_request::PaymentRequest;
use crate::models::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub audience: String,
    pub notification_type: String, // "payment_request"
    pub title: String,
    pub message: String,
    pub priority: Priority,
    pub related_id: String,
    pub is_read: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub const ADMIN_AUDIENCE: &'static str = "admin";

    /// Admin alert for a freshly submitted payment claim.
    ///
    /// The id is derived from the request id, so delivering the same request
    /// twice overwrites the same notification instead of adding a second one.
    pub fn for_payment_request(request: &PaymentRequest, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("payment-request:{}", request.id),
            audience: Self::ADMIN_AUDIENCE.to_string(),
            notification_type: "payment_request".to_string(),
            title: format!("New payment request from {}", request.student_name),
            message: format!(
                "{} claims a payment of {} EGP for \"{}\" (paid from {})",
                request.student_name,
                format_amount(request.amount_paid),
                request.course_name,
                request.payment_phone
            ),
            priority: Priority::High,
            related_id: request.id.clone(),
            is_read: false,
            created_at: now,
        }
    }
}

fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 {
        format!("{:.0}", amount)
    } else {
        format!("{:.2}", amount)
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct MarkReadRequest {
    pub ids: Option<Vec<String>>,
}
