use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::errors::AppError;
use crate::models::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Approved => "approved",
            PaymentStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "approved" => Ok(PaymentStatus::Approved),
            "rejected" => Ok(PaymentStatus::Rejected),
            other => Err(AppError::invalid_data(format!(
                "Unknown payment status: {}",
                other
            ))),
        }
    }
}

/// The administrative outcome applied to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn status(&self) -> PaymentStatus {
        match self {
            Decision::Approved => PaymentStatus::Approved,
            Decision::Rejected => PaymentStatus::Rejected,
        }
    }
}

/// A student's unverified claim of having paid for a course.
///
/// Stored as-is in the `payment_requests` collection. The row doubles as the
/// outbox entry for the admin notification: `admin_notified_at` stays empty
/// until the dispatcher has delivered it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub student_name: String,
    pub student_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    pub course_id: String,
    pub course_name: String,
    pub course_price: f64,
    pub amount_paid: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher_phone: Option<String>,
    pub payment_phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub approved_at: Option<DateTime<Utc>>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default, with = "timestamp::option")]
    pub admin_notified_at: Option<DateTime<Utc>>,
}

impl PaymentRequest {
    /// Builds a fresh `pending` request from a validated submission.
    pub fn from_submission(
        submission: CreatePaymentRequest,
        student_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let payment_phone = submission
            .payment_phone
            .filter(|phone| !phone.is_empty())
            .unwrap_or_else(|| submission.student_phone.clone());
        let course_price = submission.course_price.unwrap_or_default();

        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_name: submission.student_name,
            student_phone: submission.student_phone,
            student_email: submission.student_email,
            student_id,
            course_id: submission.course_id,
            course_name: submission.course_name,
            course_price,
            amount_paid: course_price,
            teacher_name: submission.teacher_name,
            teacher_phone: submission.teacher_phone,
            payment_phone,
            transaction_id: submission.transaction_id,
            status: PaymentStatus::Pending,
            admin_notes: None,
            rejection_reason: None,
            reviewed_by: None,
            created_at: now,
            approved_at: None,
            updated_at: now,
            admin_notified_at: None,
        }
    }

    /// Applies an administrative decision. Only `pending` requests move.
    pub fn decide(
        &mut self,
        decision: Decision,
        admin_notes: Option<String>,
        rejection_reason: Option<String>,
        reviewed_by: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        if self.status.is_terminal() {
            return Err(AppError::AlreadyDecided {
                id: self.id.clone(),
                status: self.status,
            });
        }

        self.status = decision.status();
        self.admin_notes = admin_notes;
        self.reviewed_by = reviewed_by;
        self.updated_at = now;

        match decision {
            Decision::Approved => self.approved_at = Some(now),
            Decision::Rejected => self.rejection_reason = rejection_reason,
        }

        Ok(())
    }
}

/// Submission body for `POST /payment-request`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "studentName is required"))]
    pub student_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "studentPhone is required"))]
    pub student_phone: String,
    pub student_email: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "courseId is required"))]
    pub course_id: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    #[validate(length(min = 1, message = "courseName is required"))]
    pub course_name: String,
    #[validate(range(min = 0.0, message = "coursePrice must not be negative"))]
    pub course_price: Option<f64>,
    pub teacher_name: Option<String>,
    pub teacher_phone: Option<String>,
    pub payment_phone: Option<String>,
    pub transaction_id: Option<String>,
}

impl CreatePaymentRequest {
    /// Trims every text field and drops optional ones left blank.
    pub fn normalized(self) -> Self {
        fn opt(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            student_name: self.student_name.trim().to_string(),
            student_phone: self.student_phone.trim().to_string(),
            student_email: opt(self.student_email),
            course_id: self.course_id.trim().to_string(),
            course_name: self.course_name.trim().to_string(),
            course_price: self.course_price,
            teacher_name: opt(self.teacher_name),
            teacher_phone: opt(self.teacher_phone),
            payment_phone: opt(self.payment_phone),
            transaction_id: opt(self.transaction_id),
        }
    }
}

/// Required text fields treat an explicit `null` like an absent field.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body for `PATCH /payment-request`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecidePaymentRequest {
    pub request_id: Option<String>,
    pub status: Option<String>,
    pub admin_notes: Option<String>,
    pub rejection_reason: Option<String>,
}

/// Query string for `GET /payment-request`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequestQuery {
    pub status: Option<String>,
    pub student_phone: Option<String>,
    pub id: Option<String>,
}

/// Restricts a listing to one student's requests: those recorded under
/// their account, or submitted with their phone number.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOwner {
    pub student_id: String,
    pub phone: Option<String>,
}

impl RequestOwner {
    pub fn owns(&self, request: &PaymentRequest) -> bool {
        request.student_id.as_deref() == Some(self.student_id.as_str())
            || self
                .phone
                .as_ref()
                .is_some_and(|phone| &request.student_phone == phone)
    }
}

/// Conjunctive filter handed to the store. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentRequestFilter {
    pub status: Option<PaymentStatus>,
    pub student_phone: Option<String>,
    pub id: Option<String>,
    pub owner: Option<RequestOwner>,
}

impl PaymentRequestFilter {
    pub fn matches(&self, request: &PaymentRequest) -> bool {
        self.owner.as_ref().map_or(true, |o| o.owns(request))
            && self.status.map_or(true, |s| request.status == s)
            && self
                .student_phone
                .as_ref()
                .map_or(true, |p| &request.student_phone == p)
            && self.id.as_ref().map_or(true, |id| &request.id == id)
    }
}

impl TryFrom<PaymentRequestQuery> for PaymentRequestFilter {
    type Error = AppError;

    fn try_from(query: PaymentRequestQuery) -> Result<Self, Self::Error> {
        fn non_empty(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        let status = non_empty(query.status)
            .map(|s| s.parse::<PaymentStatus>())
            .transpose()?;

        Ok(Self {
            status,
            student_phone: non_empty(query.student_phone),
            id: non_empty(query.id),
            owner: None,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    pub message: String,
    pub request_id: String,
}
