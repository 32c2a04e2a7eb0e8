use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    #[default]
    Full,
}

/// Grants a student access to a course. One row per (student, course).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(rename = "_id")]
    pub id: String,
    pub student_id: String,
    pub course_id: String,
    pub payment_request_id: String,
    pub is_active: bool,
    pub access_type: AccessType,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    pub fn activated(
        student_id: &str,
        course_id: &str,
        payment_request_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            payment_request_id: payment_request_id.to_string(),
            is_active: true,
            access_type: AccessType::Full,
            created_at: now,
            updated_at: now,
        }
    }

    /// Turns access back on and relinks it to the latest approved payment.
    pub fn reactivate(&mut self, payment_request_id: &str, now: DateTime<Utc>) {
        self.is_active = true;
        self.payment_request_id = payment_request_id.to_string();
        self.updated_at = now;
    }
}

/// What the approval side effect did to the student's enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentOutcome {
    Created,
    Reactivated,
    NoMatchingStudent,
}
