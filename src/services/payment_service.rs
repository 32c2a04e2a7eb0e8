//! Payment-request lifecycle: submission, review queries and the
//! approve/reject decision with its enrollment side effect.

use chrono::Utc;
use validator::Validate;

use crate::database::{EnrollmentStore, PaymentRequestStore, StoreRef, UserDirectory};
use crate::errors::{AppError, Result};
use crate::models::enrollment::{Enrollment, EnrollmentOutcome};
use crate::models::payment_request::{
    CreatePaymentRequest, DecidePaymentRequest, Decision, PaymentRequest, PaymentRequestFilter,
    PaymentRequestQuery, PaymentStatus, RequestOwner,
};
use crate::models::user::{Role, Session};
use crate::services::notification_outbox::NotificationOutbox;

/// Users fetched per phone lookup. Two is enough to spot an ambiguous match.
const PHONE_LOOKUP_LIMIT: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    pub request: PaymentRequest,
    pub enrollment: Option<EnrollmentOutcome>,
}

impl DecisionOutcome {
    pub fn message(&self) -> String {
        format!("Payment request {} successfully", self.request.status)
    }
}

#[derive(Clone)]
pub struct PaymentService {
    store: StoreRef,
    outbox: NotificationOutbox,
}

impl PaymentService {
    pub fn new(store: StoreRef, outbox: NotificationOutbox) -> Self {
        Self { store, outbox }
    }

    /// Records a student's payment claim as a `pending` request.
    ///
    /// The admin notification is attempted right away but never fails the
    /// submission; undelivered ones are picked up by the outbox dispatcher.
    pub async fn submit(
        &self,
        session: Option<&Session>,
        body: CreatePaymentRequest,
    ) -> Result<PaymentRequest> {
        let body = body.normalized();
        body.validate()?;

        let student_id = self.resolve_submitter(session, &body.student_phone).await;
        let request = PaymentRequest::from_submission(body, student_id, Utc::now());

        self.store.insert_request(&request).await?;
        tracing::info!(
            "✅ Payment request {} created for {} ({}) - course {} - amount {}",
            request.id,
            request.student_name,
            request.student_phone,
            request.course_id,
            request.amount_paid
        );

        if let Err(e) = self.outbox.deliver(&request).await {
            tracing::warn!(
                "⚠️ Admin notification for payment request {} deferred: {}",
                request.id,
                e
            );
        }

        Ok(request)
    }

    /// Requests matching the query, newest first. Non-admins only ever see
    /// their own requests: recorded under their account or their phone.
    pub async fn list(
        &self,
        session: &Session,
        query: PaymentRequestQuery,
    ) -> Result<Vec<PaymentRequest>> {
        let mut filter = PaymentRequestFilter::try_from(query)?;

        if !session.is_admin() {
            filter.owner = Some(RequestOwner {
                student_id: session.user_id.clone(),
                phone: session.phone.clone(),
            });
        }

        let requests = self.store.find_requests(&filter).await?;
        tracing::debug!("🔍 {} payment requests matched {:?}", requests.len(), filter);
        Ok(requests)
    }

    /// Applies an admin decision to a pending request.
    ///
    /// The status write only lands while the stored row is still `pending`, so
    /// a decision is applied at most once. If activating the enrollment fails
    /// afterwards, the status write is reverted and the error is returned.
    pub async fn decide(
        &self,
        admin: &Session,
        body: DecidePaymentRequest,
    ) -> Result<DecisionOutcome> {
        if !admin.is_admin() {
            return Err(AppError::Unauthorized);
        }

        let (request_id, decision) = parse_decision(&body)?;

        let original = self
            .store
            .get_request(&request_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment request {}", request_id)))?;

        let mut updated = original.clone();
        updated.decide(
            decision,
            non_blank(body.admin_notes),
            non_blank(body.rejection_reason),
            Some(admin.user_id.clone()),
            Utc::now(),
        )?;

        if !self
            .store
            .replace_request_if_status(&updated, PaymentStatus::Pending)
            .await?
        {
            // Another decision won the race.
            let current = self.store.get_request(&request_id).await?;
            return Err(match current {
                Some(current) => AppError::AlreadyDecided {
                    id: request_id,
                    status: current.status,
                },
                None => AppError::not_found(format!("Payment request {}", request_id)),
            });
        }

        let enrollment = match decision {
            Decision::Approved => match self.activate_enrollment(&updated).await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    self.revert_decision(&original, &updated).await;
                    return Err(e);
                }
            },
            Decision::Rejected => None,
        };

        tracing::info!(
            "✅ Payment request {} {} by {} (enrollment: {:?})",
            updated.id,
            updated.status,
            admin.user_id,
            enrollment
        );

        Ok(DecisionOutcome {
            request: updated,
            enrollment,
        })
    }

    /// Find-or-create keyed on (student, course). Never leaves two rows for
    /// the same pair, even when two approvals race on the insert.
    pub async fn upsert_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
        payment_request_id: &str,
    ) -> Result<EnrollmentOutcome> {
        let now = Utc::now();

        if let Some(mut existing) = self.store.find_enrollment(student_id, course_id).await? {
            existing.reactivate(payment_request_id, now);
            self.store.update_enrollment(&existing).await?;
            return Ok(EnrollmentOutcome::Reactivated);
        }

        let fresh = Enrollment::activated(student_id, course_id, payment_request_id, now);
        if self.store.insert_enrollment(&fresh).await? {
            return Ok(EnrollmentOutcome::Created);
        }

        let mut existing = self
            .store
            .find_enrollment(student_id, course_id)
            .await?
            .ok_or_else(|| {
                AppError::store(format!(
                    "enrollment for student {} in course {} rejected as duplicate but not found",
                    student_id, course_id
                ))
            })?;
        existing.reactivate(payment_request_id, now);
        self.store.update_enrollment(&existing).await?;
        Ok(EnrollmentOutcome::Reactivated)
    }

    async fn activate_enrollment(&self, request: &PaymentRequest) -> Result<EnrollmentOutcome> {
        match self.resolve_student(request).await? {
            Some(student_id) => {
                self.upsert_enrollment(&student_id, &request.course_id, &request.id)
                    .await
            }
            None => {
                tracing::warn!(
                    "⚠️ Payment request {} approved but no student matches phone {}; no enrollment created",
                    request.id,
                    request.student_phone
                );
                Ok(EnrollmentOutcome::NoMatchingStudent)
            }
        }
    }

    /// The student recorded at submission, else a unique match on phone.
    async fn resolve_student(&self, request: &PaymentRequest) -> Result<Option<String>> {
        if let Some(student_id) = &request.student_id {
            return Ok(Some(student_id.clone()));
        }

        let users = self
            .store
            .find_users_by_phone(&request.student_phone, PHONE_LOOKUP_LIMIT)
            .await?;
        Ok(unique_user_id(&request.student_phone, users))
    }

    async fn resolve_submitter(&self, session: Option<&Session>, phone: &str) -> Option<String> {
        if let Some(session) = session.filter(|s| s.role == Role::Student) {
            return Some(session.user_id.clone());
        }

        match self
            .store
            .find_users_by_phone(phone, PHONE_LOOKUP_LIMIT)
            .await
        {
            Ok(users) => unique_user_id(phone, users),
            Err(e) => {
                tracing::warn!("⚠️ User lookup by phone {} failed: {}", phone, e);
                None
            }
        }
    }

    async fn revert_decision(&self, original: &PaymentRequest, applied: &PaymentRequest) {
        match self
            .store
            .replace_request_if_status(original, applied.status)
            .await
        {
            Ok(true) => tracing::warn!(
                "↩️ Payment request {} reverted to {} after enrollment failure",
                original.id,
                original.status
            ),
            Ok(false) => tracing::error!(
                "❌ Payment request {} changed before it could be reverted; needs manual review",
                original.id
            ),
            Err(e) => tracing::error!(
                "❌ Failed to revert payment request {}: {}; needs manual review",
                original.id,
                e
            ),
        }
    }
}

fn unique_user_id(phone: &str, users: Vec<crate::models::user::User>) -> Option<String> {
    match users.as_slice() {
        [user] => Some(user.id.clone()),
        [] => None,
        _ => {
            tracing::warn!("⚠️ Phone {} matches several users; refusing to guess", phone);
            None
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_decision(body: &DecidePaymentRequest) -> Result<(String, Decision)> {
    let request_id = non_blank(body.request_id.clone());
    let status = non_blank(body.status.clone());

    let (request_id, status) = match (request_id, status) {
        (Some(id), Some(status)) => (id, status),
        (id, status) => {
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push("requestId".to_string());
            }
            if status.is_none() {
                missing.push("status".to_string());
            }
            return Err(AppError::MissingFields(missing));
        }
    };

    let decision = match status.parse::<PaymentStatus>()? {
        PaymentStatus::Approved => Decision::Approved,
        PaymentStatus::Rejected => Decision::Rejected,
        PaymentStatus::Pending => {
            return Err(AppError::invalid_data(
                "status must be either 'approved' or 'rejected'",
            ))
        }
    };

    Ok((request_id, decision))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decision_reports_missing_fields() {
        let err = parse_decision(&DecidePaymentRequest::default()).unwrap_err();
        match err {
            AppError::MissingFields(fields) => assert_eq!(fields, vec!["requestId", "status"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_decision_rejects_pending() {
        let body = DecidePaymentRequest {
            request_id: Some("r1".into()),
            status: Some("pending".into()),
            ..Default::default()
        };
        assert!(matches!(
            parse_decision(&body),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_parse_decision_accepts_approved() {
        let body = DecidePaymentRequest {
            request_id: Some(" r1 ".into()),
            status: Some("approved".into()),
            ..Default::default()
        };
        let (id, decision) = parse_decision(&body).unwrap();
        assert_eq!(id, "r1");
        assert_eq!(decision, Decision::Approved);
    }

    #[test]
    fn test_unique_user_id_refuses_ambiguity() {
        let user = |id: &str| crate::models::user::User {
            id: id.into(),
            name: "Ahmed".into(),
            phone: "0101".into(),
            email: None,
            role: Role::Student,
        };

        assert_eq!(unique_user_id("0101", vec![user("u1")]), Some("u1".into()));
        assert_eq!(unique_user_id("0101", vec![]), None);
        assert_eq!(unique_user_id("0101", vec![user("u1"), user("u2")]), None);
    }
}
