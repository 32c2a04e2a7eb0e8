use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt;
use mongodb::{
    bson::{doc, Document},
    error::{ErrorKind, WriteFailure},
    Collection, Database,
};

use crate::database::{
    EnrollmentStore, NotificationStore, PaymentRequestStore, Store, UserDirectory, ENROLLMENTS,
    NOTIFICATIONS, PAYMENT_REQUESTS, USERS,
};
use crate::errors::Result;
use crate::models::enrollment::Enrollment;
use crate::models::notification::Notification;
use crate::models::payment_request::{PaymentRequest, PaymentRequestFilter, PaymentStatus};
use crate::models::timestamp;
use crate::models::user::User;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed store. Cloning shares the underlying connection pool.
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    fn requests(&self) -> Collection<PaymentRequest> {
        self.db.collection(PAYMENT_REQUESTS)
    }

    fn enrollments(&self) -> Collection<Enrollment> {
        self.db.collection(ENROLLMENTS)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection(USERS)
    }

    fn notifications(&self) -> Collection<Notification> {
        self.db.collection(NOTIFICATIONS)
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

fn request_filter(filter: &PaymentRequestFilter) -> Document {
    let mut query = doc! {};

    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }

    if let Some(phone) = &filter.student_phone {
        query.insert("student_phone", phone);
    }

    if let Some(id) = &filter.id {
        query.insert("_id", id);
    }

    if let Some(owner) = &filter.owner {
        let mut scopes = vec![doc! { "student_id": &owner.student_id }];
        if let Some(phone) = &owner.phone {
            scopes.push(doc! { "student_phone": phone });
        }
        query.insert("$or", scopes);
    }

    query
}

#[async_trait]
impl PaymentRequestStore for MongoStore {
    async fn insert_request(&self, request: &PaymentRequest) -> Result<()> {
        self.requests().insert_one(request).await?;
        Ok(())
    }

    async fn get_request(&self, id: &str) -> Result<Option<PaymentRequest>> {
        Ok(self.requests().find_one(doc! { "_id": id }).await?)
    }

    async fn find_requests(&self, filter: &PaymentRequestFilter) -> Result<Vec<PaymentRequest>> {
        let cursor = self
            .requests()
            .find(request_filter(filter))
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn replace_request_if_status(
        &self,
        request: &PaymentRequest,
        expected: PaymentStatus,
    ) -> Result<bool> {
        let result = self
            .requests()
            .replace_one(
                doc! { "_id": &request.id, "status": expected.as_str() },
                request,
            )
            .await?;

        Ok(result.matched_count == 1)
    }

    async fn undelivered_admin_notifications(&self, limit: i64) -> Result<Vec<PaymentRequest>> {
        let cursor = self
            .requests()
            .find(doc! { "admin_notified_at": null })
            .sort(doc! { "created_at": 1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_admin_notified(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let update = doc! {
            "$set": { "admin_notified_at": timestamp::format(&at) }
        };
        self.requests().update_one(doc! { "_id": id }, update).await?;
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for MongoStore {
    async fn find_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>> {
        let filter = doc! { "student_id": student_id, "course_id": course_id };
        Ok(self.enrollments().find_one(filter).await?)
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<bool> {
        match self.enrollments().insert_one(enrollment).await {
            Ok(_) => Ok(true),
            // The unique (student_id, course_id) index rejected a concurrent insert.
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.enrollments()
            .replace_one(doc! { "_id": &enrollment.id }, enrollment)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MongoStore {
    async fn find_users_by_phone(&self, phone: &str, limit: i64) -> Result<Vec<User>> {
        let cursor = self
            .users()
            .find(doc! { "phone": phone })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }
}

#[async_trait]
impl NotificationStore for MongoStore {
    async fn insert_notification_once(&self, notification: &Notification) -> Result<bool> {
        match self.notifications().insert_one(notification).await {
            Ok(_) => Ok(true),
            Err(e) if is_duplicate_key(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_notifications(
        &self,
        audience: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let mut filter = doc! { "audience": audience };
        if unread_only {
            filter.insert("is_read", false);
        }

        let cursor = self
            .notifications()
            .find(filter)
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_notifications_read(
        &self,
        audience: &str,
        ids: Option<&[String]>,
    ) -> Result<u64> {
        let mut filter = doc! { "audience": audience };
        if let Some(ids) = ids {
            filter.insert("_id", doc! { "$in": ids.to_vec() });
        }

        let update = doc! { "$set": { "is_read": true } };
        let result = self.notifications().update_many(filter, update).await?;
        Ok(result.modified_count)
    }
}

#[async_trait]
impl Store for MongoStore {
    async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::payment_request::RequestOwner;

    #[test]
    fn test_request_filter_is_conjunctive() {
        let filter = PaymentRequestFilter {
            status: Some(PaymentStatus::Pending),
            student_phone: Some("0101".into()),
            ..Default::default()
        };

        let query = request_filter(&filter);
        assert_eq!(query.get_str("status").unwrap(), "pending");
        assert_eq!(query.get_str("student_phone").unwrap(), "0101");
        assert!(!query.contains_key("_id"));
    }

    #[test]
    fn test_owner_scope_matches_account_or_phone() {
        let filter = PaymentRequestFilter {
            owner: Some(RequestOwner {
                student_id: "s1".into(),
                phone: Some("0101".into()),
            }),
            ..Default::default()
        };

        let query = request_filter(&filter);
        let scopes = query.get_array("$or").unwrap();
        assert_eq!(scopes.len(), 2);
        assert_eq!(
            scopes[0].as_document().unwrap().get_str("student_id").unwrap(),
            "s1"
        );
        assert_eq!(
            scopes[1].as_document().unwrap().get_str("student_phone").unwrap(),
            "0101"
        );
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        assert!(request_filter(&PaymentRequestFilter::default()).is_empty());
    }
}
