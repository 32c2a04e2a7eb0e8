//! Storage ports for the payment workflow.
//!
//! The hosted data store is an external collaborator; everything the service
//! needs from it is expressed by the traits below. `MongoStore` talks to the
//! real database, `InMemoryStore` backs the tests.

pub mod connection;
pub mod in_memory;
pub mod indexes;
pub mod mongo_store;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::errors::Result;
use crate::models::enrollment::Enrollment;
use crate::models::notification::Notification;
use crate::models::payment_request::{PaymentRequest, PaymentRequestFilter, PaymentStatus};
use crate::models::user::User;

pub const USERS: &str = "users";
pub const PAYMENT_REQUESTS: &str = "payment_requests";
pub const ENROLLMENTS: &str = "course_enrollments";
pub const NOTIFICATIONS: &str = "notifications";

#[async_trait]
pub trait PaymentRequestStore: Send + Sync {
    async fn insert_request(&self, request: &PaymentRequest) -> Result<()>;

    async fn get_request(&self, id: &str) -> Result<Option<PaymentRequest>>;

    /// Every request matching the filter, newest first.
    async fn find_requests(&self, filter: &PaymentRequestFilter) -> Result<Vec<PaymentRequest>>;

    /// Overwrites the stored row only while its status is still `expected`.
    /// Returns `false` when the row was missing or had already moved on.
    async fn replace_request_if_status(
        &self,
        request: &PaymentRequest,
        expected: PaymentStatus,
    ) -> Result<bool>;

    /// Requests whose admin notification has not been delivered yet, oldest first.
    async fn undelivered_admin_notifications(&self, limit: i64) -> Result<Vec<PaymentRequest>>;

    async fn mark_admin_notified(&self, id: &str, at: DateTime<Utc>) -> Result<()>;
}

#[async_trait]
pub trait EnrollmentStore: Send + Sync {
    async fn find_enrollment(&self, student_id: &str, course_id: &str)
        -> Result<Option<Enrollment>>;

    /// Returns `false` if a row for the same (student, course) already exists.
    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<bool>;

    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<()>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// At most `limit` users sharing the phone number.
    async fn find_users_by_phone(&self, phone: &str, limit: i64) -> Result<Vec<User>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Inserts the notification unless one with the same id exists.
    async fn insert_notification_once(&self, notification: &Notification) -> Result<bool>;

    async fn list_notifications(&self, audience: &str, unread_only: bool)
        -> Result<Vec<Notification>>;

    async fn mark_notifications_read(&self, audience: &str, ids: Option<&[String]>)
        -> Result<u64>;
}

/// Everything the service needs from the data store.
#[async_trait]
pub trait Store: PaymentRequestStore + EnrollmentStore + UserDirectory + NotificationStore {
    async fn ping(&self) -> Result<()>;
}

pub type StoreRef = Arc<dyn Store>;
