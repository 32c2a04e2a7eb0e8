use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::database::{
    EnrollmentStore, NotificationStore, PaymentRequestStore, Store, UserDirectory,
};
use crate::errors::{AppError, Result};
use crate::models::enrollment::Enrollment;
use crate::models::notification::Notification;
use crate::models::payment_request::{PaymentRequest, PaymentRequestFilter, PaymentStatus};
use crate::models::user::User;

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    requests: HashMap<String, PaymentRequest>,
    enrollments: HashMap<String, Enrollment>,
    notifications: HashMap<String, Notification>,
}

/// A thread-safe in-memory store with the same semantics as `MongoStore`.
///
/// Used by the tests. The `fail_*` switches make the matching writes return
/// a store error so failure paths can be exercised.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    fail_enrollment_writes: Arc<AtomicBool>,
    fail_notification_writes: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_user(&self, user: User) {
        let mut tables = self.tables.write().await;
        tables.users.insert(user.id.clone(), user);
    }

    /// Every enrollment row for the pair. More than one means the uniqueness
    /// invariant was broken.
    pub async fn enrollments_for(&self, student_id: &str, course_id: &str) -> Vec<Enrollment> {
        let tables = self.tables.read().await;
        tables
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned()
            .collect()
    }

    pub async fn enrollment_count(&self) -> usize {
        self.tables.read().await.enrollments.len()
    }

    pub async fn request_count(&self) -> usize {
        self.tables.read().await.requests.len()
    }

    pub fn fail_enrollment_writes(&self, fail: bool) {
        self.fail_enrollment_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_notification_writes(&self, fail: bool) {
        self.fail_notification_writes.store(fail, Ordering::SeqCst);
    }

    fn check_enrollment_writes(&self) -> Result<()> {
        if self.fail_enrollment_writes.load(Ordering::SeqCst) {
            return Err(AppError::store("enrollment write rejected"));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentRequestStore for InMemoryStore {
    async fn insert_request(&self, request: &PaymentRequest) -> Result<()> {
        let mut tables = self.tables.write().await;
        if tables.requests.contains_key(&request.id) {
            return Err(AppError::store(format!(
                "duplicate payment request id {}",
                request.id
            )));
        }
        tables.requests.insert(request.id.clone(), request.clone());
        Ok(())
    }

    async fn get_request(&self, id: &str) -> Result<Option<PaymentRequest>> {
        let tables = self.tables.read().await;
        Ok(tables.requests.get(id).cloned())
    }

    async fn find_requests(&self, filter: &PaymentRequestFilter) -> Result<Vec<PaymentRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<PaymentRequest> = tables
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();

        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    async fn replace_request_if_status(
        &self,
        request: &PaymentRequest,
        expected: PaymentStatus,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.requests.get_mut(&request.id) {
            Some(stored) if stored.status == expected => {
                *stored = request.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn undelivered_admin_notifications(&self, limit: i64) -> Result<Vec<PaymentRequest>> {
        let tables = self.tables.read().await;
        let mut requests: Vec<PaymentRequest> = tables
            .requests
            .values()
            .filter(|r| r.admin_notified_at.is_none())
            .cloned()
            .collect();

        requests.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        requests.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(requests)
    }

    async fn mark_admin_notified(&self, id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(request) = tables.requests.get_mut(id) {
            request.admin_notified_at = Some(at);
        }
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for InMemoryStore {
    async fn find_enrollment(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .values()
            .find(|e| e.student_id == student_id && e.course_id == course_id)
            .cloned())
    }

    async fn insert_enrollment(&self, enrollment: &Enrollment) -> Result<bool> {
        self.check_enrollment_writes()?;
        let mut tables = self.tables.write().await;

        let exists = tables.enrollments.values().any(|e| {
            e.student_id == enrollment.student_id && e.course_id == enrollment.course_id
        });
        if exists {
            return Ok(false);
        }

        tables
            .enrollments
            .insert(enrollment.id.clone(), enrollment.clone());
        Ok(true)
    }

    async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.check_enrollment_writes()?;
        let mut tables = self.tables.write().await;
        tables
            .enrollments
            .insert(enrollment.id.clone(), enrollment.clone());
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for InMemoryStore {
    async fn find_users_by_phone(&self, phone: &str, limit: i64) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users: Vec<User> = tables
            .users
            .values()
            .filter(|u| u.phone == phone)
            .cloned()
            .collect();

        users.sort_by(|a, b| a.id.cmp(&b.id));
        users.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(users)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification_once(&self, notification: &Notification) -> Result<bool> {
        if self.fail_notification_writes.load(Ordering::SeqCst) {
            return Err(AppError::store("notification write rejected"));
        }

        let mut tables = self.tables.write().await;
        if tables.notifications.contains_key(&notification.id) {
            return Ok(false);
        }
        tables
            .notifications
            .insert(notification.id.clone(), notification.clone());
        Ok(true)
    }

    async fn list_notifications(
        &self,
        audience: &str,
        unread_only: bool,
    ) -> Result<Vec<Notification>> {
        let tables = self.tables.read().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .values()
            .filter(|n| n.audience == audience && (!unread_only || !n.is_read))
            .cloned()
            .collect();

        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notifications_read(
        &self,
        audience: &str,
        ids: Option<&[String]>,
    ) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut modified = 0;

        for notification in tables.notifications.values_mut() {
            let selected = ids.map_or(true, |ids| ids.contains(&notification.id));
            if notification.audience == audience && selected && !notification.is_read {
                notification.is_read = true;
                modified += 1;
            }
        }

        Ok(modified)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
