use mongodb::{bson::doc, options::IndexOptions, Collection, Database, IndexModel};

use crate::database::{ENROLLMENTS, NOTIFICATIONS, PAYMENT_REQUESTS};
use crate::errors::Result;
use crate::models::enrollment::Enrollment;
use crate::models::notification::Notification;
use crate::models::payment_request::PaymentRequest;

/// Creates the indexes the workflow relies on. Safe to run on every start.
pub async fn ensure_indexes(db: &Database) -> Result<()> {
    let enrollments: Collection<Enrollment> = db.collection(ENROLLMENTS);
    enrollments
        .create_index(
            IndexModel::builder()
                .keys(doc! { "student_id": 1, "course_id": 1 })
                .options(
                    IndexOptions::builder()
                        .unique(true)
                        .name("student_course_unique".to_string())
                        .build(),
                )
                .build(),
        )
        .await?;

    let requests: Collection<PaymentRequest> = db.collection(PAYMENT_REQUESTS);
    let request_indexes = vec![
        IndexModel::builder()
            .keys(doc! { "student_phone": 1, "created_at": -1 })
            .build(),
        IndexModel::builder()
            .keys(doc! { "status": 1, "created_at": -1 })
            .build(),
        IndexModel::builder()
            .keys(doc! { "admin_notified_at": 1 })
            .build(),
    ];
    requests.create_indexes(request_indexes).await?;

    let notifications: Collection<Notification> = db.collection(NOTIFICATIONS);
    notifications
        .create_index(
            IndexModel::builder()
                .keys(doc! { "audience": 1, "is_read": 1 })
                .build(),
        )
        .await?;

    tracing::info!("✅ Database indexes ensured");
    Ok(())
}
