pub mod notification_outbox;
pub mod payment_service;
